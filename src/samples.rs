//! Demonstration data for every built-in document, used by `--sample` on the
//! command line and by the integration tests.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::context::Context;
use crate::error::RenderError;
use crate::models::{
    ArchivoRecibido, AvisoExtemporaneidad, ConfirmacionEnvio, DatosReporte, Emisora, Empresa,
    Posicion, ReportePosiciones, Venta,
};
use crate::reports::{
    confirmation_context, lateness_context, position_context, sales_context, AVISO_EXTEMPORANEIDAD,
    CONFIRMACION_ENVIO, PRUEBA_SIMPLE, REPORTE_POSICIONES, REPORTE_VENTAS,
};

const CLAVE: &str = "ACTIN";
const RAZON_SOCIAL: &str = "ACTINVER CASA DE BOLSA, S.A. DE C.V.";

/// January 2024 sales across eight counterparties.
pub fn datos_reporte() -> DatosReporte {
    let rows: [(u32, &str, &str, u32, f64, f64); 8] = [
        (15, "BBVA Bancomer", "Acciones AMXL", 100, 25.50, 2550.00),
        (16, "Banorte", "Acciones FEMSA", 50, 89.75, 4487.50),
        (17, "Santander", "Acciones WALMEX", 75, 42.30, 3172.50),
        (18, "HSBC", "Acciones GFNORTE", 30, 156.80, 4704.00),
        (19, "Citibanamex", "Acciones CEMEX", 200, 8.45, 1690.00),
        (20, "Scotia Bank", "Acciones TLEVISA", 85, 12.60, 1071.00),
        (21, "Inbursa", "Acciones BIMBO", 120, 36.25, 4350.00),
        (22, "Afirme", "Acciones ELEKTRA", 40, 785.20, 31408.00),
    ];
    let ventas = rows
        .iter()
        .filter_map(|&(dia, cliente, producto, cantidad, precio, total)| {
            let fecha = NaiveDate::from_ymd_opt(2024, 1, dia)?;
            Some(Venta::new(fecha, cliente, producto, cantidad, precio, total))
        })
        .collect();
    DatosReporte::new("Enero 2024", ventas)
}

/// Positions of a brokerage with no movements during the day.
pub fn reporte_posiciones() -> ReportePosiciones {
    let posiciones = vec![
        Posicion::sin_movimientos("WC", "1", [0.0, 33388.0, 0.0], [33388.0, 0.0, 33388.0, 33388.0]),
        Posicion::sin_movimientos("ESGMEXISHIRS", "1B", [0.0, 2300.0, 0.0], [2300.0, 0.0, 2300.0, 2300.0]),
        Posicion::sin_movimientos("FEMSA UBD", "1", [0.0, 2302.0, 0.0], [2302.0, 0.0, 2302.0, 2302.0]),
        Posicion::sin_movimientos("FIBRAM 12", "CF", [0.0, 10500.0, 0.0], [10500.0, 0.0, 10500.0, 10500.0]),
        Posicion::sin_movimientos(
            "NAFTRA ISHRS",
            "1B",
            [0.0, 533200.0, 0.0],
            [533200.0, 0.0, 533200.0, 533200.0],
        ),
        Posicion::sin_movimientos("SMARTR 14", "1B", [0.0, 15900.0, 0.0], [15900.0, 0.0, 15900.0, 15900.0]),
        Posicion::sin_movimientos("WALMEX", "1", [300.0, 9655.0, 0.0], [300.0, 9666.0, 0.0, 9966.0]),
    ];
    ReportePosiciones {
        casa_bolsa: CLAVE.to_string(),
        razon_social: RAZON_SOCIAL.to_string(),
        fecha_consulta: "2025-01-15".to_string(),
        fecha_operacion: "1/9/2025".to_string(),
        posiciones,
    }
}

pub fn confirmacion_envio() -> ConfirmacionEnvio {
    ConfirmacionEnvio {
        emisora: Emisora {
            clave: CLAVE.to_string(),
            razon_social: RAZON_SOCIAL.to_string(),
        },
        fecha_hora: "3/9/25, 9:11 a.m.".to_string(),
        folio_recepcion: "1452904".to_string(),
        responsable: "ACTINVER EQUITY Peyrani".to_string(),
        fecha_hora_envio: "2025-09-01 09:11:32.227".to_string(),
        periodo: "Ejercicio 2025-02".to_string(),
        archivos: vec![ArchivoRecibido::new("constrim.pdf", "Constancia Trimestral")],
    }
}

/// Lateness notice dated `hoy` (dd/mm/yyyy).
pub fn aviso_extemporaneidad(hoy: NaiveDate) -> AvisoExtemporaneidad {
    AvisoExtemporaneidad {
        fecha_generacion: hoy.format("%d/%m/%Y").to_string(),
        clave_cotizacion: CLAVE.to_string(),
        razon_social: RAZON_SOCIAL.to_string(),
        tipo_informacion: "Constancia Trimestral de Operaciones".to_string(),
        causas_incumplimiento: "Retraso en la consolidación de información operativa. \
                                Se presentará el día 15/09/2025."
            .to_string(),
        observaciones: "Se ha implementado un nuevo sistema de reportes que ha requerido \
                        tiempo adicional para su validación."
            .to_string(),
    }
}

/// The built-in documents, by their command-line name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Ventas,
    Posiciones,
    Confirmacion,
    Aviso,
    Prueba,
}

impl SampleKind {
    pub const ALL: [SampleKind; 5] = [
        SampleKind::Ventas,
        SampleKind::Posiciones,
        SampleKind::Confirmacion,
        SampleKind::Aviso,
        SampleKind::Prueba,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SampleKind::Ventas => "ventas",
            SampleKind::Posiciones => "posiciones",
            SampleKind::Confirmacion => "confirmacion",
            SampleKind::Aviso => "aviso",
            SampleKind::Prueba => "prueba",
        }
    }

    /// Template the sample is rendered with.
    pub fn template(self) -> &'static str {
        match self {
            SampleKind::Ventas => REPORTE_VENTAS,
            SampleKind::Posiciones => REPORTE_POSICIONES,
            SampleKind::Confirmacion => CONFIRMACION_ENVIO,
            SampleKind::Aviso => AVISO_EXTEMPORANEIDAD,
            SampleKind::Prueba => PRUEBA_SIMPLE,
        }
    }

    /// Bound context for the sample, with `hoy` as the generation date.
    pub fn context(self, empresa: &Empresa, hoy: NaiveDate) -> Result<Context, RenderError> {
        match self {
            SampleKind::Ventas => sales_context(&datos_reporte(), empresa, hoy),
            SampleKind::Posiciones => Ok(position_context(&reporte_posiciones())),
            SampleKind::Confirmacion => Ok(confirmation_context(&confirmacion_envio())),
            SampleKind::Aviso => Ok(lateness_context(&aviso_extemporaneidad(hoy))),
            SampleKind::Prueba => Ok(Context::new()),
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SampleKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted || k.template() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = SampleKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown sample '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
