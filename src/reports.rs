//! Per-document report orchestration: turn domain records into the context
//! each template expects, then render it through a [`ReportGenerator`].

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};

use crate::context::{Context, ContextBuilder};
use crate::engine::format_money;
use crate::error::RenderError;
use crate::flatten::{flatten, flatten_with_ancestors};
use crate::models::{
    AvisoExtemporaneidad, ConfirmacionEnvio, DatosReporte, Empresa, ReportePosiciones, Resumen,
    Venta, VentaMensual,
};
use crate::service::ReportGenerator;

pub const REPORTE_VENTAS: &str = "reporte-ventas";
pub const REPORTE_POSICIONES: &str = "reporte-posiciones";
pub const CONFIRMACION_ENVIO: &str = "confirmacion-envio";
pub const AVISO_EXTEMPORANEIDAD: &str = "aviso-extemporaneidad";
pub const PRUEBA_SIMPLE: &str = "prueba-simple";

const TITULO_VENTAS: &str = "Reporte de Ventas Mensual";

// ---------------------------------------------------------------------------
// Sales report
// ---------------------------------------------------------------------------

/// Totals over `ventas`. The average of no sales is zero.
pub fn calcular_resumen(ventas: &[Venta]) -> Resumen {
    let total: f64 = ventas.iter().map(|v| v.total).sum();
    let transacciones = ventas.len();
    let promedio = if transacciones > 0 {
        total / transacciones as f64
    } else {
        0.0
    };
    Resumen {
        total_ventas: format_money(total),
        numero_transacciones: transacciones,
        venta_promedio: format_money(promedio),
    }
}

/// Sales grouped by calendar month name (years are merged), in calendar
/// order. `porcentaje` is each month's share of the best month.
pub fn calcular_ventas_por_mes(ventas: &[Venta]) -> Vec<VentaMensual> {
    let mut por_mes: BTreeMap<u32, (String, f64)> = BTreeMap::new();
    for venta in ventas {
        let entry = por_mes
            .entry(venta.fecha.month())
            .or_insert_with(|| (venta.fecha.format("%B").to_string().to_uppercase(), 0.0));
        entry.1 += venta.total;
    }

    let max = por_mes
        .values()
        .map(|(_, total)| *total)
        .fold(f64::NEG_INFINITY, f64::max);
    let max = if max.is_finite() && max != 0.0 { max } else { 1.0 };

    por_mes
        .into_values()
        .map(|(nombre, total)| VentaMensual {
            nombre,
            porcentaje: total / max * 100.0,
            total,
        })
        .collect()
}

/// Context for `reporte-ventas`.
pub fn sales_context(
    datos: &DatosReporte,
    empresa: &Empresa,
    fecha_generacion: NaiveDate,
) -> Result<Context, RenderError> {
    ContextBuilder::new()
        .var("titulo", TITULO_VENTAS)
        .var("periodo", &datos.periodo)
        .var("fechaGeneracion", &fecha_generacion)
        .var("empresa", empresa)
        .var("resumen", &calcular_resumen(&datos.ventas))
        .var("ventas", &datos.ventas)
        .var("incluirGrafico", &true)
        .var("ventasPorMes", &calcular_ventas_por_mes(&datos.ventas))
        .build()
}

// ---------------------------------------------------------------------------
// Other documents
// ---------------------------------------------------------------------------

/// Context for `reporte-posiciones`: the report's own fields.
pub fn position_context(reporte: &ReportePosiciones) -> Context {
    flatten(reporte)
}

/// Context for `confirmacion-envio`, including the issuer's fields.
pub fn confirmation_context(confirmacion: &ConfirmacionEnvio) -> Context {
    flatten_with_ancestors(confirmacion)
}

/// Context for `aviso-extemporaneidad`.
pub fn lateness_context(aviso: &AvisoExtemporaneidad) -> Context {
    flatten(aviso)
}

// ---------------------------------------------------------------------------
// Generator entry points
// ---------------------------------------------------------------------------

impl ReportGenerator {
    /// Monthly sales report, dated today.
    pub fn sales_report(&self, datos: &DatosReporte) -> Result<Vec<u8>, RenderError> {
        log::info!("Generating sales report for period {}", datos.periodo);
        let context = sales_context(datos, self.empresa(), Local::now().date_naive())?;
        self.render(REPORTE_VENTAS, &context)
    }

    /// Position report; the template lays it out on landscape pages.
    pub fn position_report(&self, reporte: &ReportePosiciones) -> Result<Vec<u8>, RenderError> {
        log::info!(
            "Generating position report for {} ({} lines)",
            reporte.casa_bolsa,
            reporte.posiciones.len()
        );
        self.render(REPORTE_POSICIONES, &position_context(reporte))
    }

    pub fn dispatch_confirmation(&self, confirmacion: &ConfirmacionEnvio) -> Result<Vec<u8>, RenderError> {
        log::info!("Generating dispatch confirmation {}", confirmacion.folio_recepcion);
        self.render(CONFIRMACION_ENVIO, &confirmation_context(confirmacion))
    }

    pub fn lateness_notice(&self, aviso: &AvisoExtemporaneidad) -> Result<Vec<u8>, RenderError> {
        log::info!("Generating lateness notice for {}", aviso.clave_cotizacion);
        self.render(AVISO_EXTEMPORANEIDAD, &lateness_context(aviso))
    }

    /// One-page smoke-test document.
    pub fn simple_test(&self) -> Result<Vec<u8>, RenderError> {
        self.render(PRUEBA_SIMPLE, &Context::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn venta(y: i32, m: u32, d: u32, total: f64) -> Venta {
        Venta::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            "Banorte",
            "Acciones FEMSA",
            1,
            total,
            total,
        )
    }

    #[test]
    fn summary_of_no_sales_is_zero() {
        let resumen = calcular_resumen(&[]);
        assert_eq!(resumen.numero_transacciones, 0);
        assert_eq!(resumen.total_ventas, "$0.00");
        assert_eq!(resumen.venta_promedio, "$0.00");
    }

    #[test]
    fn summary_formats_money() {
        let resumen = calcular_resumen(&[venta(2024, 1, 15, 2550.0), venta(2024, 1, 16, 4487.5)]);
        assert_eq!(resumen.total_ventas, "$7,037.50");
        assert_eq!(resumen.venta_promedio, "$3,518.75");
    }

    #[test]
    fn months_are_grouped_and_scaled() {
        let meses = calcular_ventas_por_mes(&[
            venta(2024, 3, 1, 50.0),
            venta(2024, 1, 15, 100.0),
            venta(2023, 1, 20, 100.0),
        ]);
        assert_eq!(meses.len(), 2);
        assert_eq!(meses[0].nombre, "JANUARY");
        assert_eq!(meses[0].total, 200.0);
        assert_eq!(meses[0].porcentaje, 100.0);
        assert_eq!(meses[1].nombre, "MARCH");
        assert_eq!(meses[1].porcentaje, 25.0);
        assert!(calcular_ventas_por_mes(&[]).is_empty());
    }

    #[test]
    fn sales_context_has_every_variable() {
        let datos = DatosReporte::new("Enero 2024", vec![venta(2024, 1, 15, 2550.0)]);
        let fecha = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let ctx = sales_context(&datos, &Empresa::default(), fecha).unwrap();
        let names: Vec<&str> = ctx.names().collect();
        assert_eq!(
            names,
            vec![
                "empresa",
                "fechaGeneracion",
                "incluirGrafico",
                "periodo",
                "resumen",
                "titulo",
                "ventas",
                "ventasPorMes"
            ]
        );
        assert_eq!(ctx.get("fechaGeneracion"), Some(&json!("2024-02-01")));
        assert_eq!(ctx.get("resumen").unwrap()["numeroTransacciones"], json!(1));
    }
}
