//! Report data carriers.
//!
//! Plain serde records; field names serialize in camelCase because that is
//! how the templates address them (`venta.precioUnitario`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::flatten::{Ancestry, Flatten};

// ---------------------------------------------------------------------------
// Sales report
// ---------------------------------------------------------------------------

/// One sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venta {
    pub fecha: NaiveDate,
    pub cliente: String,
    pub producto: String,
    pub cantidad: u32,
    pub precio_unitario: f64,
    pub total: f64,
}

impl Venta {
    pub fn new(
        fecha: NaiveDate,
        cliente: &str,
        producto: &str,
        cantidad: u32,
        precio_unitario: f64,
        total: f64,
    ) -> Self {
        Self {
            fecha,
            cliente: cliente.to_string(),
            producto: producto.to_string(),
            cantidad,
            precio_unitario,
            total,
        }
    }
}

/// Input of the sales report: a period label and its sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatosReporte {
    pub periodo: String,
    #[serde(default)]
    pub ventas: Vec<Venta>,
}

impl Ancestry for DatosReporte {}

impl DatosReporte {
    pub fn new(periodo: &str, ventas: Vec<Venta>) -> Self {
        Self {
            periodo: periodo.to_string(),
            ventas,
        }
    }
}

/// Company block in the sales report header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Empresa {
    pub nombre: String,
    pub direccion: String,
    pub telefono: String,
}

impl Default for Empresa {
    fn default() -> Self {
        Self {
            nombre: "BMV - Bolsa Mexicana de Valores".to_string(),
            direccion: "Paseo de la Reforma 255, Ciudad de México".to_string(),
            telefono: "+52-55-5342-9000".to_string(),
        }
    }
}

/// Totals shown above the sales table. Amounts are preformatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resumen {
    pub total_ventas: String,
    pub numero_transacciones: usize,
    pub venta_promedio: String,
}

/// Sales of one calendar month, with its bar length relative to the best
/// month (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentaMensual {
    pub nombre: String,
    pub total: f64,
    pub porcentaje: f64,
}

// ---------------------------------------------------------------------------
// Position report
// ---------------------------------------------------------------------------

/// One issue line of the position report. Amounts are shown exactly as
/// supplied; totals are not recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Posicion {
    pub emisor: String,
    pub serie: String,
    pub tv: String,

    pub saldo_inicial: f64,
    pub saldo_anterior_vcp: f64,
    pub saldo_anterior_vct: f64,
    pub saldo_anterior_cto: f64,

    pub monto_operado_vcp: f64,
    pub monto_operado_vct: f64,
    pub monto_operado_cto: f64,
    pub monto_operado_total: f64,

    pub monto_cancelado_vcp: f64,
    pub monto_cancelado_vct: f64,
    pub monto_cancelado_cto: f64,
    pub monto_cancelado_total: f64,

    pub monto_modificado_vcp: f64,
    pub monto_modificado_vct: f64,
    pub monto_modificado_cto: f64,
    pub monto_modificado_total: f64,

    pub posicion_vcp: f64,
    pub posicion_vct: f64,
    pub posicion_cto: f64,
    pub posicion_total: f64,
}

impl Posicion {
    /// A line with no movements: the previous balance carries over as the
    /// position.
    pub fn sin_movimientos(emisor: &str, serie: &str, saldo_anterior: [f64; 3], posicion: [f64; 4]) -> Self {
        let [vcp, vct, cto] = saldo_anterior;
        let [pos_vcp, pos_vct, pos_cto, pos_total] = posicion;
        Self {
            emisor: emisor.to_string(),
            serie: serie.to_string(),
            saldo_inicial: vcp + vct + cto,
            saldo_anterior_vcp: vcp,
            saldo_anterior_vct: vct,
            saldo_anterior_cto: cto,
            posicion_vcp: pos_vcp,
            posicion_vct: pos_vct,
            posicion_cto: pos_cto,
            posicion_total: pos_total,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportePosiciones {
    pub casa_bolsa: String,
    pub razon_social: String,
    pub fecha_consulta: String,
    pub fecha_operacion: String,
    pub posiciones: Vec<Posicion>,
}

impl Ancestry for ReportePosiciones {}

// ---------------------------------------------------------------------------
// Dispatch confirmation and lateness notice
// ---------------------------------------------------------------------------

/// The issuer a filing belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emisora {
    pub clave: String,
    pub razon_social: String,
}

impl Ancestry for Emisora {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivoRecibido {
    pub nombre: String,
    pub descripcion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tamano: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_archivo: Option<String>,
}

impl ArchivoRecibido {
    pub fn new(nombre: &str, descripcion: &str) -> Self {
        Self {
            nombre: nombre.to_string(),
            descripcion: descripcion.to_string(),
            ..Self::default()
        }
    }
}

/// Receipt for a filing. Extends [`Emisora`], whose `clave` and
/// `razonSocial` are inherited when flattened with ancestors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmacionEnvio {
    #[serde(skip)]
    pub emisora: Emisora,
    pub fecha_hora: String,
    pub folio_recepcion: String,
    pub responsable: String,
    pub fecha_hora_envio: String,
    pub periodo: String,
    pub archivos: Vec<ArchivoRecibido>,
}

impl Ancestry for ConfirmacionEnvio {
    fn parent(&self) -> Option<&dyn Flatten> {
        Some(&self.emisora)
    }
}

/// Notice that a filing is late.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvisoExtemporaneidad {
    pub fecha_generacion: String,
    pub clave_cotizacion: String,
    pub razon_social: String,
    pub tipo_informacion: String,
    pub causas_incumplimiento: String,
    /// Optional; the section is omitted when empty.
    #[serde(default)]
    pub observaciones: String,
}

impl Ancestry for AvisoExtemporaneidad {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{flatten, flatten_with_ancestors};
    use serde_json::json;

    #[test]
    fn venta_serializes_in_template_naming() {
        let venta = Venta::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "BBVA Bancomer",
            "Acciones AMXL",
            100,
            25.5,
            2550.0,
        );
        let value = serde_json::to_value(&venta).unwrap();
        assert_eq!(value["fecha"], json!("2024-01-15"));
        assert_eq!(value["precioUnitario"], json!(25.5));
    }

    #[test]
    fn confirmation_inherits_issuer_fields() {
        let confirmacion = ConfirmacionEnvio {
            emisora: Emisora {
                clave: "ACTIN".into(),
                razon_social: "ACTINVER CASA DE BOLSA, S.A. DE C.V.".into(),
            },
            folio_recepcion: "1452904".into(),
            ..ConfirmacionEnvio::default()
        };
        let own = flatten(&confirmacion);
        assert!(!own.contains_key("clave"));
        let all = flatten_with_ancestors(&confirmacion);
        assert_eq!(all.get("clave"), Some(&json!("ACTIN")));
        assert_eq!(all.get("folioRecepcion"), Some(&json!("1452904")));
    }

    #[test]
    fn position_without_movements() {
        let p = Posicion::sin_movimientos("WALMEX", "1", [300.0, 9655.0, 0.0], [300.0, 9666.0, 0.0, 9966.0]);
        assert_eq!(p.saldo_inicial, 9955.0);
        assert_eq!(p.posicion_total, 9966.0);
        assert_eq!(p.monto_operado_total, 0.0);
    }
}
