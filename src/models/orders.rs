// src/models/orders.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_orden", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pendiente,
    Aprobada,
    Rechazada,
    Pagada,
}

impl OrderStatus {
    /// pendiente -> aprobada | rechazada, aprobada -> pagada. Nada mais.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pendiente, OrderStatus::Aprobada)
                | (OrderStatus::Pendiente, OrderStatus::Rechazada)
                | (OrderStatus::Aprobada, OrderStatus::Pagada)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pendiente => "pendiente",
            OrderStatus::Aprobada => "aprobada",
            OrderStatus::Rechazada => "rechazada",
            OrderStatus::Pagada => "pagada",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Registro da tabela `ordenes_pago` ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub id: Uuid,
    #[schema(example = 1024)]
    pub numero: i64,
    pub user_id: Uuid,
    #[schema(example = "analista@aseguradora.co")]
    pub solicitante_email: String,
    #[schema(example = "SERVICIOS XYZ")]
    pub proveedor: String,
    #[schema(example = "900123456-7")]
    pub nit: Option<String>,
    #[schema(example = "HONORARIOS")]
    pub concepto: String,
    pub descripcion: Option<String>,
    #[schema(example = "2500000")]
    pub monto: Decimal,
    #[schema(example = "475000")]
    pub iva: Decimal,
    pub centro_costos: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub estado: OrderStatus,
    pub aprobacion_automatica: bool,
    pub motivo_aprobacion: String,
    pub revisado_por: Option<Uuid>,
    pub comentario_revision: Option<String>,
    pub archivos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn total(&self) -> Decimal {
        self.monto.saturating_add(self.iva)
    }
}

// Dados prontos para inserir (já com a decisão de aprovação aplicada)
#[derive(Debug, Clone)]
pub struct NewPaymentOrder {
    pub user_id: Uuid,
    pub solicitante_email: String,
    pub proveedor: String,
    pub nit: Option<String>,
    pub concepto: String,
    pub descripcion: Option<String>,
    pub monto: Decimal,
    pub iva: Decimal,
    pub centro_costos: Option<String>,
    pub fecha_vencimiento: Option<NaiveDate>,
    pub estado: OrderStatus,
    pub aprobacion_automatica: bool,
    pub motivo_aprobacion: String,
    pub archivos: Vec<String>,
}

// --- Payloads ---

/// Maior valor que cabe em `numeric(15,2)`.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_999, 2)
}

// Limite da coluna e no máximo centavos
fn validate_amount_range(value: &Decimal) -> Result<(), ValidationError> {
    if *value > max_amount() {
        return Err(ValidationError::new("max_amount")
            .with_message("El valor supera el máximo permitido.".into()));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("scale")
            .with_message("El valor admite como máximo dos decimales.".into()));
    }
    Ok(())
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive").with_message("El valor debe ser mayor a cero.".into()));
    }
    validate_amount_range(value)
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("non_negative").with_message("El valor no puede ser negativo.".into()));
    }
    validate_amount_range(value)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, max = 200, message = "El proveedor es obligatorio (máx. 200 caracteres)."))]
    #[schema(example = "SERVICIOS XYZ")]
    pub proveedor: String,

    #[validate(length(max = 30, message = "NIT demasiado largo."))]
    pub nit: Option<String>,

    #[validate(length(min = 1, max = 120, message = "El concepto es obligatorio."))]
    #[schema(example = "HONORARIOS")]
    pub concepto: String,

    #[validate(length(max = 2000, message = "La descripción es demasiado larga."))]
    pub descripcion: Option<String>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 2500000)]
    pub monto: Decimal,

    #[serde(default)]
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = f64, example = 475000)]
    pub iva: Decimal,

    #[validate(length(max = 60, message = "Centro de costos demasiado largo."))]
    pub centro_costos: Option<String>,

    pub fecha_vencimiento: Option<NaiveDate>,

    #[serde(default)]
    #[validate(length(max = 10, message = "Máximo 10 archivos por orden."))]
    pub archivos: Vec<String>,
}

impl CreateOrderPayload {
    /// Tira espaços antes da validação; opcionais em branco viram None.
    pub fn normalize(&mut self) {
        self.proveedor = self.proveedor.trim().to_string();
        self.concepto = self.concepto.trim().to_string();
        for field in [&mut self.nit, &mut self.descripcion, &mut self.centro_costos] {
            *field = field.take().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOrderPayload {
    pub estado: OrderStatus,
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    pub estado: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// Filtro já resolvido pelo service (escopo do usuário + paginação)
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub estado: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

// --- Dashboard ---

#[derive(Debug, Clone, FromRow)]
pub struct StatusTotal {
    pub estado: OrderStatus,
    pub aprobacion_automatica: bool,
    pub cantidad: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrdersSummary {
    pub total_ordenes: i64,
    pub pendientes: i64,
    pub aprobadas: i64,
    pub rechazadas: i64,
    pub pagadas: i64,
    pub auto_aprobadas: i64,
    #[schema(value_type = f64)]
    pub monto_total: Decimal,
    #[schema(value_type = f64)]
    pub monto_pendiente: Decimal,
    #[schema(value_type = f64)]
    pub monto_aprobado: Decimal,
}

impl OrdersSummary {
    pub fn from_totals(totals: &[StatusTotal]) -> Self {
        let mut summary = OrdersSummary::default();
        for row in totals {
            summary.total_ordenes += row.cantidad;
            summary.monto_total = summary.monto_total.saturating_add(row.total);
            if row.aprobacion_automatica {
                summary.auto_aprobadas += row.cantidad;
            }
            match row.estado {
                OrderStatus::Pendiente => {
                    summary.pendientes += row.cantidad;
                    summary.monto_pendiente = summary.monto_pendiente.saturating_add(row.total);
                }
                OrderStatus::Aprobada => {
                    summary.aprobadas += row.cantidad;
                    summary.monto_aprobado = summary.monto_aprobado.saturating_add(row.total);
                }
                OrderStatus::Rechazada => summary.rechazadas += row.cantidad,
                // pagada também conta como valor aprovado
                OrderStatus::Pagada => {
                    summary.pagadas += row.cantidad;
                    summary.monto_aprobado = summary.monto_aprobado.saturating_add(row.total);
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        use OrderStatus::*;
        assert!(Pendiente.can_transition_to(Aprobada));
        assert!(Pendiente.can_transition_to(Rechazada));
        assert!(Aprobada.can_transition_to(Pagada));

        assert!(!Pendiente.can_transition_to(Pagada));
        assert!(!Aprobada.can_transition_to(Rechazada));
        assert!(!Rechazada.can_transition_to(Aprobada));
        assert!(!Pagada.can_transition_to(Pendiente));
        assert!(!Aprobada.can_transition_to(Aprobada));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Rechazada).unwrap(), "\"rechazada\"");
        let parsed: OrderStatus = serde_json::from_str("\"pagada\"").unwrap();
        assert_eq!(parsed, OrderStatus::Pagada);
    }

    #[test]
    fn summary_groups_amounts_by_status() {
        let totals = vec![
            StatusTotal { estado: OrderStatus::Pendiente, aprobacion_automatica: false, cantidad: 2, total: dec(7_000_000) },
            StatusTotal { estado: OrderStatus::Aprobada, aprobacion_automatica: true, cantidad: 3, total: dec(1_500_000) },
            StatusTotal { estado: OrderStatus::Aprobada, aprobacion_automatica: false, cantidad: 1, total: dec(6_000_000) },
            StatusTotal { estado: OrderStatus::Pagada, aprobacion_automatica: true, cantidad: 1, total: dec(500_000) },
            StatusTotal { estado: OrderStatus::Rechazada, aprobacion_automatica: false, cantidad: 1, total: dec(9_000_000) },
        ];

        let summary = OrdersSummary::from_totals(&totals);

        assert_eq!(summary.total_ordenes, 8);
        assert_eq!(summary.pendientes, 2);
        assert_eq!(summary.aprobadas, 4);
        assert_eq!(summary.pagadas, 1);
        assert_eq!(summary.rechazadas, 1);
        assert_eq!(summary.auto_aprobadas, 4);
        assert_eq!(summary.monto_pendiente, dec(7_000_000));
        assert_eq!(summary.monto_aprobado, dec(8_000_000));
        assert_eq!(summary.monto_total, dec(24_000_000));
    }

    #[test]
    fn create_payload_rejects_non_positive_amounts() {
        let payload: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "proveedor": "EMPRESA ABC",
            "concepto": "HONORARIOS",
            "monto": 0,
            "iva": -1
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("monto"));
        assert!(fields.contains_key("iva"));
    }

    #[test]
    fn blank_provider_and_concept_fail_after_normalizing() {
        let mut payload: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "proveedor": "   ",
            "concepto": "\t ",
            "nit": "  ",
            "monto": 10
        }))
        .unwrap();

        payload.normalize();
        assert!(payload.nit.is_none());

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("proveedor"));
        assert!(fields.contains_key("concepto"));
    }

    #[test]
    fn amounts_must_fit_the_column() {
        let mut payload: CreateOrderPayload = serde_json::from_value(serde_json::json!({
            "proveedor": "EMPRESA ABC",
            "concepto": "HONORARIOS",
            "monto": 1
        }))
        .unwrap();

        payload.monto = Decimal::MAX;
        payload.iva = max_amount() + Decimal::new(1, 2);
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("monto"));
        assert!(errors.field_errors().contains_key("iva"));

        payload.monto = Decimal::new(12345, 3);
        payload.iva = Decimal::ZERO;
        assert!(payload.validate().unwrap_err().field_errors().contains_key("monto"));

        payload.monto = max_amount();
        payload.iva = Decimal::new(1050, 3); // 1.050 == 1.05
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn summary_saturates_instead_of_overflowing() {
        let totals = vec![
            StatusTotal { estado: OrderStatus::Aprobada, aprobacion_automatica: false, cantidad: 1, total: Decimal::MAX },
            StatusTotal { estado: OrderStatus::Pagada, aprobacion_automatica: false, cantidad: 1, total: Decimal::MAX },
        ];

        let summary = OrdersSummary::from_totals(&totals);
        assert_eq!(summary.monto_total, Decimal::MAX);
        assert_eq!(summary.monto_aprobado, Decimal::MAX);
    }
}
