// src/common/error.rs

use std::collections::HashMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::{middleware::i18n::Locale, models::orders::OrderStatus};

// Erro de domínio. Os handlers convertem para `ApiError` já traduzido.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Código OTP inválido ou expirado")]
    InvalidOtp,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Ordem de pagamento não encontrada")]
    OrderNotFound,

    #[error("Transição de estado inválida: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("A ordem não pode mais ser alterada")]
    OrderNotEditable,

    #[error("Rejeição exige comentário")]
    ReviewCommentRequired,

    #[error("Upload inválido: {0}")]
    InvalidUpload(String),

    #[error("Arquivo excede o tamanho máximo de {0} bytes")]
    FileTooLarge(usize),

    #[error("PDF sem texto extraível")]
    ScannedPdf,

    #[error("Falha ao extrair texto do PDF: {0}")]
    PdfExtraction(String),

    #[error("Erro do Supabase ({status}): {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro HTTP: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // `anyhow::Error` captura o contexto de qualquer outra falha.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// Corpo de erro devolvido ao cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::ReviewCommentRequired
            | AppError::InvalidUpload(_)
            | AppError::InvalidOtp => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists
            | AppError::InvalidStatusTransition { .. }
            | AppError::OrderNotEditable => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::OrderNotFound => StatusCode::NOT_FOUND,
            AppError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ScannedPdf | AppError::PdfExtraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UpstreamError { .. } | AppError::HttpClientError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro em resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        let en = locale.is_english();

        if status.is_server_error() {
            tracing::error!(error = %self, "Erro Interno do Servidor");
        }

        let message = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                return ApiError {
                    status,
                    error: pick(en, "Uno o más campos son inválidos.", "One or more fields are invalid.")
                        .to_string(),
                    details: Some(json!(details)),
                };
            }
            AppError::EmailAlreadyExists => {
                pick(en, "Este correo ya está registrado.", "This email is already registered.").to_string()
            }
            AppError::InvalidCredentials => {
                pick(en, "Correo o contraseña inválidos.", "Invalid email or password.").to_string()
            }
            AppError::InvalidOtp => {
                pick(en, "El código es inválido o ha expirado.", "The code is invalid or has expired.")
                    .to_string()
            }
            AppError::InvalidToken | AppError::JwtError(_) => pick(
                en,
                "Token de autenticación inválido o ausente.",
                "Missing or invalid authentication token.",
            )
            .to_string(),
            AppError::Forbidden => {
                pick(en, "No tiene permisos para esta acción.", "You are not allowed to do this.")
                    .to_string()
            }
            AppError::OrderNotFound => {
                pick(en, "Orden de pago no encontrada.", "Payment order not found.").to_string()
            }
            AppError::InvalidStatusTransition { from, to } => {
                if en {
                    format!("Cannot change the order status from '{}' to '{}'.", from, to)
                } else {
                    format!("No es posible cambiar el estado de '{}' a '{}'.", from, to)
                }
            }
            AppError::OrderNotEditable => pick(
                en,
                "La orden ya fue procesada y no puede modificarse.",
                "The order was already processed and cannot be modified.",
            )
            .to_string(),
            AppError::ReviewCommentRequired => pick(
                en,
                "Debe indicar el motivo del rechazo.",
                "A comment is required to reject an order.",
            )
            .to_string(),
            AppError::InvalidUpload(reason) => {
                if en {
                    format!("Invalid file: {}", reason)
                } else {
                    format!("Archivo inválido: {}", reason)
                }
            }
            AppError::FileTooLarge(limit) => {
                let mb = *limit as f64 / (1024.0 * 1024.0);
                if en {
                    format!("The file exceeds the {:.0} MB limit.", mb)
                } else {
                    format!("El archivo supera el límite de {:.0} MB.", mb)
                }
            }
            AppError::ScannedPdf => pick(
                en,
                "El PDF no contiene texto (posiblemente escaneado). Complete el formulario manualmente.",
                "The PDF has no text (probably scanned). Please fill in the form manually.",
            )
            .to_string(),
            AppError::PdfExtraction(_) => {
                pick(en, "No fue posible leer el PDF.", "The PDF could not be read.").to_string()
            }
            AppError::UpstreamError { .. } | AppError::HttpClientError(_) => pick(
                en,
                "El servicio externo no respondió correctamente.",
                "The upstream service failed to respond.",
            )
            .to_string(),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                pick(en, "Ocurrió un error inesperado.", "An unexpected error occurred.").to_string()
            }
        };

        ApiError { status, error: message, details: None }
    }
}

fn pick(en: bool, es: &'static str, english: &'static str) -> &'static str {
    if en { english } else { es }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error(&Locale::default())
    }
}

// Usado pelos middlewares, onde não temos o idioma à mão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "requerido"))]
        name: String,
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&Locale::default());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["name"][0], "requerido");
    }

    #[test]
    fn messages_follow_the_locale() {
        let es = AppError::OrderNotFound.to_api_error(&Locale("es".into()));
        let en = AppError::OrderNotFound.to_api_error(&Locale("en".into()));

        assert_eq!(es.status, StatusCode::NOT_FOUND);
        assert_eq!(es.error, "Orden de pago no encontrada.");
        assert_eq!(en.error, "Payment order not found.");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("conexão perdida com 10.0.0.3"));
        let api = err.to_api_error(&Locale("en".into()));

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("10.0.0.3"));
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = AppError::InvalidStatusTransition {
            from: OrderStatus::Rechazada,
            to: OrderStatus::Pagada,
        };
        let api = err.to_api_error(&Locale::default());

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("rechazada"));
        assert!(api.error.contains("pagada"));
    }
}
