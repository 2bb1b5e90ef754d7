// src/handlers/invoices.rs

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::uploads::read_field,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    services::{
        invoice_parser::{Confidence, ExtractedInvoice, extract_data_from_text},
        pdf_text::extract_text_from_pdf,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceExtractionResponse {
    pub data: ExtractedInvoice,
    pub confidence: Confidence,
    pub fields_found: usize,
    pub text_length: usize,
}

// POST /api/facturas/extraer
#[utoipa::path(
    post,
    path = "/api/facturas/extraer",
    tag = "Facturas",
    request_body(content = String, content_type = "multipart/form-data", description = "Campo `file` (ou `pdf`) com a cuenta de cobro em PDF"),
    responses(
        (status = 200, description = "Campos extraídos (melhor esforço)", body = InvoiceExtractionResponse),
        (status = 400, description = "Arquivo ausente ou não é PDF"),
        (status = 413, description = "Arquivo grande demais"),
        (status = 422, description = "PDF escaneado ou ilegível")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn extract_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<InvoiceExtractionResponse>, ApiError> {
    let limit = app_state.settings.max_upload_bytes;
    let mut pdf: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()).to_api_error(&locale))?
    {
        if matches!(field.name(), Some("file") | Some("pdf")) {
            let (_, bytes) = read_field(field, limit).await.map_err(|e| e.to_api_error(&locale))?;
            pdf = Some(bytes);
            break;
        }
    }

    let bytes = pdf.ok_or_else(|| {
        AppError::InvalidUpload("falta el campo 'file'".to_string()).to_api_error(&locale)
    })?;

    let size = bytes.len();
    let text = extract_text_from_pdf(bytes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    let data = extract_data_from_text(&text);

    tracing::info!(
        user_id = %user.id,
        bytes = size,
        fields_found = data.fields_found,
        confidence = ?data.confidence,
        "Cuenta de cobro processada"
    );

    Ok(Json(InvoiceExtractionResponse {
        confidence: data.confidence,
        fields_found: data.fields_found,
        text_length: text.chars().count(),
        data,
    }))
}
