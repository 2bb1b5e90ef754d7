// src/handlers/uploads.rs

use axum::{
    Json,
    extract::{Multipart, State, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    services::storage::{detect_content_type, sanitize_file_name},
};

const MAX_FILES_PER_REQUEST: usize = 10;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[schema(example = "factura.pdf")]
    pub name: String,
    pub path: String,
    pub url: String,
    pub size: usize,
    #[schema(example = "application/pdf")]
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// Lê o campo em pedaços e aborta assim que passar do limite.
pub async fn read_field(
    mut field: Field<'_>,
    limit: usize,
) -> Result<(Option<String>, Vec<u8>), AppError> {
    let file_name = field.file_name().map(str::to_string);
    let mut bytes = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::FileTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(AppError::InvalidUpload("archivo vacío".to_string()));
    }
    Ok((file_name, bytes))
}

// POST /api/archivos
#[utoipa::path(
    post,
    path = "/api/archivos",
    tag = "Archivos",
    request_body(content = String, content_type = "multipart/form-data", description = "Um ou mais campos `files` (ou `file`): PDF, PNG ou JPEG"),
    responses(
        (status = 201, description = "Arquivos armazenados", body = UploadResponse),
        (status = 400, description = "Tipo de arquivo não suportado"),
        (status = 413, description = "Arquivo grande demais")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn upload_files(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let limit = app_state.settings.max_upload_bytes;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()).to_api_error(&locale))?
    {
        if !matches!(field.name(), Some("files") | Some("file")) {
            continue;
        }
        if files.len() >= MAX_FILES_PER_REQUEST {
            return Err(AppError::InvalidUpload(format!(
                "máximo {} archivos por solicitud",
                MAX_FILES_PER_REQUEST
            ))
            .to_api_error(&locale));
        }

        let (file_name, bytes) = read_field(field, limit).await.map_err(|e| e.to_api_error(&locale))?;

        let content_type = detect_content_type(&bytes).ok_or_else(|| {
            AppError::InvalidUpload("solo se permiten PDF, PNG o JPEG".to_string()).to_api_error(&locale)
        })?;

        let name = sanitize_file_name(file_name.as_deref().unwrap_or("archivo"));
        let path = format!("ordenes/{}/{}-{}", user.id, Uuid::new_v4(), name);
        let size = bytes.len();

        let url = app_state
            .storage
            .put(&path, content_type, bytes)
            .await
            .map_err(|e| e.to_api_error(&locale))?;

        files.push(UploadedFile { name, path, url, size, content_type: content_type.to_string() });
    }

    if files.is_empty() {
        return Err(AppError::InvalidUpload("no se recibió ningún archivo".to_string()).to_api_error(&locale));
    }

    tracing::info!(user_id = %user.id, count = files.len(), "Comprovantes enviados");
    Ok((StatusCode::CREATED, Json(UploadResponse { files })))
}
