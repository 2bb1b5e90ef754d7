// src/handlers/dashboard.rs

use axum::{Json, extract::State};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::orders::OrdersSummary,
};

// GET /api/dashboard/resumen
#[utoipa::path(
    get,
    path = "/api/dashboard/resumen",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Quantidades e valores por estado", body = OrdersSummary),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<OrdersSummary>, ApiError> {
    let summary = app_state
        .order_service
        .summary(&user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(summary))
}
