// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::orders::{CreateOrderPayload, OrderQuery, PaymentOrder, ReviewOrderPayload},
};

// POST /api/ordenes
#[utoipa::path(
    post,
    path = "/api/ordenes",
    tag = "Ordenes",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Ordem criada (aprovada automaticamente ou pendente)", body = PaymentOrder),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .create_order(&user, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/ordenes
#[utoipa::path(
    get,
    path = "/api/ordenes",
    tag = "Ordenes",
    params(OrderQuery),
    responses(
        (status = 200, description = "Ordens visíveis ao usuário, mais recentes primeiro", body = Vec<PaymentOrder>),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<PaymentOrder>>, ApiError> {
    let orders = app_state
        .order_service
        .list_orders(&user, query)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(orders))
}

// GET /api/ordenes/{id}
#[utoipa::path(
    get,
    path = "/api/ordenes/{id}",
    tag = "Ordenes",
    params(
        ("id" = Uuid, Path, description = "ID da ordem")
    ),
    responses(
        (status = 200, description = "Ordem encontrada", body = PaymentOrder),
        (status = 403, description = "Ordem de outro usuário"),
        (status = 404, description = "Ordem não encontrada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentOrder>, ApiError> {
    let order = app_state
        .order_service
        .get_order(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

// PATCH /api/ordenes/{id}/estado
#[utoipa::path(
    patch,
    path = "/api/ordenes/{id}/estado",
    tag = "Ordenes",
    request_body = ReviewOrderPayload,
    params(
        ("id" = Uuid, Path, description = "ID da ordem")
    ),
    responses(
        (status = 200, description = "Estado alterado", body = PaymentOrder),
        (status = 400, description = "Rejeição sem comentário"),
        (status = 403, description = "Usuário não é aprovador"),
        (status = 404, description = "Ordem não encontrada"),
        (status = 409, description = "Transição de estado inválida")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn review_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewOrderPayload>,
) -> Result<Json<PaymentOrder>, ApiError> {
    let order = app_state
        .order_service
        .review_order(&user, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

// DELETE /api/ordenes/{id}
#[utoipa::path(
    delete,
    path = "/api/ordenes/{id}",
    tag = "Ordenes",
    params(
        ("id" = Uuid, Path, description = "ID da ordem")
    ),
    responses(
        (status = 204, description = "Ordem excluída"),
        (status = 404, description = "Ordem não encontrada"),
        (status = 409, description = "Ordem já processada")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .order_service
        .delete_order(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
