// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// Folga para os cabeçalhos do multipart
const MULTIPART_OVERHEAD: usize = 1024 * 1024;
const MAX_FILES_PER_BODY: usize = 10;

pub fn build_router(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/verify-otp", post(handlers::auth::verify_otp))
        .route(
            "/update-password",
            post(handlers::auth::update_password).layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth_guard,
            )),
        );

    // Tudo abaixo exige token
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::auth::get_me))
        .route(
            "/ordenes",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route(
            "/ordenes/{id}",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/ordenes/{id}/estado", patch(handlers::orders::review_order))
        .route("/dashboard/resumen", get(handlers::dashboard::get_summary))
        .route("/facturas/extraer", post(handlers::invoices::extract_invoice))
        .route("/archivos", post(handlers::uploads::upload_files))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let body_limit = body_limit(app_state.settings.max_upload_bytes);
    let cors = cors_layer(app_state.settings.cors_origin.as_deref());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// MAX_UPLOAD_BYTES vem do ambiente; satura em vez de estourar
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(MAX_FILES_PER_BODY)
        .saturating_add(MULTIPART_OVERHEAD)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN inválida; liberando qualquer origem");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
