// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    info(title = "Centro de Órdenes de Pago", description = "API de órdenes de pago con aprobación automática"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::reset_password,
        handlers::auth::verify_otp,
        handlers::auth::update_password,

        // --- Users ---
        handlers::auth::get_me,

        // --- Ordenes ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::review_order,
        handlers::orders::delete_order,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Facturas / Archivos ---
        handlers::invoices::extract_invoice,
        handlers::uploads::upload_files,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ResetPasswordPayload,
            models::auth::VerifyOtpPayload,
            models::auth::UpdatePasswordPayload,
            models::auth::AuthResponse,
            models::auth::MessageResponse,

            // --- Ordenes ---
            models::orders::OrderStatus,
            models::orders::PaymentOrder,
            models::orders::CreateOrderPayload,
            models::orders::ReviewOrderPayload,
            models::orders::OrdersSummary,
            services::approval::ApprovalReason,

            // --- Facturas ---
            services::invoice_parser::Confidence,
            services::invoice_parser::ExtractedInvoice,
            handlers::invoices::InvoiceExtractionResponse,

            // --- Archivos ---
            handlers::uploads::UploadedFile,
            handlers::uploads::UploadResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação via Supabase Auth"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Ordenes", description = "Órdenes de pago e fluxo de aprovação"),
        (name = "Dashboard", description = "Indicadores por estado"),
        (name = "Facturas", description = "Extração de campos de cuentas de cobro em PDF"),
        (name = "Archivos", description = "Comprovantes anexados às ordens")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
