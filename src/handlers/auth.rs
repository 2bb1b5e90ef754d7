// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::{AccessToken, AuthenticatedUser},
        i18n::Locale,
    },
    models::auth::{
        AuthResponse, LoginUserPayload, MessageResponse, RegisterUserPayload, ResetPasswordPayload,
        UpdatePasswordPayload, User, VerifyOtpPayload,
    },
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário registrado (token nulo se aguarda confirmação)", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .register_user(&payload.email, &payload.password, payload.full_name.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Código de recuperação enviado", body = MessageResponse)
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    app_state
        .auth_service
        .request_password_reset(&payload.email)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let message = if locale.is_english() {
        "If the email is registered, you will receive a verification code."
    } else {
        "Si el correo está registrado, recibirá un código de verificación."
    };
    Ok(Json(MessageResponse { message: message.to_string() }))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "Código válido, sessão de recuperação aberta", body = AuthResponse),
        (status = 400, description = "Código inválido ou expirado")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .auth_service
        .verify_otp(&payload.email, payload.token.trim())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/update-password",
    tag = "Auth",
    request_body = UpdatePasswordPayload,
    responses(
        (status = 200, description = "Senha atualizada", body = MessageResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_password(
    State(app_state): State<AppState>,
    locale: Locale,
    AccessToken(token): AccessToken,
    Json(payload): Json<UpdatePasswordPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    app_state
        .auth_service
        .update_password(&token, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let message = if locale.is_english() {
        "Password updated successfully."
    } else {
        "Contraseña actualizada correctamente."
    };
    Ok(Json(MessageResponse { message: message.to_string() }))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}
