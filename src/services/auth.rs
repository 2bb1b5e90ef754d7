// src/services/auth.rs

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::Settings,
    models::auth::{AuthResponse, Claims, User},
    services::supabase::{GoTrueSession, SupabaseClient},
};

const AUDIENCE: &str = "authenticated";
const DEMO_TOKEN_TTL_SECS: i64 = 60 * 60 * 8;

// Id fixo do usuário demo, para que as ordens semeadas pertençam a ele
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x0000_0c0b_0000_4000_8000_0000_0000_0001);

#[derive(Clone)]
pub struct AuthService {
    settings: Arc<Settings>,
    // None => modo demo
    supabase: Option<SupabaseClient>,
}

impl AuthService {
    pub fn new(settings: Arc<Settings>, supabase: Option<SupabaseClient>) -> Self {
        Self { settings, supabase }
    }

    fn is_demo(&self) -> bool {
        self.settings.demo_mode || self.supabase.is_none()
    }

    fn client(&self) -> Result<&SupabaseClient, AppError> {
        self.supabase
            .as_ref()
            .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("Supabase não configurado")))
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        if self.is_demo() {
            let valid = email.eq_ignore_ascii_case(&self.settings.demo_email)
                && password == self.settings.demo_password;
            if !valid {
                return Err(AppError::InvalidCredentials);
            }
            tracing::info!("🔓 Login demo");
            return self.demo_session();
        }

        let session = self.client()?.sign_in_with_password(email, password).await?;
        tracing::info!(email = %email, "Login realizado");
        Ok(self.session_response(session))
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<AuthResponse, AppError> {
        if self.is_demo() {
            // Não há cadastro real no modo demo: devolve a sessão demo
            return self.demo_session();
        }

        let session = self.client()?.sign_up(email, password, full_name).await?;
        tracing::info!(email = %email, confirmed = session.access_token.is_some(), "Usuário registrado");
        Ok(self.session_response(session))
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        if self.is_demo() {
            tracing::info!(email = %email, "Recuperação de senha ignorada (demo)");
            return Ok(());
        }
        self.client()?.recover(email).await
    }

    pub async fn verify_otp(&self, email: &str, token: &str) -> Result<AuthResponse, AppError> {
        if self.is_demo() {
            return self.demo_session();
        }
        let session = self.client()?.verify_recovery_otp(email, token).await?;
        Ok(self.session_response(session))
    }

    pub async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AppError> {
        if self.is_demo() {
            tracing::info!("Troca de senha ignorada (demo)");
            return Ok(());
        }
        self.client()?.update_password(access_token, password).await
    }

    /// Valida o JWT (HS256, audience "authenticated") e monta o usuário.
    pub fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let email = token_data.claims.email.unwrap_or_default();
        Ok(User {
            id: token_data.claims.sub,
            is_approver: self.settings.is_approver(&email),
            email,
        })
    }

    fn session_response(&self, session: GoTrueSession) -> AuthResponse {
        let token = session.access_token.clone();
        let refresh_token = session.refresh_token.clone();
        let expires_in = session.expires_in;
        let user = session.into_user().map(|u| {
            let email = u.email.unwrap_or_default();
            User { id: u.id, is_approver: self.settings.is_approver(&email), email }
        });

        AuthResponse { token, refresh_token, expires_in, user }
    }

    fn demo_session(&self) -> Result<AuthResponse, AppError> {
        let email = self.settings.demo_email.clone();
        let token = self.create_token(DEMO_USER_ID, &email, DEMO_TOKEN_TTL_SECS)?;
        Ok(AuthResponse {
            token: Some(token),
            refresh_token: None,
            expires_in: Some(DEMO_TOKEN_TTL_SECS),
            user: Some(User { id: DEMO_USER_ID, is_approver: true, email }),
        })
    }

    // Mesmo formato das claims do Supabase, assinado com o segredo local
    pub fn create_token(&self, user_id: Uuid, email: &str, ttl_secs: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(ttl_secs);

        let claims = Claims {
            sub: user_id,
            email: Some(email.to_string()),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            aud: AUDIENCE.to_string(),
            role: Some(AUDIENCE.to_string()),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_service() -> AuthService {
        AuthService::new(Arc::new(Settings::demo()), None)
    }

    #[tokio::test]
    async fn demo_login_issues_a_valid_token() {
        let service = demo_service();
        let response = service.login_user("DEMO@cop.local", "demo1234").await.unwrap();

        let token = response.token.unwrap();
        let user = service.validate_token(&token).unwrap();
        assert_eq!(user.id, DEMO_USER_ID);
        assert_eq!(user.email, "demo@cop.local");
        assert!(user.is_approver);
    }

    #[tokio::test]
    async fn demo_login_rejects_wrong_password() {
        let result = demo_service().login_user("demo@cop.local", "errada").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let mut other = Settings::demo();
        other.jwt_secret = "outro-segredo".to_string();
        let foreign = AuthService::new(Arc::new(other), None)
            .create_token(Uuid::new_v4(), "x@y.co", 60)
            .unwrap();

        assert!(matches!(demo_service().validate_token(&foreign), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = demo_service();
        let token = service.create_token(Uuid::new_v4(), "x@y.co", -3600).unwrap();
        assert!(matches!(service.validate_token(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn non_approver_tokens_are_flagged() {
        let service = demo_service();
        let token = service.create_token(Uuid::new_v4(), "analista@aseguradora.co", 60).unwrap();
        let user = service.validate_token(&token).unwrap();
        assert!(!user.is_approver);
    }
}
