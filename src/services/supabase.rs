// src/services/supabase.rs
//
// Cliente REST mínimo para o Supabase: Auth (GoTrue) e Storage.

use reqwest::{Client, RequestBuilder, Response, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

use crate::{common::error::AppError, config::SupabaseSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueUser {
    pub id: Uuid,
    pub email: Option<String>,
}

// /token e /verify devolvem sessão; /signup pode devolver só o usuário.
#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: Option<GoTrueUser>,
    // Presentes quando a resposta é o próprio usuário
    pub id: Option<Uuid>,
    pub email: Option<String>,
}

impl GoTrueSession {
    pub fn into_user(self) -> Option<GoTrueUser> {
        match (self.user, self.id) {
            (Some(user), _) => Some(user),
            (None, Some(id)) => Some(GoTrueUser { id, email: self.email }),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    settings: SupabaseSettings,
}

impl SupabaseClient {
    pub fn new(settings: SupabaseSettings) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, settings })
    }

    fn auth_request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.settings.anon_key)
    }

    // --- AUTH ---

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<GoTrueSession, AppError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.settings.url);
        let response = self
            .auth_request(self.http.post(url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(AppError::InvalidCredentials)
            }
            _ => parse_json(response).await,
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<GoTrueSession, AppError> {
        let url = format!("{}/auth/v1/signup", self.settings.url);
        let response = self
            .auth_request(self.http.post(url))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            if body.to_lowercase().contains("already registered") || body.contains("user_already_exists") {
                return Err(AppError::EmailAlreadyExists);
            }
            return Err(AppError::UpstreamError { status: status.as_u16(), message: body });
        }
        parse_json(response).await
    }

    /// Dispara o e-mail de recuperação (com OTP).
    pub async fn recover(&self, email: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/recover", self.settings.url);
        let response = self
            .auth_request(self.http.post(url))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        expect_success(response).await
    }

    pub async fn verify_recovery_otp(&self, email: &str, token: &str) -> Result<GoTrueSession, AppError> {
        let url = format!("{}/auth/v1/verify", self.settings.url);
        let response = self
            .auth_request(self.http.post(url))
            .json(&json!({ "type": "recovery", "email": email, "token": token }))
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(AppError::InvalidOtp)
            }
            _ => parse_json(response).await,
        }
    }

    pub async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/user", self.settings.url);
        let response = self
            .auth_request(self.http.put(url))
            .bearer_auth(access_token)
            .json(&json!({ "password": password }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::InvalidToken);
        }
        expect_success(response).await
    }

    // --- STORAGE ---

    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AppError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.settings.url, bucket, path);
        let response = self
            .http
            .post(url)
            .header("apikey", &self.settings.service_key)
            .bearer_auth(&self.settings.service_key)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        expect_success(response).await
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.settings.url, bucket, path)
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        return Err(upstream_error(status, response).await);
    }
    Ok(response.json::<T>().await?)
}

async fn expect_success(response: Response) -> Result<(), AppError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(upstream_error(status, response).await)
    }
}

async fn upstream_error(status: StatusCode, response: Response) -> AppError {
    let body = response.text().await.unwrap_or_default();
    // GoTrue usa "msg"/"error_description", o Storage usa "message"
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(body);

    tracing::warn!(status = status.as_u16(), %message, "Supabase respondeu com erro");
    AppError::UpstreamError { status: status.as_u16(), message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(SupabaseSettings {
            url: "https://abc.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_key: "service".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn public_url_points_to_public_bucket() {
        assert_eq!(
            client().public_url("documentos", "ordenes/u/f.pdf"),
            "https://abc.supabase.co/storage/v1/object/public/documentos/ordenes/u/f.pdf"
        );
    }

    #[test]
    fn signup_response_without_session_still_yields_user() {
        let id = Uuid::new_v4();
        let session: GoTrueSession =
            serde_json::from_value(json!({ "id": id, "email": "a@b.co", "confirmation_sent_at": "x" })).unwrap();

        assert!(session.access_token.is_none());
        let user = session.into_user().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn token_response_is_parsed() {
        let id = Uuid::new_v4();
        let session: GoTrueSession = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": id, "email": "a@b.co", "role": "authenticated" }
        }))
        .unwrap();

        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert_eq!(session.expires_in, Some(3600));
        assert_eq!(session.into_user().unwrap().id, id);
    }
}
