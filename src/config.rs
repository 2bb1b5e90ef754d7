// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{DemoOrderRepository, OrderRepository, OrderStore},
    services::{
        approval::ApprovalRules,
        auth::AuthService,
        notifier::{LogNotifier, Notifier, SmtpNotifier},
        order_service::OrderService,
        storage::{MemoryStorage, ObjectStorage, SupabaseStorage},
        supabase::SupabaseClient,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_BUCKET: &str = "documentos";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEMO_JWT_SECRET: &str = "cop-demo-secret";

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
    pub service_key: String,
}

// Tudo o que vem do ambiente, já validado.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub supabase: Option<SupabaseSettings>,
    pub jwt_secret: String,
    pub storage_bucket: String,
    pub smtp: Option<SmtpSettings>,
    pub approver_emails: Vec<String>,
    pub auto_approve_providers: Vec<String>,
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
    pub demo_mode: bool,
    pub demo_email: String,
    pub demo_password: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let demo_mode = env_flag("DEMO_MODE");

        let database_url = optional("DATABASE_URL");
        let supabase = match (
            optional("SUPABASE_URL"),
            optional("SUPABASE_ANON_KEY"),
            optional("SUPABASE_SERVICE_KEY"),
        ) {
            (Some(url), Some(anon_key), Some(service_key)) => Some(SupabaseSettings {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
                service_key,
            }),
            _ => None,
        };
        let jwt_secret = optional("SUPABASE_JWT_SECRET");

        // Fora do modo demo, banco + Supabase são obrigatórios.
        let jwt_secret = if demo_mode {
            jwt_secret.unwrap_or_else(|| DEMO_JWT_SECRET.to_string())
        } else {
            database_url
                .as_ref()
                .context("DATABASE_URL deve ser definida (ou DEMO_MODE=true)")?;
            supabase.as_ref().context(
                "SUPABASE_URL, SUPABASE_ANON_KEY e SUPABASE_SERVICE_KEY devem ser definidas",
            )?;
            jwt_secret.context("SUPABASE_JWT_SECRET deve ser definido")?
        };

        let smtp = match (optional("SMTP_HOST"), optional("SMTP_USERNAME")) {
            (Some(host), Some(username)) => Some(SmtpSettings {
                port: optional("SMTP_PORT")
                    .map(|p| p.parse::<u16>())
                    .transpose()
                    .context("SMTP_PORT inválida")?
                    .unwrap_or(587),
                password: optional("SMTP_PASSWORD").unwrap_or_default(),
                from: optional("SMTP_FROM").unwrap_or_else(|| username.clone()),
                host,
                username,
            }),
            _ => None,
        };

        let max_upload_bytes = optional("MAX_UPLOAD_BYTES")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("MAX_UPLOAD_BYTES inválido")?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url,
            supabase,
            jwt_secret,
            storage_bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            smtp,
            approver_emails: csv_list(optional("APPROVER_EMAILS"))
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            auto_approve_providers: csv_list(optional("AUTO_APPROVE_PROVIDERS")),
            max_upload_bytes,
            cors_origin: optional("CORS_ORIGIN"),
            demo_mode,
            demo_email: optional("DEMO_EMAIL").unwrap_or_else(|| "demo@cop.local".to_string()),
            demo_password: optional("DEMO_PASSWORD").unwrap_or_else(|| "demo1234".to_string()),
        })
    }

    /// Configuração mínima para rodar sem serviços externos (testes e demo).
    pub fn demo() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            supabase: None,
            jwt_secret: DEMO_JWT_SECRET.to_string(),
            storage_bucket: DEFAULT_BUCKET.to_string(),
            smtp: None,
            approver_emails: Vec::new(),
            auto_approve_providers: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origin: None,
            demo_mode: true,
            demo_email: "demo@cop.local".to_string(),
            demo_password: "demo1234".to_string(),
        }
    }

    pub fn is_approver(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        (self.demo_mode && email == self.demo_email.to_lowercase())
            || self.approver_emails.iter().any(|a| *a == email)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    optional(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn csv_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub order_service: OrderService,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        if settings.demo_mode {
            tracing::warn!("⚠️ DEMO_MODE ativo: sem banco, sem Supabase e sem SMTP");
            return Ok(Self::demo(settings));
        }

        let database_url = settings
            .database_url
            .as_deref()
            .context("DATABASE_URL deve ser definida")?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let supabase_settings = settings
            .supabase
            .clone()
            .context("Configuração do Supabase ausente")?;
        let supabase = SupabaseClient::new(supabase_settings)?;

        let notifier: Arc<dyn Notifier> = match &settings.smtp {
            Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
            None => {
                tracing::warn!("SMTP não configurado; notificações apenas no log");
                Arc::new(LogNotifier)
            }
        };

        let storage: Arc<dyn ObjectStorage> = Arc::new(SupabaseStorage::new(
            supabase.clone(),
            settings.storage_bucket.clone(),
        ));

        // --- Monta o gráfico de dependências ---
        let store: Arc<dyn OrderStore> = Arc::new(OrderRepository::new(db_pool.clone()));
        let rules = ApprovalRules::with_providers(&settings.auto_approve_providers);
        let order_service = OrderService::new(store, rules, notifier);

        let settings = Arc::new(settings);
        let auth_service = AuthService::new(settings.clone(), Some(supabase));

        Ok(Self {
            settings,
            db_pool: Some(db_pool),
            auth_service,
            order_service,
            storage,
        })
    }

    /// Estado totalmente em memória (modo demo e testes de rotas).
    pub fn demo(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let store: Arc<dyn OrderStore> = Arc::new(DemoOrderRepository::seeded(&settings.demo_email));
        let rules = ApprovalRules::with_providers(&settings.auto_approve_providers);
        let order_service = OrderService::new(store, rules, Arc::new(LogNotifier));

        Self {
            auth_service: AuthService::new(settings.clone(), None),
            storage: Arc::new(MemoryStorage::new("http://localhost:3000/demo-storage")),
            settings,
            db_pool: None,
            order_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_list_skips_blank_entries() {
        let list = csv_list(Some(" a@x.co , ,b@x.co,".to_string()));
        assert_eq!(list, vec!["a@x.co".to_string(), "b@x.co".to_string()]);
        assert!(csv_list(None).is_empty());
    }

    #[test]
    fn approvers_are_matched_case_insensitively() {
        let mut settings = Settings::demo();
        settings.demo_mode = false;
        settings.approver_emails = vec!["tesoreria@aseguradora.co".to_string()];

        assert!(settings.is_approver("Tesoreria@Aseguradora.co"));
        assert!(!settings.is_approver("otro@aseguradora.co"));
        assert!(!settings.is_approver("demo@cop.local"));
    }

    #[test]
    fn demo_user_is_approver_in_demo_mode() {
        let settings = Settings::demo();
        assert!(settings.is_approver("DEMO@cop.local"));
    }
}
