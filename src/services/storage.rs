// src/services/storage.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{common::error::AppError, services::supabase::SupabaseClient};

/// Destino dos comprovantes anexados às ordens.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Grava o objeto e devolve a URL pública.
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}

pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let size = bytes.len();
        self.client.upload_object(&self.bucket, path, content_type, bytes).await?;
        tracing::info!(bucket = %self.bucket, %path, bytes = size, "Arquivo enviado ao Storage");
        Ok(self.client.public_url(&self.bucket, path))
    }
}

// Modo demo: guarda tudo em memória
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryStorage {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub async fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.objects.read().await.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, path: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("{}/{}", self.base_url, path))
    }
}

/// Tipo real do arquivo pelos magic bytes; o Content-Type do cliente não é confiável.
pub fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        _ => None,
    }
}

/// "Cuenta de cobro #12 (final).pdf" -> "Cuenta_de_cobro_12_final.pdf"
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;

    for c in name.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            Some(c)
        } else if c.is_whitespace() || c == '_' {
            Some('_')
        } else {
            None
        };

        if let Some(m) = mapped {
            if m == '_' {
                if last_underscore {
                    continue;
                }
                last_underscore = true;
            } else {
                last_underscore = false;
            }
            out.push(m);
        }
    }

    let out = out.trim_matches(|c| c == '_' || c == '.').to_string();
    if out.is_empty() { "archivo".to_string() } else { out }
}
