// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const DEFAULT_LANG: &str = "es";
const SUPPORTED_LANGS: &[&str] = &["es", "en"];

// Extrator de idioma (só "es" e "en"; o resto cai no padrão)
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .iter()
            // "es-CO" -> "es"
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| SUPPORTED_LANGS.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(Locale::from_header("en-US,en;q=0.9").0, "en");
        assert_eq!(Locale::from_header("es-CO,es;q=0.9,en;q=0.8").0, "es");
        assert_eq!(Locale::from_header("pt-BR,en;q=0.5").0, "en");
    }

    #[test]
    fn falls_back_to_spanish() {
        assert_eq!(Locale::from_header("fr-FR").0, "es");
        assert_eq!(Locale::from_header("").0, "es");
    }
}
