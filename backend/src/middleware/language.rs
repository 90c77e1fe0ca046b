//! Language negotiation from the Accept-Language header

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use shared::i18n::Language;

use crate::AppState;

/// Language the caller asked for, falling back to the configured default
#[derive(Debug, Clone, Copy)]
pub struct RequestLanguage(pub Language);

/// Pick the best supported language from an Accept-Language value
pub fn negotiate(header_value: &str) -> Option<Language> {
    accept_language::parse(header_value)
        .iter()
        .find_map(|tag| Language::from_tag(tag))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestLanguage {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let language = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(negotiate)
            .unwrap_or(state.config.business.default_language);

        Ok(RequestLanguage(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_prefers_quality_order() {
        assert_eq!(negotiate("ar-MA,fr;q=0.8"), Some(Language::Arabic));
        assert_eq!(negotiate("de;q=0.9,fr-FR;q=0.8"), Some(Language::French));
        assert_eq!(negotiate("de,es"), None);
    }
}
