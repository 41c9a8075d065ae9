//! Axum middleware that puts a [`TranslationContext`] on every request.
//!
//! `activate_language` reads the configured query parameter (`?lang=da` by
//! default) and `auto_translate` switches overlay reads on. Handlers pick the
//! context up with `Extension<TranslationContext>`.

use crate::config::TranslatorConfig;
use crate::overlay::{FieldValidator, TranslationContext};
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Set the active language from the request's language parameter. Without
/// one the request runs in the default language, whatever the configured
/// active language is.
pub async fn activate_language(
    State(config): State<Arc<TranslatorConfig>>,
    Query(params): Query<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Response {
    let language_code = params
        .get(&config.language_parameter)
        .filter(|code| !code.is_empty())
        .cloned()
        .unwrap_or_else(|| config.default_language_code.clone());

    if let Err(e) = FieldValidator::validate_language_code(&language_code) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    debug!("Active language for {}: {}", request.uri().path(), language_code);
    let mut ctx = take_context(&mut request, &config);
    ctx.activate_language(language_code);
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

/// Turn on auto-translation for the rest of the request.
pub async fn auto_translate(
    State(config): State<Arc<TranslatorConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ctx = take_context(&mut request, &config);
    ctx.enable_auto_translation();
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

fn take_context(request: &mut Request, config: &TranslatorConfig) -> TranslationContext {
    request
        .extensions_mut()
        .remove::<TranslationContext>()
        .unwrap_or_else(|| TranslationContext::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn_with_state, routing::get, Extension, Router};

    fn app(config: TranslatorConfig) -> Router {
        let config = Arc::new(config);
        Router::new()
            .route(
                "/",
                get(|Extension(ctx): Extension<TranslationContext>| async move { Json(ctx) }),
            )
            .layer(from_fn_with_state(Arc::clone(&config), auto_translate))
            .layer(from_fn_with_state(config, activate_language))
    }

    async fn context_for(config: TranslatorConfig, query: &str) -> (u16, serde_json::Value) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(config)).await.unwrap();
        });

        let response = reqwest::get(format!("http://{}/{}", addr, query))
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_language_from_query_parameter() {
        let (status, ctx) = context_for(TranslatorConfig::default(), "?lang=da").await;
        assert_eq!(status, 200);
        assert_eq!(ctx["active_language_code"], "da");
        assert_eq!(ctx["auto_translate"], true);
    }

    #[tokio::test]
    async fn test_language_falls_back_to_default() {
        let (_, ctx) = context_for(TranslatorConfig::default(), "").await;
        assert_eq!(ctx["active_language_code"], "en");
    }

    #[tokio::test]
    async fn test_missing_parameter_resets_to_default_language() {
        let config = TranslatorConfig {
            active_language_code: Some("de".to_string()),
            ..TranslatorConfig::default()
        };
        let (_, ctx) = context_for(config, "").await;
        assert_eq!(ctx["active_language_code"], "en");
        assert_eq!(ctx["default_language_code"], "en");
    }

    #[tokio::test]
    async fn test_empty_parameter_uses_default_language() {
        let config = TranslatorConfig {
            active_language_code: Some("de".to_string()),
            ..TranslatorConfig::default()
        };
        let (_, ctx) = context_for(config, "?lang=").await;
        assert_eq!(ctx["active_language_code"], "en");
    }

    #[tokio::test]
    async fn test_custom_language_parameter() {
        let config = TranslatorConfig {
            language_parameter: "locale".to_string(),
            ..TranslatorConfig::default()
        };
        let (_, ctx) = context_for(config, "?locale=fr&lang=da").await;
        assert_eq!(ctx["active_language_code"], "fr");
    }

    #[tokio::test]
    async fn test_invalid_language_is_rejected() {
        let (status, body) = context_for(TranslatorConfig::default(), "?lang=DROP%20TABLE").await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("language_code"));
    }
}
