//! Demo HTTP service: a translatable `product` entity behind the language
//! middleware.
//!
//! Reads resolve through the request's [`TranslationContext`]; writes go to
//! the base row in the default language and to the overlay otherwise.

use crate::entity::{AttributeCast, AttributeMap, EntityDescriptor};
use crate::error::TranslatorError;
use crate::middleware::{activate_language, auto_translate};
use crate::overlay::{SelectQuery, TranslationContext, Translator};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

pub const PRODUCT: &str = "product";

/// The demo entity: translatable name, description and JSON data; plain
/// price and SKU; soft-deletable.
pub fn product_descriptor() -> EntityDescriptor {
    EntityDescriptor::new(PRODUCT, "products")
        .column("name", AttributeCast::String)
        .column("description", AttributeCast::String)
        .column("data", AttributeCast::Json)
        .column("price", AttributeCast::Float)
        .column("sku", AttributeCast::String)
        .translatable(&["name", "description", "data"])
        .soft_deletable()
}

#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
}

pub fn router(translator: Arc<Translator>) -> Router {
    let config = Arc::new(translator.config().clone());
    let state = AppState { translator };

    Router::new()
        .route("/products", post(create_product))
        .route("/products/stats", get(product_stats))
        .route(
            "/products/:id",
            get(show_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/restore", post(restore_product))
        .with_state(state)
        .layer(from_fn_with_state(Arc::clone(&config), auto_translate))
        .layer(from_fn_with_state(config, activate_language))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    Translator(TranslatorError),
}

impl From<TranslatorError> for ApiError {
    fn from(e: TranslatorError) -> Self {
        Self::Translator(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Conflict(message) => (StatusCode::CONFLICT, message),
            Self::Translator(e) => {
                let status = match &e {
                    TranslatorError::InvalidField { .. }
                    | TranslatorError::UncastStructuredValue(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    TranslatorError::UnknownEntityType(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!("Request failed: {}", e);
                }
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Use the middleware's context, or a fresh one when the router was mounted
/// without it.
fn request_context(
    translator: &Translator,
    ctx: Option<Extension<TranslationContext>>,
) -> TranslationContext {
    ctx.map(|Extension(ctx)| ctx)
        .unwrap_or_else(|| translator.context())
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("product {} not found", id))
}

async fn show_product(
    State(state): State<AppState>,
    ctx: Option<Extension<TranslationContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AttributeMap>> {
    let translator = &state.translator;
    let ctx = request_context(translator, ctx);
    let product = translator
        .find_with_translations(PRODUCT, id)?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(translator.to_map(&product, &ctx)?))
}

async fn create_product(
    State(state): State<AppState>,
    ctx: Option<Extension<TranslationContext>>,
    Json(data): Json<AttributeMap>,
) -> ApiResult<(StatusCode, Json<AttributeMap>)> {
    let translator = &state.translator;
    let ctx = request_context(translator, ctx);
    let product = translator.create_and_translate(PRODUCT, ctx.active_language_code(), &data)?;

    Ok((StatusCode::CREATED, Json(translator.to_map(&product, &ctx)?)))
}

async fn update_product(
    State(state): State<AppState>,
    ctx: Option<Extension<TranslationContext>>,
    Path(id): Path<i64>,
    Json(data): Json<AttributeMap>,
) -> ApiResult<Json<AttributeMap>> {
    let translator = &state.translator;
    let ctx = request_context(translator, ctx);
    let mut product = translator
        .find_with_translations(PRODUCT, id)?
        .ok_or_else(|| not_found(id))?;

    translator.update_and_translate(&mut product, ctx.active_language_code(), &data)?;
    Ok(Json(translator.to_map(&product, &ctx)?))
}

#[derive(Debug, Default, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    force: bool,
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    let translator = &state.translator;

    if params.force {
        let mut product = translator
            .find_with_trashed(PRODUCT, id)?
            .ok_or_else(|| not_found(id))?;
        translator.force_delete(&mut product)?;
    } else {
        let mut product = translator.find(PRODUCT, id)?.ok_or_else(|| not_found(id))?;
        translator.delete(&mut product)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_product(
    State(state): State<AppState>,
    ctx: Option<Extension<TranslationContext>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AttributeMap>> {
    let translator = &state.translator;
    let ctx = request_context(translator, ctx);
    let mut product = translator
        .find_with_trashed(PRODUCT, id)?
        .ok_or_else(|| not_found(id))?;

    if !translator.restore(&mut product)? {
        return Err(ApiError::Conflict(format!("product {} is not deleted", id)));
    }
    translator.load_translations(&mut product)?;
    Ok(Json(translator.to_map(&product, &ctx)?))
}

/// Every live product with its stats for the active language.
async fn product_stats(
    State(state): State<AppState>,
    ctx: Option<Extension<TranslationContext>>,
) -> ApiResult<Json<Value>> {
    let translator = &state.translator;
    let ctx = request_context(translator, ctx);
    let descriptor = translator.registry().require(PRODUCT)?;

    let query = SelectQuery::for_entity(descriptor)
        .filter("products.deleted_at IS NULL", Vec::new())
        .order_by("products.id");
    let query = translator.stats_scope(query, PRODUCT, ctx.active_language_code())?;
    let rows = translator.database().fetch_rows(&query)?;

    Ok(Json(json!({
        "language_code": ctx.active_language_code(),
        "products": rows,
    })))
}
