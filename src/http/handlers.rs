//! Service endpoints.
//!
//! Every handler enriches the request span through [`CurrentSpan`]; the
//! instrumentation middleware owns opening and closing it.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::cart::CartStore;
use crate::http::middleware::CurrentSpan;
use crate::http::response::ApiError;
use crate::http::simulation::{ErrorSimulator, SimulatedOutcome};
use crate::observability::metrics;

/// State shared by the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<CartStore>,
    pub simulator: Arc<ErrorSimulator>,
}

/// Cart contents returned by the `/cart/*` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub user_id: String,
    pub items: Vec<String>,
    pub size: usize,
}

impl CartView {
    fn new(user_id: &str, items: Vec<String>) -> Self {
        Self {
            user_id: user_id.to_string(),
            size: items.len(),
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddParams {
    user_id: Option<String>,
    item: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    user_id: Option<String>,
    index: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetParams {
    user_id: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Mark the span and count the operation for a failed cart call.
fn fail(span: &CurrentSpan, operation: &'static str, err: impl Into<ApiError>) -> ApiError {
    let err = err.into();
    span.set("error", true);
    metrics::record_cart_operation(operation, "error");
    tracing::debug!(operation, error = %err, "Cart operation rejected");
    err
}

pub async fn health(span: CurrentSpan) -> (StatusCode, &'static str) {
    span.set("health.status", "ok");
    (StatusCode::OK, "OK")
}

pub async fn error(State(state): State<AppState>, span: CurrentSpan) -> (StatusCode, &'static str) {
    match state.simulator.draw() {
        SimulatedOutcome::ServerError => {
            span.set("error.type", "internal_server_error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
        SimulatedOutcome::ClientError => {
            span.set("error.type", "bad_request");
            (StatusCode::BAD_REQUEST, "Bad Request")
        }
        SimulatedOutcome::Success => {
            span.set("result", "success");
            (StatusCode::OK, "Success")
        }
    }
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    span: CurrentSpan,
    Query(params): Query<AddParams>,
) -> Result<Json<CartView>, ApiError> {
    let (Some(user_id), Some(item)) = (required(params.user_id), required(params.item)) else {
        return Err(fail(
            &span,
            "add",
            ApiError::BadRequest("Missing user_id or item parameter".into()),
        ));
    };
    span.set("user.id", user_id.as_str());
    span.set("cart.item", item.as_str());

    let items = state
        .store
        .add_item(&user_id, &item)
        .map_err(|e| fail(&span, "add", e))?;

    let view = CartView::new(&user_id, items);
    span.set("cart.size", view.size);
    span.set("operation", "add");
    metrics::record_cart_operation("add", "ok");
    Ok(Json(view))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    span: CurrentSpan,
    Query(params): Query<RemoveParams>,
) -> Result<Json<CartView>, ApiError> {
    let (Some(user_id), Some(raw_index)) = (required(params.user_id), required(params.index))
    else {
        return Err(fail(
            &span,
            "remove",
            ApiError::BadRequest("Missing user_id or index parameter".into()),
        ));
    };
    span.set("user.id", user_id.as_str());
    span.set("item.index", raw_index.as_str());

    let index: i64 = raw_index
        .parse()
        .map_err(|_| fail(&span, "remove", ApiError::BadRequest("Invalid index parameter".into())))?;

    let items = state
        .store
        .remove_item_at(&user_id, index)
        .map_err(|e| fail(&span, "remove", e))?;

    let view = CartView::new(&user_id, items);
    span.set("cart.size", view.size);
    span.set("operation", "remove");
    metrics::record_cart_operation("remove", "ok");
    Ok(Json(view))
}

pub async fn get_cart(
    State(state): State<AppState>,
    span: CurrentSpan,
    Query(params): Query<GetParams>,
) -> Result<Json<CartView>, ApiError> {
    let Some(user_id) = required(params.user_id) else {
        return Err(fail(
            &span,
            "get",
            ApiError::BadRequest("Missing user_id parameter".into()),
        ));
    };
    span.set("user.id", user_id.as_str());

    let view = CartView::new(&user_id, state.store.get_items(&user_id));
    span.set("cart.size", view.size);
    span.set("operation", "get");
    metrics::record_cart_operation("get", "ok");
    Ok(Json(view))
}
