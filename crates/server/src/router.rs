//! JSON-RPC request handling for the `POST /{chainId}` surface.
//!
//! The handler accepts a single JSON-RPC 2.0 object or a batch array,
//! validates each envelope, fans batches out concurrently and wraps core
//! results and errors back into JSON-RPC envelopes. Wire error codes:
//! `-32700` unparseable body, `-32600` invalid envelope or empty batch,
//! `-32000` internal error carrying the gateway's message.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use beacon_core::{
    types::{ChainId, JsonRpcResponse, JSONRPC_VERSION},
    RpcGateway,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RpcGateway>,
    pub max_batch_size: usize,
}

/// A validated call extracted from one envelope.
struct ValidCall {
    method: String,
    params: Value,
    id: Arc<Value>,
}

/// Checks one JSON-RPC 2.0 envelope.
///
/// Requires `jsonrpc == "2.0"`, a string `method`, `params` absent or an
/// array, and `id` absent, null, a string or a number.
fn validate_envelope(item: &Value) -> Result<ValidCall, String> {
    let Some(object) = item.as_object() else {
        return Err("request must be a JSON object".to_string());
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err("jsonrpc must be \"2.0\"".to_string());
    }

    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Err("method must be a string".to_string());
    };

    let params = match object.get("params") {
        None => Value::Array(Vec::new()),
        Some(params @ Value::Array(_)) => params.clone(),
        Some(_) => return Err("params must be an array".to_string()),
    };

    let id = match object.get("id") {
        None | Some(Value::Null) => Value::Null,
        Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
        Some(_) => return Err("id must be a string, a number or null".to_string()),
    };

    Ok(ValidCall { method: method.to_string(), params, id: Arc::new(id) })
}

/// Best-effort id extraction for error envelopes on invalid items.
fn extract_id(item: &Value) -> Arc<Value> {
    Arc::new(item.get("id").cloned().unwrap_or(Value::Null))
}

/// Runs one batch item through validation and the gateway.
async fn process_item(state: &AppState, chain_id: ChainId, item: Value) -> JsonRpcResponse {
    let call = match validate_envelope(&item) {
        Ok(call) => call,
        Err(reason) => {
            return JsonRpcResponse::error(
                extract_id(&item),
                -32600,
                format!("Invalid Request: {reason}"),
            );
        }
    };

    match state.gateway.send(chain_id, &call.method, &call.params).await {
        Ok(result) => JsonRpcResponse::result(call.id, result),
        Err(error) => {
            JsonRpcResponse::error(call.id, -32000, format!("Internal Server Error: {error}"))
        }
    }
}

/// Handles `POST /{chainId}` with a single or batched JSON-RPC body.
pub async fn handle_rpc(
    State(state): State<AppState>,
    Path(chain_id): Path<ChainId>,
    body: String,
) -> impl IntoResponse {
    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(chain_id, error = %e, "rejecting unparseable body");
            let response = JsonRpcResponse::error(
                Arc::new(Value::Null),
                -32700,
                format!("Parse error: {e}"),
            );
            return (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()));
        }
    };

    if let Value::Array(items) = payload {
        handle_batch(&state, chain_id, items).await
    } else {
        handle_single(&state, chain_id, payload).await
    }
}

async fn handle_single(
    state: &AppState,
    chain_id: ChainId,
    payload: Value,
) -> (StatusCode, Json<Value>) {
    let response = process_item(state, chain_id, payload).await;

    // Core failures surface as HTTP 500; envelope-level rejections stay 200.
    let status = match &response.error {
        Some(error) if error.code == -32000 => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(serde_json::to_value(response).unwrap_or_default()))
}

async fn handle_batch(
    state: &AppState,
    chain_id: ChainId,
    items: Vec<Value>,
) -> (StatusCode, Json<Value>) {
    if items.is_empty() {
        let response = JsonRpcResponse::error(
            Arc::new(Value::Null),
            -32600,
            "Invalid Request: empty batch",
        );
        return (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()));
    }

    if items.len() > state.max_batch_size {
        let response = JsonRpcResponse::error(
            Arc::new(Value::Null),
            -32600,
            format!("Invalid Request: batch exceeds {} items", state.max_batch_size),
        );
        return (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()));
    }

    let batch_size = items.len();
    info!(chain_id, batch_size, "processing batched request");

    // Concurrent fan-out; join_all preserves input order for the reply.
    let responses = futures::future::join_all(
        items.into_iter().map(|item| process_item(state, chain_id, item)),
    )
    .await;

    (StatusCode::OK, Json(serde_json::to_value(responses).unwrap_or_default()))
}

/// Liveness endpoint with a summary of the gateway's shape.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "chains": state.gateway.chain_ids().len(),
        "cache": if state.gateway.cache_disabled() { "disabled" } else { "enabled" },
    });
    (StatusCode::OK, Json(body))
}
