//! HTTP endpoint receiving Slack interactive callbacks
//!
//! Slack POSTs `application/x-www-form-urlencoded` with a single `payload`
//! field. Whatever arrives, the reply is `200 application/json`: either the
//! updated message or the fixed ephemeral error.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::slack::{InteractionHandler, EPHEMERAL_ERROR_RESPONSE};

pub const ACTION_ENDPOINT: &str = "/action";

#[derive(Debug, Deserialize)]
pub struct ActionForm {
    #[serde(default)]
    pub payload: String,
}

pub fn router(handler: InteractionHandler) -> Router {
    Router::new()
        .route(ACTION_ENDPOINT, post(handle_action))
        .with_state(Arc::new(handler))
}

async fn handle_action(
    State(handler): State<Arc<InteractionHandler>>,
    form: Result<Form<ActionForm>, FormRejection>,
) -> Response {
    let body = match form {
        Ok(Form(form)) => handler.respond(&form.payload),
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed Slack callback form");
            EPHEMERAL_ERROR_RESPONSE.to_string()
        }
    };
    json_response(body)
}

fn json_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// Serve callbacks on `bind_address` until Ctrl-C
pub async fn serve(bind_address: &str) -> AppResult<()> {
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        AppError::invalid_config_value("server.bind_address", bind_address, e)
    })?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind callback server on {addr}: {e}")))?;

    serve_with_shutdown(listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}

/// Serve callbacks on an already bound listener until `shutdown` resolves
pub async fn serve_with_shutdown<F>(listener: TcpListener, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, endpoint = ACTION_ENDPOINT, "Slack callback server listening");

    axum::serve(listener, router(InteractionHandler::new()))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::internal(format!("Callback server exited unexpectedly: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn form_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(ACTION_ENDPOINT)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(request: Request<Body>) -> (StatusCode, Option<String>, String) {
        let response = router(InteractionHandler::new()).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_acknowledge_round_trip() {
        let payload = json!({
            "actions": [{"name": "acknowledge", "value": "true"}],
            "attachment_id": "1",
            "user": {"id": "U42", "name": "alice"},
            "original_message": {
                "text": "High error rate",
                "attachments": [{"text": "boom", "callback_id": "m1",
                                 "actions": [{"name": "acknowledge", "text": "Acknowledge", "value": "true"}]}]
            }
        })
        .to_string();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &payload)
            .finish();

        let (status, content_type, body) = call(form_request(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let message: Value = serde_json::from_str(&body).unwrap();
        let attachments = message["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 2);
        assert!(attachments[0].get("actions").is_none());
        assert_eq!(attachments[1]["color"], "good");
    }

    #[tokio::test]
    async fn test_garbage_payload_is_ephemeral_200() {
        let (status, _, body) = call(form_request("payload=%7Bnope".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, EPHEMERAL_ERROR_RESPONSE);
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_ephemeral_200() {
        let request = Request::builder()
            .method("POST")
            .uri(ACTION_ENDPOINT)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, content_type, body) = call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, EPHEMERAL_ERROR_RESPONSE);
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let err = serve("not an address").await.unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
