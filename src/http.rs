//! HTTP routes served next to the event stream

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::error::TransportError;
use crate::transport::SseTransport;

async fn health(State(events): State<SseTransport>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "clients": events.client_count(),
        "replay_buffer": events.replay_buffer_size()
    }))
}

/// Router with `/health` and the SSE endpoint mounted
pub fn router(events: &SseTransport) -> Result<Router, TransportError> {
    let base = Router::new()
        .route("/health", get(health))
        .with_state(events.clone());
    events.attach(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_counters() {
        let events = SseTransport::new(TransportConfig::default());
        let app = router(&events).unwrap();
        events.emit_event("boot", &json!({}));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "status": "ok", "clients": 0, "replay_buffer": 1 }));
        events.close();
    }

    #[tokio::test]
    async fn test_router_can_be_built_once() {
        let events = SseTransport::new(TransportConfig::default());
        assert!(router(&events).is_ok());
        assert_eq!(router(&events).err(), Some(TransportError::AlreadyAttached));
        events.close();
    }
}
