//! HTTP interface
//!
//! Thin transport over [`SessionRegistry`]: handlers validate the request
//! body, delegate one turn to the registry and map the outcome to JSON.

pub mod dto;
pub mod handlers;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::{DealbotError, Result};
use crate::negotiation::SessionRegistry;

pub use handlers::{AppState, DEFAULT_SESSION};

/// Browser access for the chat front-end; a `"*"` entry allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| DealbotError::InvalidConfig(format!("invalid CORS origin {:?}", origin)))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn router(registry: Arc<SessionRegistry>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/negotiate/start", post(handlers::start))
        .route("/negotiate/advance", post(handlers::advance))
        .route("/negotiate/reset", post(handlers::reset))
        .route("/negotiate/{session_id}", get(handlers::snapshot))
        .route("/initialize", post(handlers::initialize))
        .route("/chatbot", post(handlers::chatbot))
        .with_state(AppState { registry })
        .layer(cors)
}

/// Bind `bind_address` and serve until `shutdown` resolves
pub async fn serve<F>(
    bind_address: &str,
    registry: Arc<SessionRegistry>,
    cors: CorsLayer,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| DealbotError::Http(format!("cannot bind {}: {}", bind_address, e)))?;
    let local = listener.local_addr()?;

    tracing::info!(bind_address = %local, "negotiation server listening");

    axum::serve(listener, router(registry, cors))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("negotiation server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{IntentClassifier, TextGenerator};
    use crate::negotiation::{
        DiscountBand, NegotiationPolicy, Product, SessionContext, Turn,
    };
    use crate::types::Currency;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct Counter;

    #[async_trait]
    impl TextGenerator for Counter {
        async fn generate(&self, transcript: &[Turn]) -> crate::error::Result<String> {
            if transcript.len() <= 2 {
                Ok("Hello! I can offer these wheels for £1440.".to_string())
            } else {
                Ok("Meet me at £1390?".to_string())
            }
        }
    }

    struct Labelled(&'static str);

    #[async_trait]
    impl IntentClassifier for Labelled {
        async fn classify(&self, _message: &str, _context: Option<&str>) -> crate::error::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl TextGenerator for Broken {
        async fn generate(&self, _transcript: &[Turn]) -> crate::error::Result<String> {
            Err(DealbotError::Generation("upstream 503".to_string()))
        }
    }

    fn registry_with(generator: Arc<dyn TextGenerator>) -> Arc<SessionRegistry> {
        let product = Product {
            name: "MAK wheel set".to_string(),
            description: "A set of 4 wheels.".to_string(),
            list_price: Decimal::from(1500),
            min_price: Decimal::from(1200),
            currency: Currency::GBP,
        };
        let policy = NegotiationPolicy {
            max_attempts: 5,
            acceptance_tolerance: Decimal::new(2, 2),
            opening_band: DiscountBand {
                min_percent: Decimal::from(4),
                max_percent: Decimal::from(4),
            },
            accept_token: "Deal!".to_string(),
            reject_token: "No Deal!".to_string(),
            discount_code_length: 8,
            collaborator_timeout: Duration::from_secs(5),
        };
        let ctx = SessionContext::new(product, policy, generator, Arc::new(Labelled("negotiation")));
        Arc::new(SessionRegistry::new(ctx))
    }

    fn app() -> Router {
        router(registry_with(Arc::new(Counter)), cors_layer(&["*".to_string()]).unwrap())
    }

    async fn preflight(app: &Router, origin: &str) -> axum::http::Response<Body> {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/negotiate/start")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ready", "sessions": 0}));
    }

    #[tokio::test]
    async fn test_start_and_advance() {
        let app = app();

        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/start",
            Some(json!({"session_id": "s1", "message": "Hi, tell me about the wheels"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["status"], "open");
        assert_eq!(body["show_buttons"], false);
        assert_eq!(body["last_negotiated_price"], 1440.0);
        assert!(body.get("discount_code").is_none());

        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/advance",
            Some(json!({"session_id": "s1", "message": "Could you do £1300?", "request_id": "r1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Meet me at £1390?");
        assert_eq!(body["last_negotiated_price"], 1390.0);

        let (status, body) = call(&app, "GET", "/negotiate/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["attempts"], 1);
        assert_eq!(body["transcript"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_deal_returns_code() {
        let app = app();
        call(&app, "POST", "/negotiate/start", Some(json!({"session_id": "s1", "message": "Hi"}))).await;

        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/advance",
            Some(json!({"session_id": "s1", "message": "Deal!"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "closed_accepted");
        assert_eq!(body["show_buttons"], true);
        assert_eq!(body["last_negotiated_price"], 1440.0);
        assert_eq!(body["discount_code"].as_str().unwrap().len(), 8);

        let (status, _) = call(&app, "GET", "/negotiate/s1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_generates_session_id() {
        let app = app();
        let (status, body) =
            call(&app, "POST", "/negotiate/start", Some(json!({"message": "Hi"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["session_id"].as_str().unwrap().starts_with("session_"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/advance",
            Some(json!({"session_id": "nobody", "message": "£1300?"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nobody"));

        let (status, _) = call(
            &app,
            "POST",
            "/negotiate/reset",
            Some(json!({"session_id": "nobody"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_message_is_400() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/start",
            Some(json!({"session_id": "s1", "message": "   "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "message must not be empty");
    }

    #[tokio::test]
    async fn test_reset() {
        let app = app();
        call(&app, "POST", "/negotiate/start", Some(json!({"session_id": "s1", "message": "Hi"}))).await;

        let (status, body) =
            call(&app, "POST", "/negotiate/reset", Some(json!({"session_id": "s1"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "open");

        let (_, snapshot) = call(&app, "GET", "/negotiate/s1", None).await;
        assert_eq!(snapshot["attempts"], 0);
        assert!(snapshot["transcript"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_apologizes() {
        let app = router(registry_with(Arc::new(Broken)), cors_layer(&[]).unwrap());
        let (status, body) = call(
            &app,
            "POST",
            "/negotiate/start",
            Some(json!({"session_id": "s1", "message": "Hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Sorry, something went wrong!");
        assert_eq!(body["status"], "open");
    }

    #[tokio::test]
    async fn test_legacy_routes_share_default_session() {
        let app = app();

        let (status, body) =
            call(&app, "POST", "/initialize", Some(json!({"message": "Hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], DEFAULT_SESSION);

        let (_, body) = call(&app, "POST", "/chatbot", Some(json!({"message": "No Deal!"}))).await;
        assert_eq!(body["status"], "closed_rejected");
        assert_eq!(body["show_buttons"], true);
        assert!(body["last_negotiated_price"].is_null());
        assert!(body.as_object().unwrap().contains_key("last_negotiated_price"));

        // Declined session was dropped, so the next message opens a new one
        let (status, body) =
            call(&app, "POST", "/chatbot", Some(json!({"message": "Actually, hello again"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "open");
    }

    #[tokio::test]
    async fn test_preflight_from_any_origin() {
        let app = app();
        let response = preflight(&app, "http://localhost:3000").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let methods = response.headers()["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));

        // Simple requests carry the header too
        let request = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_preflight_respects_origin_list() {
        let cors = cors_layer(&["http://shop.example".to_string()]).unwrap();
        let app = router(registry_with(Arc::new(Counter)), cors);

        let response = preflight(&app, "http://shop.example").await;
        assert_eq!(response.headers()["access-control-allow-origin"], "http://shop.example");

        let response = preflight(&app, "http://elsewhere.example").await;
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_cors_layer_rejects_bad_origin() {
        let err = cors_layer(&["http://shop\n.example".to_string()]).unwrap_err();
        assert!(matches!(err, DealbotError::InvalidConfig(_)));
    }
}
