use crate::relay::RelayHandler;
use axum::{
    body::{ Body, Bytes },
    extract::State,
    http::{
        header::{ ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE },
        HeaderValue,
        StatusCode,
    },
    response::{ IntoResponse, Response },
    routing::post,
    Router,
};
use log::{ info, warn };
use std::sync::Arc;
use tower::{ layer::util::{ Identity, Stack }, ServiceBuilder };
use tower_http::set_header::SetResponseHeaderLayer;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str =
    "authorization, x-client-info, apikey, content-type, x-supabase-client-platform, x-supabase-client-platform-version, x-supabase-client-runtime, x-supabase-client-runtime-version";
pub const EVENT_STREAM: &str = "text/event-stream";

#[derive(Clone)]
struct AppState {
    relay: Arc<RelayHandler>,
}

/// Builds the relay router. Every response, errors and pre-flight included,
/// carries the permissive CORS headers.
pub fn router(relay: Arc<RelayHandler>) -> Router {
    let route = relay.config().route.clone();
    info!("Relay route: POST/OPTIONS {}", route);

    Router::new()
        .route(&route, post(chat_handler).options(preflight_handler))
        .layer(cors_headers())
        .with_state(AppState { relay })
}

fn cors_headers() -> ServiceBuilder<
    Stack<SetResponseHeaderLayer<HeaderValue>, Stack<SetResponseHeaderLayer<HeaderValue>, Identity>>
> {
    ServiceBuilder::new()
        .layer(
            SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static(CORS_ALLOW_ORIGIN)
            )
        )
        .layer(
            SetResponseHeaderLayer::overriding(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(CORS_ALLOW_HEADERS)
            )
        )
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match state.relay.handle(&body).await {
        Ok(stream) => (
            StatusCode::OK,
            [(CONTENT_TYPE, EVENT_STREAM)],
            Body::from_stream(stream),
        ).into_response(),
        Err(e) => {
            warn!("Chat relay failed with {}: {}", e.status_code(), e);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::relay::ErrorBody;
    use crate::relay::error::RATE_LIMITED_MESSAGE;
    use crate::relay::testing::{ relay_config, FakeUpstream, Reply };
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(reply: Reply, api_key: Option<&str>) -> (Router, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::new(reply));
        let relay = RelayHandler::new(Arc::new(relay_config(api_key)), upstream.clone());
        (router(Arc::new(relay)), upstream)
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ai-chat")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn assert_cors(response: &Response) {
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            CORS_ALLOW_HEADERS
        );
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_has_no_body_and_cors_headers() {
        let (app, upstream) = app(Reply::Stream(vec![]), Some("key"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/ai-chat")
                    .body(Body::from("{ this is not json"))
                    .unwrap()
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert!(body_string(response).await.is_empty());
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_streams_upstream_body() {
        let chunks = vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
        ];
        let (app, _) = app(Reply::Stream(chunks.clone()), Some("key"));

        let response = app
            .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], EVENT_STREAM);
        assert_cors(&response);
        assert_eq!(body_string(response).await, chunks.concat());
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_429_json() {
        let (app, _) = app(Reply::Status(429, "{\"detail\":\"quota window\"}"), Some("key"));

        let response = app
            .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_cors(&response);
        let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body.error, RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_credential_is_generic_500() {
        let (app, upstream) = app(Reply::Stream(vec![]), None);

        let response = app
            .oneshot(chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let body = body_string(response).await;
        assert!(!body.to_lowercase().contains("key"));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_messages_is_bad_request() {
        let (app, _) = app(Reply::Stream(vec![]), Some("key"));

        let response = app.oneshot(chat_request(r#"{"messages":[]}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
        let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(!body.error.is_empty());
    }
}
