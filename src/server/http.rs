//! HTTP routes
//!
//! Parses requests into calls on the [`Hub`]. Nothing here touches the
//! registry state directly.

use std::num::ParseIntError;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::sse::Subscription;
use crate::registry::{Hub, UserId};
use crate::stats::{HubMetrics, HubStats};

/// Build the router for all hub endpoints
pub fn router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route("/sse", get(subscribe))
        .route("/publishByTopic", post(publish_by_topic))
        .route("/publishByUserId", post(publish_by_user))
        .route("/publishByClientType", post(publish_by_category))
        .route("/publishToClient", post(publish_to_client))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(hub)
}

/// Rejection for a malformed request
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("missing query parameter: {0}")]
    Missing(&'static str),

    #[error("invalid userId: {0}")]
    InvalidUserId(#[from] ParseIntError),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Query string of `GET /sse`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParams {
    pub user_id: Option<String>,
    pub client_type: Option<String>,
    pub topics: Option<String>,
}

impl SubscribeParams {
    fn user_id(&self) -> Result<UserId, RequestError> {
        let raw = self.user_id.as_deref().ok_or(RequestError::Missing("userId"))?;
        Ok(raw.trim().parse()?)
    }

    fn client_type(&self) -> Result<&str, RequestError> {
        self.client_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(RequestError::Missing("clientType"))
    }

    /// Comma-separated, trimmed, empty entries skipped
    fn topics(&self) -> Result<Vec<String>, RequestError> {
        let topics: Vec<String> = self
            .topics
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if topics.is_empty() {
            return Err(RequestError::Missing("topics"));
        }
        Ok(topics)
    }
}

async fn subscribe(
    State(hub): State<Arc<Hub>>,
    Query(params): Query<SubscribeParams>,
) -> Result<impl IntoResponse, RequestError> {
    let user_id = params.user_id()?;
    let client_type = params.client_type()?;
    let topics = params.topics()?;

    let handle = hub.register(user_id, client_type, topics);
    let stream = Subscription::new(Arc::clone(&hub), handle).into_stream();

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Sse::new(stream),
    ))
}

#[derive(Debug, Deserialize)]
pub struct PublishByTopicBody {
    pub topic: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishByUserBody {
    pub user_id: UserId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishByClientTypeBody {
    pub client_type: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishToClientBody {
    pub client_type: String,
    pub user_id: UserId,
    pub message: String,
}

async fn publish_by_topic(
    State(hub): State<Arc<Hub>>,
    Json(body): Json<PublishByTopicBody>,
) -> StatusCode {
    hub.publish_by_topic(&body.topic, body.message);
    StatusCode::ACCEPTED
}

async fn publish_by_user(
    State(hub): State<Arc<Hub>>,
    Json(body): Json<PublishByUserBody>,
) -> StatusCode {
    hub.publish_by_user(body.user_id, body.message);
    StatusCode::ACCEPTED
}

async fn publish_by_category(
    State(hub): State<Arc<Hub>>,
    Json(body): Json<PublishByClientTypeBody>,
) -> StatusCode {
    hub.publish_by_category(&body.client_type, body.message);
    StatusCode::ACCEPTED
}

async fn publish_to_client(
    State(hub): State<Arc<Hub>>,
    Json(body): Json<PublishToClientBody>,
) -> StatusCode {
    hub.publish_to_client(&body.client_type, body.user_id, body.message);
    StatusCode::ACCEPTED
}

async fn status(State(hub): State<Arc<Hub>>) -> Json<Vec<HubStats>> {
    Json(hub.stats())
}

async fn metrics(State(hub): State<Arc<Hub>>) -> Json<HubMetrics> {
    Json(hub.metrics())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bytes::Bytes;
    use futures::StreamExt;
    use tower::ServiceExt;

    use super::*;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_publish_routes() {
        let hub = Arc::new(Hub::new());
        let mut web = hub.register(10, "web", ["x"]);
        let mut mobile = hub.register(10, "mobile", ["y"]);
        let app = router(Arc::clone(&hub));

        let response = app
            .clone()
            .oneshot(post_json(
                "/publishByTopic",
                serde_json::json!({ "topic": "x", "message": "t" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(web.try_recv(), Some(Bytes::from_static(b"t")));
        assert_eq!(mobile.try_recv(), None);

        app.clone()
            .oneshot(post_json(
                "/publishByUserId",
                serde_json::json!({ "userId": 10, "message": "u" }),
            ))
            .await
            .unwrap();
        assert_eq!(web.try_recv(), Some(Bytes::from_static(b"u")));
        assert_eq!(mobile.try_recv(), Some(Bytes::from_static(b"u")));

        app.clone()
            .oneshot(post_json(
                "/publishByClientType",
                serde_json::json!({ "clientType": "mobile", "message": "c" }),
            ))
            .await
            .unwrap();
        assert_eq!(web.try_recv(), None);
        assert_eq!(mobile.try_recv(), Some(Bytes::from_static(b"c")));

        app.oneshot(post_json(
            "/publishToClient",
            serde_json::json!({ "clientType": "web", "userId": 10, "message": "p" }),
        ))
        .await
        .unwrap();
        assert_eq!(web.try_recv(), Some(Bytes::from_static(b"p")));
        assert_eq!(mobile.try_recv(), None);
    }

    #[tokio::test]
    async fn test_publish_rejects_malformed_body() {
        let hub = Arc::new(Hub::new());
        let mut web = hub.register(10, "web", ["x"]);

        let response = router(Arc::clone(&hub))
            .oneshot(post_json(
                "/publishByUserId",
                serde_json::json!({ "userId": "ten", "message": "u" }),
            ))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(web.try_recv(), None);
    }

    #[tokio::test]
    async fn test_status() {
        let hub = Arc::new(Hub::new());
        let handle = hub.register(42, "web", ["x"]);

        let response = router(Arc::clone(&hub))
            .oneshot(get("/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "ClientID": handle.id().as_u64(), "UserID": 42, "Type": "web" }
            ])
        );
    }

    #[tokio::test]
    async fn test_metrics() {
        let hub = Arc::new(Hub::new());
        let _handle = hub.register(1, "web", ["x"]);
        hub.publish_by_topic("x", "m");

        let response = router(Arc::clone(&hub))
            .oneshot(get("/metrics"))
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["live_connections"], 1);
        assert_eq!(json["delivered"], 1);
    }

    #[tokio::test]
    async fn test_sse_requires_client_type() {
        let hub = Arc::new(Hub::new());

        let response = router(Arc::clone(&hub))
            .oneshot(get("/sse?userId=1&topics=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_rejects_bad_user_id() {
        let hub = Arc::new(Hub::new());

        let response = router(Arc::clone(&hub))
            .oneshot(get("/sse?userId=abc&clientType=web&topics=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_requires_topics() {
        let hub = Arc::new(Hub::new());

        let response = router(Arc::clone(&hub))
            .oneshot(get("/sse?userId=1&clientType=web&topics=%20,%20"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sse_stream_lifecycle() {
        let hub = Arc::new(Hub::new());

        let response = router(Arc::clone(&hub))
            .oneshot(get("/sse?userId=7&clientType=web&topics=news,%20sports"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(hub.connection_count(), 1);

        let stats = hub.stats();
        assert_eq!(stats[0].user_id, 7);
        assert_eq!(stats[0].category, "web");

        hub.publish_by_topic("sports", "goal");
        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        assert_eq!(frame, Bytes::from_static(b"data: goal\n\n"));

        drop(body);
        assert_eq!(hub.connection_count(), 0);
    }
}
