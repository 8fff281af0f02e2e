//! Development REST backend for the rentsync clients.
//!
//! Serves every entity type under its plural resource name:
//!
//! - `GET    /health`
//! - `GET    /{resource}`       list all records
//! - `POST   /{resource}`       create, responds 201 with the stored record, or
//!   200 with the earlier record when the `Idempotency-Key` was seen before
//! - `GET    /{resource}/{id}`  fetch one record
//! - `PUT    /{resource}/{id}`  replace a record
//! - `DELETE /{resource}/{id}`  delete, responds 204
//!
//! Records are JSON objects with a numeric `id` assigned by the server.

mod store;

pub use store::ResourceStore;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rentsync_core::remote::IDEMPOTENCY_KEY_HEADER;
use rentsync_core::EntityType;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned to clients as `{"error": ..., "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("{resource}/{id} not found")]
    NotFound { resource: EntityType, id: String },

    #[error("request body must be a JSON object")]
    NotAnObject,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::UnknownResource(_) => (StatusCode::NOT_FOUND, "unknown_resource"),
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::NotAnObject => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_body"),
        };
        (
            status,
            Json(ErrorBody {
                error,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn resource(name: &str) -> Result<EntityType, ApiError> {
    EntityType::ALL
        .into_iter()
        .find(|t| t.as_str() == name)
        .ok_or_else(|| ApiError::UnknownResource(name.to_string()))
}

fn record_id(resource: EntityType, id: &str) -> Result<u64, ApiError> {
    id.parse().map_err(|_| ApiError::NotFound {
        resource,
        id: id.to_string(),
    })
}

fn object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::NotAnObject),
    }
}

/// Builds the application router over a shared store.
pub fn router(store: Arc<ResourceStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{resource}", get(list).post(create))
        .route("/{resource}/{id}", get(fetch).put(update).delete(remove))
        .with_state(store)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list(
    State(store): State<Arc<ResourceStore>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let resource = resource(&name)?;
    Ok(Json(store.list(resource).await))
}

async fn create(
    State(store): State<Arc<ResourceStore>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let resource = resource(&name)?;
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    let (record, new) = store.create(resource, object(body)?, key).await;
    if new {
        tracing::debug!("Created {}/{}", resource, record["id"]);
        Ok((StatusCode::CREATED, Json(record)))
    } else {
        tracing::debug!("Replayed create of {}/{}", resource, record["id"]);
        Ok((StatusCode::OK, Json(record)))
    }
}

async fn fetch(
    State(store): State<Arc<ResourceStore>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(&name)?;
    let numeric = record_id(resource, &id)?;
    store
        .get(resource, numeric)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound { resource, id })
}

async fn update(
    State(store): State<Arc<ResourceStore>>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let resource = resource(&name)?;
    let numeric = record_id(resource, &id)?;
    store
        .update(resource, numeric, object(body)?)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound { resource, id })
}

async fn remove(
    State(store): State<Arc<ResourceStore>>,
    Path((name, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let resource = resource(&name)?;
    let numeric = record_id(resource, &id)?;
    if store.delete(resource, numeric).await {
        tracing::debug!("Deleted {}/{}", resource, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound { resource, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_with(app, Request::builder().method(method).uri(uri), body).await
    }

    async fn send_with(
        app: &Router,
        builder: axum::http::request::Builder,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn app() -> Router {
        router(Arc::new(ResourceStore::new()))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let app = app();
        let (status, created) = send(
            &app,
            Method::POST,
            "/vehicles",
            Some(json!({"make": "Kia", "model": "Rio"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);

        let (status, listed) = send(&app, Method::GET, "/vehicles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([{"id": 1, "make": "Kia", "model": "Rio"}]));
    }

    #[tokio::test]
    async fn test_create_with_repeated_key_replays() {
        let app = app();
        let post = || {
            Request::builder()
                .method(Method::POST)
                .uri("/vehicles")
                .header(IDEMPOTENCY_KEY_HEADER, "6f1c2a4e")
        };

        let (status, first) = send_with(&app, post(), Some(json!({"make": "Kia"}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, again) = send_with(&app, post(), Some(json!({"make": "Kia"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, first);

        let (_, listed) = send(&app, Method::GET, "/vehicles", None).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_update_and_fetch() {
        let app = app();
        send(&app, Method::POST, "/users", Some(json!({"name": "Ana"}))).await;

        let (status, updated) =
            send(&app, Method::PUT, "/users/1", Some(json!({"name": "Ana B"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Ana B");

        let (status, fetched) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, json!({"id": 1, "name": "Ana B"}));
    }

    #[tokio::test]
    async fn test_missing_records_are_404() {
        let app = app();
        let (status, body) =
            send(&app, Method::PUT, "/messages/7", Some(json!({"body": "hi"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(&app, Method::DELETE, "/messages/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete() {
        let app = app();
        send(&app, Method::POST, "/locations", Some(json!({"name": "Depot"}))).await;

        let (status, _) = send(&app, Method::DELETE, "/locations/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, "/locations/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_resource_and_bad_body() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/cars", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_resource");

        let (status, body) =
            send(&app, Method::POST, "/vehicles", Some(json!(["not", "an", "object"]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_body");
    }
}
