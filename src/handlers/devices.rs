use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validate_create(req: &CreateDeviceRequest) -> Result<(), ApiError> {
    let mut field_errors = BTreeMap::new();
    if is_blank(&req.name) {
        field_errors.insert("name".to_string(), "Name is required".to_string());
    }
    if is_blank(&req.brand) {
        field_errors.insert("brand".to_string(), "Brand is required".to_string());
    }
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(field_errors))
    }
}

/// Supplied fields must not be blank; omitted ones are left alone
fn validate_update(req: &UpdateDeviceRequest) -> Result<(), ApiError> {
    let mut field_errors = BTreeMap::new();
    if req.name.as_deref().is_some_and(is_blank) {
        field_errors.insert("name".to_string(), "Name must not be blank".to_string());
    }
    if req.brand.as_deref().is_some_and(is_blank) {
        field_errors.insert("brand".to_string(), "Brand must not be blank".to_string());
    }
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(field_errors))
    }
}

/// List devices, optionally filtered by brand and/or state
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListDevicesQuery>, QueryRejection>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let Query(query) = query?;
    let filter = DeviceFilter::try_from(query)?;
    let devices = state.service.list(&filter).await?;
    Ok(Json(devices))
}

/// Get a single device by ID
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Device>, ApiError> {
    let Path(id) = path?;
    let device = state.service.get_by_id(id).await?;
    Ok(Json(device))
}

/// Create a new device
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let Json(req) = payload?;
    validate_create(&req)?;

    let device = state.service.create(&req.name, &req.brand).await?;
    tracing::info!(
        "Created device {:?} ({} / {})",
        device.id,
        device.name,
        device.brand
    );
    Ok(created(device))
}

/// Update an existing device (serves both PUT and PATCH)
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDeviceRequest>, JsonRejection>,
) -> Result<Json<Device>, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    validate_update(&req)?;

    let device = state.service.update(id, req).await?;
    tracing::info!(
        "Updated device {} (state={}, version={})",
        id,
        device.state,
        device.version
    );
    Ok(Json(device))
}

/// Delete a device
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.service.delete(id).await?;
    tracing::info!("Deleted device {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::db::Store;
    use crate::services::DeviceService;

    async fn test_app() -> Router {
        let store = Store::in_memory().await.unwrap();
        let state = Arc::new(AppState {
            service: DeviceService::new(Arc::new(store)),
        });
        crate::router::build(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
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

    async fn create(app: &Router, name: &str, brand: &str) -> i64 {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/devices",
            Some(json!({ "name": name, "brand": brand })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_device_lifecycle_scenario() {
        let app = test_app().await;
        let id = create(&app, "iPhone 16", "Apple").await;
        let uri = format!("/api/devices/{}", id);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "available");

        let (status, body) =
            send(&app, Method::PATCH, &uri, Some(json!({ "state": "in-use" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "in-use");

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "cannot delete a device while in use");

        // In-use devices are frozen: leaving in-use is an update too
        let (status, _) =
            send(&app, Method::PATCH, &uri, Some(json!({ "state": "available" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "in-use");
        assert_eq!(body["name"], "iPhone 16");

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // A device that never entered in-use can be changed and removed
        let other = create(&app, "Pixel 9", "Google").await;
        let other_uri = format!("/api/devices/{}", other);

        let (status, body) =
            send(&app, Method::PATCH, &other_uri, Some(json!({ "state": "inactive" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "inactive");
        assert_eq!(body["name"], "Pixel 9");

        let (status, _) = send(&app, Method::DELETE, &other_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, &other_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_ignores_smuggled_state() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/devices",
            Some(json!({ "name": "Pixel 9", "brand": "Google", "state": "in-use" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["state"], "available");
        assert_eq!(body["version"], 0);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_brand() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/devices",
            Some(json!({ "name": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"]["name"], "Name is required");
        assert_eq!(body["field_errors"]["brand"], "Brand is required");
    }

    #[tokio::test]
    async fn test_put_and_patch_are_identical() {
        let app = test_app().await;
        let a = create(&app, "Galaxy", "Samsung").await;
        let b = create(&app, "Galaxy", "Samsung").await;
        let change = json!({ "brand": "SAMSUNG" });

        let (put_status, put_body) =
            send(&app, Method::PUT, &format!("/api/devices/{}", a), Some(change.clone())).await;
        let (patch_status, patch_body) =
            send(&app, Method::PATCH, &format!("/api/devices/{}", b), Some(change)).await;

        assert_eq!(put_status, StatusCode::OK);
        assert_eq!(put_status, patch_status);
        for field in ["name", "brand", "state", "version"] {
            assert_eq!(put_body[field], patch_body[field]);
        }
        assert_eq!(put_body["name"], "Galaxy");
        assert_eq!(put_body["version"], 1);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_and_unknown_state() {
        let app = test_app().await;
        let id = create(&app, "ThinkPad", "Lenovo").await;
        let uri = format!("/api/devices/{}", id);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "brand": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            send(&app, Method::PATCH, &uri, Some(json!({ "state": "retired" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, "/api/devices/9999", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let app = test_app().await;
        let iphone = create(&app, "iPhone 16", "Apple").await;
        let macbook = create(&app, "MacBook Pro", "Apple").await;
        create(&app, "Galaxy S25", "Samsung").await;
        send(
            &app,
            Method::PATCH,
            &format!("/api/devices/{}", macbook),
            Some(json!({ "state": "in-use" })),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/devices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = send(&app, Method::GET, "/api/devices?brand=apple", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = send(&app, Method::GET, "/api/devices?state=AVAILABLE", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) =
            send(&app, Method::GET, "/api/devices?brand=Apple&state=available", None).await;
        let devices = body.as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["id"], iphone);

        let (status, body) = send(&app, Method::GET, "/api/devices?state=broken", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid device state: broken");
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let app = test_app().await;
        let id = create(&app, "Pixel 9", "Google").await;
        let uri = format!("/api/devices/{}", id);

        let (_, first) = send(&app, Method::GET, &uri, None).await;
        let (_, second) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_path_and_query_return_json_errors() {
        let app = test_app().await;

        for (method, uri) in [
            (Method::GET, "/api/devices/abc"),
            (Method::DELETE, "/api/devices/abc"),
            (Method::GET, "/api/devices?brand=a&brand=b"),
        ] {
            let (status, body) = send(&app, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].is_string(), "{}", uri);
        }

        let (status, body) =
            send(&app, Method::PATCH, "/api/devices/abc", Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_healthcheck() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
