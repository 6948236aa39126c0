use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    Container, ContainerFilter, CreateContainerRequest, DeleteContainerResponse,
    UpdateContainerRequest,
};

pub async fn list_containers(
    State(container_service): State<crate::AppState>,
) -> AppResult<Json<Vec<Container>>> {
    let containers = container_service.list_containers().await?;
    Ok(Json(containers))
}

pub async fn list_archived_containers(
    State(container_service): State<crate::AppState>,
) -> AppResult<Json<Vec<Container>>> {
    let containers = container_service.list_archived_containers().await?;
    Ok(Json(containers))
}

pub async fn search_containers(
    State(container_service): State<crate::AppState>,
    Query(filter): Query<ContainerFilter>,
) -> AppResult<Json<Vec<Container>>> {
    tracing::debug!("Searching containers: {:?}", filter);
    let containers = container_service.search_containers(&filter).await?;
    Ok(Json(containers))
}

pub async fn get_container(
    State(container_service): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Container>> {
    let container = container_service.get_container(&id).await?;
    Ok(Json(container))
}

pub async fn create_container(
    State(container_service): State<crate::AppState>,
    Json(req): Json<CreateContainerRequest>,
) -> AppResult<(StatusCode, Json<Container>)> {
    req.validate().map_err(|e| AppError::ValidationError(e.to_string()))?;

    let container = container_service.create_container(req).await?;
    Ok((StatusCode::CREATED, Json(container)))
}

pub async fn update_container(
    State(container_service): State<crate::AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateContainerRequest>,
) -> AppResult<Json<Container>> {
    req.validate().map_err(|e| AppError::ValidationError(e.to_string()))?;

    let container = container_service.update_container(&id, req).await?;
    Ok(Json(container))
}

pub async fn delete_container(
    State(container_service): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteContainerResponse>> {
    let container = container_service.delete_container(&id).await?;
    Ok(Json(DeleteContainerResponse {
        message: "Container deleted".to_string(),
        container,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::services::ContainerService;
    use crate::store::MemoryContainerStore;

    /// Router over a memory store holding the sample `CNT-001` record.
    async fn seeded_app() -> axum::Router {
        let service = ContainerService::new(Arc::new(MemoryContainerStore::new()));
        service.seed_if_empty().await.unwrap();
        crate::app(Arc::new(service))
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn ids(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn root_reports_running() {
        let app = seeded_app().await;
        let (status, body) = send(&app, "GET", "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "T&D Rolloff API is running!");
    }

    #[tokio::test]
    async fn sample_scenario() {
        let app = seeded_app().await;

        let (status, body) = send(&app, "GET", "/api/containers/search?q=debris", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["CNT-001"]);

        let (status, body) = send(&app, "GET", "/api/containers/search?status=Dumped", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (status, body) = send(
            &app,
            "PUT",
            "/api/containers/CNT-001",
            Some(json!({ "status": "Dumped" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Dumped");
        assert_eq!(body["contents"], "Construction debris");
        assert_eq!(body["updatedBy"], "System");

        let (status, body) = send(&app, "GET", "/api/containers/archived", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["CNT-001"]);
    }

    #[tokio::test]
    async fn create_get_and_duplicate() {
        let app = seeded_app().await;
        let input = json!({
            "id": "CNT-002",
            "status": "In Use",
            "location": "77 Oak Ave, Plano, TX",
            "assignedTo": "Johnson Construction",
            "dateDropped": "2025-07-01",
            "weight": 4.5,
            "updatedBy": "mallory",
            "lastUpdated": "2000-01-01T00:00:00Z"
        });

        let (status, created) = send(&app, "POST", "/api/containers", Some(input)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["updatedBy"], "System");
        assert_ne!(created["lastUpdated"], "2000-01-01T00:00:00Z");
        assert_eq!(created["dateDropped"], "2025-07-01");

        let (status, fetched) = send(&app, "GET", "/api/containers/CNT-002", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, body) = send(
            &app,
            "POST",
            "/api/containers",
            Some(json!({ "id": "CNT-002", "status": "Dumped", "location": "Elsewhere" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Container number already exists");

        let (_, unchanged) = send(&app, "GET", "/api/containers/CNT-002", None).await;
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn create_rejects_blank_id() {
        let app = seeded_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/containers",
            Some(json!({ "id": "", "status": "In Use", "location": "Elm St" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn query_does_not_search_assigned_to() {
        let app = seeded_app().await;

        // CNT-001 is assigned to Johnson Construction but nothing else mentions Johnson
        let (status, body) = send(&app, "GET", "/api/containers/search?q=Johnson", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (_, body) = send(
            &app,
            "GET",
            "/api/containers/search?status=All&location=dallas",
            None,
        )
        .await;
        assert_eq!(ids(&body), vec!["CNT-001"]);
    }

    #[tokio::test]
    async fn update_ignores_client_id_and_system_fields() {
        let app = seeded_app().await;
        let (_, before) = send(&app, "GET", "/api/containers/CNT-001", None).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/containers/CNT-001",
            Some(json!({
                "id": "OTHER",
                "updatedBy": "mallory",
                "lastUpdated": "2000-01-01T00:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "CNT-001");
        assert_eq!(body["updatedBy"], "System");

        let before_ts: DateTime<Utc> = before["lastUpdated"].as_str().unwrap().parse().unwrap();
        let after_ts: DateTime<Utc> = body["lastUpdated"].as_str().unwrap().parse().unwrap();
        assert!(after_ts > before_ts);

        let (status, _) = send(&app, "GET", "/api/containers/OTHER", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, "GET", "/api/containers", None).await;
        assert_eq!(ids(&all), vec!["CNT-001"]);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let app = seeded_app().await;

        let (status, body) = send(&app, "GET", "/api/containers/CNT-404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Container not found");

        let (status, _) = send(
            &app,
            "PUT",
            "/api/containers/CNT-404",
            Some(json!({ "status": "Dumped" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/api/containers/CNT-404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, "GET", "/api/containers", None).await;
        assert_eq!(ids(&all), vec!["CNT-001"]);
    }

    #[tokio::test]
    async fn delete_returns_snapshot_then_get_is_not_found() {
        let app = seeded_app().await;

        let (status, body) = send(&app, "DELETE", "/api/containers/CNT-001", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Container deleted");
        assert_eq!(body["container"]["id"], "CNT-001");

        let (status, _) = send(&app, "GET", "/api/containers/CNT-001", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, "GET", "/api/containers", None).await;
        assert!(all.as_array().unwrap().is_empty());
    }
}
