use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{
    Container, ContainerFilter, CreateContainerRequest, UpdateContainerRequest, SYSTEM_USER,
};
use crate::store::ContainerStore;

pub struct ContainerService {
    store: Arc<dyn ContainerStore>,
}

impl ContainerService {
    pub fn new(store: Arc<dyn ContainerStore>) -> Self {
        Self { store }
    }

    pub async fn list_containers(&self) -> AppResult<Vec<Container>> {
        self.store.list(&ContainerFilter::default()).await
    }

    pub async fn list_archived_containers(&self) -> AppResult<Vec<Container>> {
        self.store.list(&ContainerFilter::archived()).await
    }

    pub async fn search_containers(&self, filter: &ContainerFilter) -> AppResult<Vec<Container>> {
        self.store.list(filter).await
    }

    pub async fn get_container(&self, id: &str) -> AppResult<Container> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Container not found".to_string()))
    }

    pub async fn create_container(&self, request: CreateContainerRequest) -> AppResult<Container> {
        ensure_valid_weight(request.weight)?;

        let container = request.into_container(timestamp());
        let created = self.store.insert(container).await?;
        tracing::info!(container_id = %created.id, "Container created");
        Ok(created)
    }

    /// Merges the supplied fields onto the stored record.
    pub async fn update_container(
        &self,
        id: &str,
        request: UpdateContainerRequest,
    ) -> AppResult<Container> {
        ensure_valid_weight(request.weight)?;

        let mut container = self.get_container(id).await?;
        let previous = container.last_updated;
        request.apply_to(&mut container);

        // Keep last_updated strictly increasing even when the clock has not
        // advanced past the stored microsecond.
        container.last_updated = timestamp().max(previous + Duration::microseconds(1));
        container.updated_by = SYSTEM_USER.to_string();

        let updated = self
            .store
            .update(container)
            .await?
            .ok_or_else(|| AppError::NotFound("Container not found".to_string()))?;
        tracing::info!(container_id = %updated.id, status = %updated.status, "Container updated");
        if updated.is_archived() {
            tracing::debug!(container_id = %updated.id, "Container is archived");
        }
        Ok(updated)
    }

    pub async fn delete_container(&self, id: &str) -> AppResult<Container> {
        let deleted = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Container not found".to_string()))?;
        tracing::info!(container_id = %deleted.id, "Container deleted");
        Ok(deleted)
    }

    /// Inserts the sample container when the store holds nothing yet.
    /// Returns whether a record was added.
    pub async fn seed_if_empty(&self) -> AppResult<bool> {
        if self.store.count().await? > 0 {
            return Ok(false);
        }

        let sample = CreateContainerRequest {
            id: "CNT-001".to_string(),
            status: "In Use".to_string(),
            location: "1234 Main St, Dallas, TX".to_string(),
            contents: Some("Construction debris".to_string()),
            assigned_to: Some("Johnson Construction".to_string()),
            date_dropped: NaiveDate::from_ymd_opt(2025, 6, 25),
            date_dumped: None,
            weight: None,
        };

        match self.store.insert(sample.into_container(timestamp())).await {
            Ok(_) => Ok(true),
            // another instance seeded first
            Err(AppError::ValidationError(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Current time at the precision the database keeps.
fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn ensure_valid_weight(weight: Option<Decimal>) -> AppResult<()> {
    match weight {
        Some(weight) if weight < Decimal::ZERO => Err(AppError::ValidationError(
            "Weight must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
