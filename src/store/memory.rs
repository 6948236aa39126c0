use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ContainerStore, DUPLICATE_ID_MESSAGE};
use crate::error::{AppError, AppResult};
use crate::models::{Container, ContainerFilter};

/// Keeps containers in a process-local list. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryContainerStore {
    containers: RwLock<Vec<Container>>,
}

impl MemoryContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(containers: Vec<Container>) -> Self {
        Self {
            containers: RwLock::new(containers),
        }
    }
}

#[async_trait]
impl ContainerStore for MemoryContainerStore {
    async fn list(&self, filter: &ContainerFilter) -> AppResult<Vec<Container>> {
        let containers = self.containers.read().await;
        let mut matching: Vec<Container> = containers
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        // stable, so ties keep insertion order
        matching.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(matching)
    }

    async fn get(&self, id: &str) -> AppResult<Option<Container>> {
        let containers = self.containers.read().await;
        Ok(containers.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, container: Container) -> AppResult<Container> {
        let mut containers = self.containers.write().await;
        if containers.iter().any(|c| c.id == container.id) {
            return Err(AppError::ValidationError(DUPLICATE_ID_MESSAGE.to_string()));
        }
        containers.push(container.clone());
        Ok(container)
    }

    async fn update(&self, container: Container) -> AppResult<Option<Container>> {
        let mut containers = self.containers.write().await;
        match containers.iter_mut().find(|c| c.id == container.id) {
            Some(slot) => {
                *slot = container.clone();
                Ok(Some(container))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<Option<Container>> {
        let mut containers = self.containers.write().await;
        Ok(containers
            .iter()
            .position(|c| c.id == id)
            .map(|index| containers.remove(index)))
    }

    async fn count(&self) -> AppResult<i64> {
        let containers = self.containers.read().await;
        Ok(containers.len() as i64)
    }
}
