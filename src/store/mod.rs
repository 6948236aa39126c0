use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Container, ContainerFilter};

pub mod database;
pub mod memory;

pub use database::DatabaseContainerStore;
pub use memory::MemoryContainerStore;

/// Backend holding the container records.
///
/// Implementations own durability and id uniqueness. Listing results are
/// ordered by `last_updated`, newest first.
#[async_trait]
pub trait ContainerStore: Send + Sync {
    async fn list(&self, filter: &ContainerFilter) -> AppResult<Vec<Container>>;

    async fn get(&self, id: &str) -> AppResult<Option<Container>>;

    /// Fails with `AppError::ValidationError` when the id is already taken.
    async fn insert(&self, container: Container) -> AppResult<Container>;

    /// Replaces the stored record with the same id. `None` if there is none.
    async fn update(&self, container: Container) -> AppResult<Option<Container>>;

    async fn delete(&self, id: &str) -> AppResult<Option<Container>>;

    async fn count(&self) -> AppResult<i64>;
}

pub(crate) const DUPLICATE_ID_MESSAGE: &str = "Container number already exists";
