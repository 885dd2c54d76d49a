//! Persistence layer for portal content.
//!
//! The [`PortalStore`] trait is the seam between the schedule engine and the
//! database. Production uses [`SqliteStore`]; tests substitute in-memory
//! fakes to script store failures.

mod schema;
mod sqlite;
pub mod types;

use async_trait::async_trait;

use crate::error::{PortalError, Result};

pub use schema::CURRENT_SCHEMA_VERSION;
pub use sqlite::{SqliteStore, StoreError};
pub use types::{Card, CardPatch, Category, Contact, ScheduleEntry, Task};

/// Storage operations the schedule engine and exporter rely on.
#[async_trait]
pub trait PortalStore: Send + Sync {
    /// All cards, ordered by id.
    async fn cards(&self) -> Result<Vec<Card>>;

    /// Apply a partial update to one card.
    ///
    /// Returns the updated card, or `None` when the card does not exist.
    async fn update_card(&self, id: i64, patch: CardPatch) -> Result<Option<Card>>;

    /// All tasks, ordered by id.
    async fn tasks(&self) -> Result<Vec<Task>>;

    /// All categories, ordered by id.
    async fn categories(&self) -> Result<Vec<Category>>;

    /// All contacts, ordered by id.
    async fn contacts(&self) -> Result<Vec<Contact>>;
}

impl From<StoreError> for PortalError {
    fn from(e: StoreError) -> Self {
        PortalError::Store(e.to_string())
    }
}

#[async_trait]
impl PortalStore for SqliteStore {
    async fn cards(&self) -> Result<Vec<Card>> {
        Ok(self.all_cards()?)
    }

    async fn update_card(&self, id: i64, patch: CardPatch) -> Result<Option<Card>> {
        Ok(self.apply_card_patch(id, &patch)?)
    }

    async fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.all_tasks()?)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.all_categories()?)
    }

    async fn contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.all_contacts()?)
    }
}
