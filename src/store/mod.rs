//! Persistence for accounts and tasks.
//!
//! Handlers only see `dyn Store`. `PgStore` is the production backend;
//! `MemoryStore` keeps everything in process for local runs and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{Config, StorageBackend},
    error::AppError,
    models::{NewUser, Task, UserRecord},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: i32) -> Result<Option<UserRecord>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Fails with `BadRequest` when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError>;

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AppError>;

    /// All tasks owned by `user_id`, newest first.
    async fn list_tasks(&self, user_id: i32) -> Result<Vec<Task>, AppError>;

    /// `None` when the task does not exist or belongs to another user.
    async fn get_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn insert_task(&self, task: &Task) -> Result<Task, AppError>;

    /// Persists the editable fields of `task` (title, description, category,
    /// priority, deadline). `completed` is left as stored, and `notified` is
    /// cleared only when the stored deadline differs. `None` if the task no
    /// longer exists.
    async fn update_task(&self, task: &Task) -> Result<Option<Task>, AppError>;

    /// Flips `completed` in a single write.
    async fn toggle_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Returns whether a task was removed.
    async fn delete_task(&self, user_id: i32, id: Uuid) -> Result<bool, AppError>;

    /// Sets `notified` on those of `ids` that are still unflagged, open and due
    /// within `window` of `now`, and returns exactly those tasks. Concurrent
    /// callers never claim the same task twice.
    async fn claim_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Task>, AppError>;

    /// Clears `notified` on those of `ids` whose deadline is still further than
    /// `window` from `now`.
    async fn rearm_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<(), AppError>;
}

/// Opens the backend selected in `config`.
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match (config.storage, &config.database) {
        (StorageBackend::Memory, _) => {
            log::warn!("using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StorageBackend::Postgres, Some(database)) => {
            let options = database
                .connect_options()
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            let store = PgStore::connect(options).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        (StorageBackend::Postgres, None) => Err(AppError::InternalServerError(
            "Postgres storage selected without database settings".into(),
        )),
    }
}
