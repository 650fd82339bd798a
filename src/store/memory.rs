use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::{
    error::AppError,
    models::{NewUser, Task, UserRecord},
    planner,
};

#[derive(Default)]
struct State {
    users: Vec<UserRecord>,
    tasks: HashMap<Uuid, Task>,
    next_user_id: i32,
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: i32) -> Result<Option<UserRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        state.next_user_id += 1;
        let record = UserRecord {
            id: state.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.push(record.clone());
        Ok(record)
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(AppError::NotFound("User not found".into())),
        }
    }

    async fn list_tasks(&self, user_id: i32) -> Result<Vec<Task>, AppError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn get_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, AppError> {
        let mut state = self.state.write().await;
        state.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn update_task(&self, task: &Task) -> Result<Option<Task>, AppError> {
        let mut state = self.state.write().await;
        match state.tasks.get_mut(&task.id) {
            Some(existing) if existing.user_id == task.user_id => {
                if existing.deadline != task.deadline {
                    existing.notified = false;
                }
                existing.title = task.title.clone();
                existing.description = task.description.clone();
                existing.category = task.category;
                existing.priority = task.priority;
                existing.deadline = task.deadline;
                existing.updated_at = task.updated_at;
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn toggle_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError> {
        let mut state = self.state.write().await;
        Ok(state
            .tasks
            .get_mut(&id)
            .filter(|t| t.user_id == user_id)
            .map(|task| {
                task.toggle_completed();
                task.clone()
            }))
    }

    async fn delete_task(&self, user_id: i32, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let owned = state.tasks.get(&id).map_or(false, |t| t.user_id == user_id);
        if owned {
            state.tasks.remove(&id);
        }
        Ok(owned)
    }

    async fn claim_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Task>, AppError> {
        let mut state = self.state.write().await;
        let mut claimed = Vec::new();
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id).filter(|t| t.user_id == user_id) {
                if planner::due_for_reminder(task, now, window) {
                    task.notified = true;
                    claimed.push(task.clone());
                }
            }
        }
        Ok(claimed)
    }

    async fn rearm_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id).filter(|t| t.user_id == user_id) {
                if planner::should_rearm(task, now, window) {
                    task.notified = false;
                }
            }
        }
        Ok(())
    }
}
