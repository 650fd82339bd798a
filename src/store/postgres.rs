use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time;
use uuid::Uuid;

use super::Store;
use crate::{
    error::AppError,
    models::{NewUser, Task, UserRecord},
};

const TASK_COLUMNS: &str = "id, title, description, category, priority, deadline, completed, \
                            notified, user_id, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

/// Postgres-backed store. Queries are checked at runtime so the crate builds
/// without a live database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(options: PgConnectOptions) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(time::Duration::from_secs(5))
            .connect_with(options)
            .await?;
        log::info!("connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: i32) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::BadRequest(_) => AppError::BadRequest("Email already registered".into()),
            other => other,
        })
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn list_tasks(&self, user_id: i32) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
            TASK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    async fn get_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, category, priority, deadline, completed, \
             notified, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category)
        .bind(task.priority)
        .bind(task.deadline)
        .bind(task.completed)
        .bind(task.notified)
        .bind(task.user_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update_task(&self, task: &Task) -> Result<Option<Task>, AppError> {
        // Right-hand sides see the stored row, so the CASE compares against the old deadline.
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks \
             SET title = $1, description = $2, category = $3, priority = $4, \
                 notified = CASE WHEN deadline IS DISTINCT FROM $5 THEN FALSE ELSE notified END, \
                 deadline = $5, updated_at = $6 \
             WHERE id = $7 AND user_id = $8 \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category)
        .bind(task.priority)
        .bind(task.deadline)
        .bind(task.updated_at)
        .bind(task.id)
        .bind(task.user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn toggle_task(&self, user_id: i32, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET completed = NOT completed, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_task(&self, user_id: i32, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn claim_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Task>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let claimed = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET notified = TRUE \
             WHERE user_id = $1 AND id = ANY($2) AND notified = FALSE AND completed = FALSE \
               AND deadline > $3 AND deadline <= $4 \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(ids.to_vec())
        .bind(now)
        .bind(now + window)
        .fetch_all(&self.pool)
        .await?;
        Ok(claimed)
    }

    async fn rearm_reminders(
        &self,
        user_id: i32,
        ids: &[Uuid],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE tasks SET notified = FALSE \
             WHERE user_id = $1 AND id = ANY($2) AND notified = TRUE AND completed = FALSE \
               AND deadline > $3",
        )
        .bind(user_id)
        .bind(ids.to_vec())
        .bind(now + window)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskCategory, TaskPriority};
    use std::env;

    // Needs a disposable database: DATABASE_URL=... cargo test -- --ignored
    #[ignore]
    #[actix_rt::test]
    async fn test_task_round_trip_against_postgres() {
        dotenv::dotenv().ok();
        let pool = PgPool::connect(&env::var("DATABASE_URL").expect("DATABASE_URL not set"))
            .await
            .unwrap();
        let store = PgStore::from_pool(pool);
        store.migrate().await.unwrap();

        let email = format!("pg-{}@example.com", Uuid::new_v4());
        let user = store
            .insert_user(NewUser {
                username: "pg_user".into(),
                email: email.clone(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let duplicate = store
            .insert_user(NewUser {
                username: "pg_user".into(),
                email,
                password_hash: "hash".into(),
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

        let now = Utc::now();
        let mut task = Task {
            id: Uuid::new_v4(),
            title: "Pay electricity bill".into(),
            description: Some("before the 10th".into()),
            category: TaskCategory::Finance,
            priority: TaskPriority::High,
            deadline: Some(now + Duration::minutes(30)),
            completed: false,
            notified: false,
            user_id: user.id,
            created_at: now,
            updated_at: now,
        };
        store.insert_task(&task).await.unwrap();

        let toggled = store.toggle_task(user.id, task.id).await.unwrap().unwrap();
        assert!(toggled.completed);

        task.title = "Pay electricity and water".into();
        let updated = store.update_task(&task).await.unwrap().unwrap();
        assert!(updated.completed);
        assert_eq!(updated.category, TaskCategory::Finance);
        assert_eq!(updated.title, "Pay electricity and water");

        store.toggle_task(user.id, task.id).await.unwrap();
        let window = Duration::minutes(60);
        let claimed = store
            .claim_reminders(user.id, &[task.id], now, window)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert!(store
            .claim_reminders(user.id, &[task.id], now, window)
            .await
            .unwrap()
            .is_empty());
        assert!(store.get_task(user.id, task.id).await.unwrap().unwrap().notified);

        assert!(store.delete_task(user.id, task.id).await.unwrap());
        assert!(store.get_task(user.id, task.id).await.unwrap().is_none());
    }
}
