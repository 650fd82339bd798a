use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Task, TaskInput, TaskQuery},
    planner::{self, Reminder, TaskStats},
    schedule::Countdown,
    store::Store,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

async fn owned_task(store: &dyn Store, user_id: i32, task_id: Uuid) -> Result<Task, AppError> {
    store
        .get_task(user_id, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Lists the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `filter` (optional): `all` (default), `pending`, `completed` or `overdue`.
/// - `sort` (optional): `deadline` (default), `priority`, `category`, `created` or `title`.
/// - `category` (optional): e.g. `Work`.
/// - `priority` (optional): `Low`, `Medium` or `High`.
/// - `search` (optional): case-insensitive match on title and description.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `400 Bad Request`: unknown filter, sort, category or priority value.
/// - `401 Unauthorized`: missing or invalid session token.
#[get("")]
pub async fn get_tasks(
    store: web::Data<dyn Store>,
    query_params: web::Query<TaskQuery>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = store.list_tasks(user_id.0).await?;
    let tasks = planner::arrange(tasks, &query_params, Utc::now());
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task for the authenticated user.
///
/// ## Request Body:
/// A `TaskInput`: `title` (required), `description`, `category` (default
/// `Personal`), `priority` (default `Medium`), and either `deadline` or the
/// `deadline_date` / `deadline_time` pair. Loose times such as `0930` are
/// normalized before validation.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `422 Unprocessable Entity`: the input failed validation.
#[post("")]
pub async fn create_task(
    store: web::Data<dyn Store>,
    task_data: web::Json<TaskInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), user_id.0)?;
    let created = store.insert_task(&task).await?;

    Ok(HttpResponse::Created().json(created))
}

/// Progress, per-filter counts, category breakdown and the next deadlines.
#[get("/stats")]
pub async fn get_stats(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = store.list_tasks(user_id.0).await?;
    Ok(HttpResponse::Ok().json(TaskStats::compute(&tasks, Utc::now())))
}

/// Reminders for deadlines less than an hour away.
///
/// Each task is reminded about once per deadline: the call marks reminded
/// tasks as notified and clears the mark on tasks whose deadline has moved
/// back out of the window.
#[get("/reminders")]
pub async fn get_reminders(
    store: web::Data<dyn Store>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let now = Utc::now();
    let window = planner::reminder_window();
    let tasks = store.list_tasks(user_id.0).await?;
    let mut sweep = planner::sweep_reminders(&tasks, now, window);

    store
        .rearm_reminders(user_id.0, &sweep.rearm, now, window)
        .await?;
    // Only what this call actually flagged goes out; a concurrent sweep or edit
    // may have changed the rest since the snapshot.
    let claimed = store
        .claim_reminders(user_id.0, &sweep.notify, now, window)
        .await?;
    sweep.reminders = claimed
        .iter()
        .filter_map(|task| Reminder::for_task(task, now, window))
        .collect();

    Ok(HttpResponse::Ok().json(sweep))
}

/// Retrieves one task.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = owned_task(store.get_ref(), user_id.0, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Time left until the task's deadline.
///
/// ## Responses:
/// - `200 OK`: a `Countdown`.
/// - `400 Bad Request`: the task has no deadline.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}/countdown")]
pub async fn get_countdown(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = owned_task(store.get_ref(), user_id.0, task_id.into_inner()).await?;
    let deadline = task
        .deadline
        .ok_or_else(|| AppError::BadRequest("Task has no deadline".into()))?;
    Ok(HttpResponse::Ok().json(Countdown::until(deadline, Utc::now())))
}

/// Replaces a task's editable fields.
///
/// The completion state is kept; use the toggle endpoint to change it.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
/// - `422 Unprocessable Entity`: the input failed validation.
#[put("/{id}")]
pub async fn update_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let mut task = owned_task(store.get_ref(), user_id.0, task_id.into_inner()).await?;
    task.apply(task_data.into_inner())?;

    let updated = store
        .update_task(&task)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Flips a task between done and not done.
#[patch("/{id}/toggle")]
pub async fn toggle_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let toggled = store
        .toggle_task(user_id.0, task_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(toggled))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    store: web::Data<dyn Store>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    if !store.delete_task(user_id.0, task_id.into_inner()).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }
    Ok(HttpResponse::NoContent().finish())
}
