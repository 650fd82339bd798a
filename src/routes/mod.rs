pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::web;

use crate::error::AppError;

/// Registers every API route. Mounted under `/api` behind `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(auth::login)
    .service(auth::register)
    .service(auth::profile)
    .service(auth::change_password)
    .service(
        // Fixed paths first so they are not captured by `/{id}`.
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_stats)
            .service(tasks::get_reminders)
            .service(tasks::get_task)
            .service(tasks::get_countdown)
            .service(tasks::update_task)
            .service(tasks::toggle_task)
            .service(tasks::delete_task),
    );
}
