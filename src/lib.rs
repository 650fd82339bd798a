#![doc = "The `planit` library crate."]
#![doc = ""]
#![doc = "Accounts, tasks and the task-list views (filters, sorting, progress, deadline"]
#![doc = "countdowns and reminders) behind the PlanIt HTTP API, plus the storage backends,"]
#![doc = "session tokens and error handling the binary (`main.rs`) wires together."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod routes;
pub mod schedule;
pub mod store;

pub use crate::error::AppError;
