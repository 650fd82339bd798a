pub mod task;
pub mod user;

pub use task::{Task, TaskCategory, TaskInput, TaskPriority, TaskQuery};
pub use user::{NewUser, User, UserRecord};
