use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    planner::{TaskFilter, TaskSort},
    schedule::{self, validate_calendar_date, validate_clock_time},
};

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Sort weight, higher is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
        }
    }
}

/// What area of life a task belongs to.
/// Corresponds to the `task_category` SQL enum.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
pub enum TaskCategory {
    #[default]
    Personal,
    Work,
    Study,
    Health,
    Finance,
    Other,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Personal => "Personal",
            TaskCategory::Work => "Work",
            TaskCategory::Study => "Study",
            TaskCategory::Health => "Health",
            TaskCategory::Finance => "Finance",
            TaskCategory::Other => "Other",
        }
    }
}

/// Input structure for creating or updating a task.
///
/// The deadline is either a complete `deadline` timestamp or the `deadline_date`
/// / `deadline_time` pair a form submits.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters and not only whitespace.
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[serde(default)]
    pub category: TaskCategory,

    #[serde(default)]
    pub priority: TaskPriority,

    pub deadline: Option<DateTime<Utc>>,

    /// `YYYY-MM-DD`; ignored when blank.
    #[validate(custom = "validate_calendar_date")]
    pub deadline_date: Option<String>,

    /// `H:MM` or `HH:MM`, or loose input such as `0930` or `9`; ignored when blank.
    #[validate(custom = "validate_clock_time")]
    pub deadline_time: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("title is required".into());
        return Err(err);
    }
    Ok(())
}

impl TaskInput {
    /// Works out the single deadline this input describes, if any.
    pub fn resolve_deadline(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        if let Some(deadline) = self.deadline {
            return Ok(Some(deadline));
        }
        let date = match non_blank(&self.deadline_date) {
            Some(raw) => Some(schedule::parse_calendar_date(raw)?),
            None => None,
        };
        let time = match non_blank(&self.deadline_time) {
            Some(raw) => Some(schedule::parse_time_input(raw)?),
            None => None,
        };
        match (date, time) {
            (Some(date), time) => Ok(Some(schedule::combine_deadline(date, time))),
            (None, Some(_)) => Err(AppError::ValidationError(
                "deadline_time requires deadline_date".into(),
            )),
            (None, None) => Ok(None),
        }
    }

    fn clean_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    /// A near-deadline reminder has already gone out for the current deadline.
    pub notified: bool,
    /// Owner of the task.
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters accepted when listing tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Completion-state filter, `all` when absent.
    pub filter: Option<TaskFilter>,
    /// Ordering, `deadline` when absent.
    pub sort: Option<TaskSort>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
}

impl Task {
    /// Creates a new, incomplete `Task` owned by `user_id`.
    pub fn new(input: TaskInput, user_id: i32) -> Result<Self, AppError> {
        let deadline = input.resolve_deadline()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.clean_description(),
            category: input.category,
            priority: input.priority,
            deadline,
            completed: false,
            notified: false,
            user_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites the editable fields. Completion is left alone; a moved
    /// deadline re-arms the reminder.
    pub fn apply(&mut self, input: TaskInput) -> Result<(), AppError> {
        let deadline = input.resolve_deadline()?;
        if deadline != self.deadline {
            self.notified = false;
        }
        self.title = input.title.trim().to_string();
        self.description = input.clean_description();
        self.category = input.category;
        self.priority = input.priority;
        self.deadline = deadline;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            category: TaskCategory::default(),
            priority: TaskPriority::default(),
            deadline: None,
            deadline_date: None,
            deadline_time: None,
        }
    }

    #[test]
    fn test_task_creation() {
        let mut data = input("  Write report ");
        data.description = Some("   ".into());
        data.category = TaskCategory::Work;

        let task = Task::new(data, 1).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, None);
        assert_eq!(task.category, TaskCategory::Work);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.user_id, 1);
        assert!(!task.completed);
        assert!(!task.notified);
    }

    #[test]
    fn test_task_validation() {
        assert!(input("Valid Task").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input("    ").validate().is_err());
        assert!(input(&"a".repeat(201)).validate().is_err());

        let mut long_description = input("Valid title");
        long_description.description = Some("b".repeat(1001));
        assert!(long_description.validate().is_err());

        let mut bad_time = input("Valid title");
        bad_time.deadline_time = Some("25:00".into());
        assert!(bad_time.validate().is_err());

        let mut bad_date = input("Valid title");
        bad_date.deadline_date = Some("2031-02-30".into());
        assert!(bad_date.validate().is_err());
        assert!(matches!(
            bad_date.resolve_deadline(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_deadline_from_form_fields() {
        let mut data = input("Dentist");
        data.deadline_date = Some("2024-06-03".into());
        assert_eq!(
            data.resolve_deadline().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 6, 3, 23, 59, 59).unwrap())
        );

        data.deadline_time = Some("9:30".into());
        assert_eq!(
            data.resolve_deadline().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap())
        );

        data.deadline_time = Some("1745".into());
        assert_eq!(
            data.resolve_deadline().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 6, 3, 17, 45, 0).unwrap())
        );

        data.deadline_date = None;
        assert!(matches!(
            data.resolve_deadline(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_explicit_deadline_wins() {
        let explicit = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut data = input("Pay rent");
        data.deadline = Some(explicit);
        data.deadline_date = Some("2030-01-01".into());
        assert_eq!(data.resolve_deadline().unwrap(), Some(explicit));
    }

    #[test]
    fn test_apply_keeps_completion_and_rearms_reminder() {
        let mut task = Task::new(input("Gym"), 7).unwrap();
        task.completed = true;
        task.notified = true;

        let mut same_deadline = input("Gym session");
        same_deadline.priority = TaskPriority::High;
        task.apply(same_deadline).unwrap();
        assert_eq!(task.title, "Gym session");
        assert_eq!(task.priority, TaskPriority::High);
        assert!(task.completed);
        assert!(task.notified);

        let mut moved = input("Gym session");
        moved.deadline = Some(Utc::now());
        task.apply(moved).unwrap();
        assert!(!task.notified);
    }

    #[test]
    fn test_toggle_completed() {
        let mut task = Task::new(input("Read"), 1).unwrap();
        task.toggle_completed();
        assert!(task.completed);
        task.toggle_completed();
        assert!(!task.completed);
    }

    #[test]
    fn test_enum_json_spelling() {
        assert_eq!(
            serde_json::to_value(TaskPriority::High).unwrap(),
            serde_json::json!("High")
        );
        let category: TaskCategory = serde_json::from_str("\"Finance\"").unwrap();
        assert_eq!(category, TaskCategory::Finance);
        assert_eq!(category.as_str(), "Finance");
    }
}
