//! Task-list views: filtering, ordering and the statistics shown next to the list.
//!
//! Everything here is a pure function over a slice of tasks plus "now", so the
//! handlers fetch a user's tasks once and derive whatever the client asked for.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap};
use uuid::Uuid;

use crate::{
    models::{Task, TaskQuery},
    schedule::{self, DeadlineLabel},
};

/// How many upcoming deadlines the stats view lists.
pub const UPCOMING_LIMIT: usize = 3;

/// Tasks due within this window get a reminder.
pub fn reminder_window() -> Duration {
    Duration::minutes(60)
}

/// Filters on completion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
    Overdue,
}

impl TaskFilter {
    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Pending => !task.completed,
            TaskFilter::Completed => task.completed,
            TaskFilter::Overdue => is_overdue(task, now),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSort {
    /// Soonest deadline first, tasks without one last.
    #[default]
    Deadline,
    /// High before Medium before Low.
    Priority,
    /// Alphabetical by category name.
    Category,
    /// Newest first.
    Created,
    /// Alphabetical by title, ignoring case.
    Title,
}

impl TaskSort {
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            TaskSort::Deadline => match (a.deadline, b.deadline) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            TaskSort::Priority => b.priority.rank().cmp(&a.priority.rank()),
            TaskSort::Category => a.category.as_str().cmp(b.category.as_str()),
            TaskSort::Created => b.created_at.cmp(&a.created_at),
            TaskSort::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
    }
}

/// Incomplete, has a deadline, and the deadline has passed.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.completed && task.deadline.map_or(false, |deadline| deadline < now)
}

/// Applies every narrowing in `query` and orders the result.
pub fn arrange(tasks: Vec<Task>, query: &TaskQuery, now: DateTime<Utc>) -> Vec<Task> {
    let filter = query.filter.unwrap_or_default();
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut selected: Vec<Task> = tasks
        .into_iter()
        .filter(|task| filter.matches(task, now))
        .filter(|task| query.category.map_or(true, |c| task.category == c))
        .filter(|task| query.priority.map_or(true, |p| task.priority == p))
        .filter(|task| match &needle {
            Some(needle) => {
                task.title.to_lowercase().contains(needle)
                    || task
                        .description
                        .as_deref()
                        .map_or(false, |d| d.to_lowercase().contains(needle))
            }
            None => true,
        })
        .collect();

    let sort = query.sort.unwrap_or_default();
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

/// Number of tasks each filter would show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounts {
    pub all: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl FilterCounts {
    pub fn tally(tasks: &[Task], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut counts, task| {
            counts.all += 1;
            if task.completed {
                counts.completed += 1;
            } else {
                counts.pending += 1;
            }
            if is_overdue(task, now) {
                counts.overdue += 1;
            }
            counts
        })
    }
}

/// Completed share of all tasks as a whole percentage; 0 for no tasks.
pub fn progress_percent(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    ((completed as f64 / tasks.len() as f64) * 100.0).round() as u8
}

/// Encouragement bucket for a progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTier {
    NotStarted,
    Started,
    Halfway,
    Almost,
    Done,
}

impl From<u8> for ProgressTier {
    fn from(progress: u8) -> Self {
        match progress {
            100..=u8::MAX => ProgressTier::Done,
            75..=99 => ProgressTier::Almost,
            50..=74 => ProgressTier::Halfway,
            1..=49 => ProgressTier::Started,
            0 => ProgressTier::NotStarted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingDeadline {
    pub id: Uuid,
    pub title: String,
    pub deadline: DateTime<Utc>,
    /// Deadline clock time with an AM/PM suffix, e.g. `05:30 PM`.
    pub time_12h: String,
    pub label: DeadlineLabel,
    /// `label` as display text: `overdue`, `in 5 hours`, `tomorrow`, `in 3 days`.
    pub label_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub counts: FilterCounts,
    pub progress: u8,
    pub tier: ProgressTier,
    /// Task count per category name; categories with no tasks are absent.
    pub by_category: BTreeMap<String, usize>,
    pub upcoming: Vec<UpcomingDeadline>,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let progress = progress_percent(tasks);

        let mut by_category = BTreeMap::new();
        for task in tasks {
            *by_category
                .entry(task.category.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut open: Vec<(&Task, DateTime<Utc>)> = tasks
            .iter()
            .filter(|t| !t.completed)
            .filter_map(|t| t.deadline.map(|d| (t, d)))
            .collect();
        open.sort_by_key(|(_, deadline)| *deadline);
        let upcoming = open
            .into_iter()
            .take(UPCOMING_LIMIT)
            .map(|(task, deadline)| {
                let label = DeadlineLabel::for_deadline(deadline, now);
                UpcomingDeadline {
                    id: task.id,
                    title: task.title.clone(),
                    deadline,
                    time_12h: schedule::format_12h(deadline.naive_utc().time()),
                    label,
                    label_text: label.to_string(),
                }
            })
            .collect();

        Self {
            counts: FilterCounts::tally(tasks, now),
            progress,
            tier: ProgressTier::from(progress),
            by_category,
            upcoming,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub task_id: Uuid,
    pub title: String,
    pub minutes_left: i64,
}

/// Outcome of checking deadlines against the reminder window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSweep {
    pub reminders: Vec<Reminder>,
    /// Tasks that must now be flagged as notified.
    #[serde(skip)]
    pub notify: Vec<Uuid>,
    /// Tasks whose deadline moved back out of the window; their flag is cleared.
    #[serde(skip)]
    pub rearm: Vec<Uuid>,
}

impl Reminder {
    /// `None` unless `task` is open and due within `window`.
    pub fn for_task(task: &Task, now: DateTime<Utc>, window: Duration) -> Option<Self> {
        let left = task.deadline? - now;
        if task.completed || left <= Duration::zero() || left > window {
            return None;
        }
        Some(Self {
            task_id: task.id,
            title: task.title.clone(),
            // Round up so 30 seconds left still reads as one minute.
            minutes_left: (left.num_seconds() + 59) / 60,
        })
    }
}

/// Open, due within `window` and not reminded yet.
pub fn due_for_reminder(task: &Task, now: DateTime<Utc>, window: Duration) -> bool {
    !task.notified && Reminder::for_task(task, now, window).is_some()
}

/// Flagged, open, and the deadline is now further away than `window`.
pub fn should_rearm(task: &Task, now: DateTime<Utc>, window: Duration) -> bool {
    task.notified && !task.completed && task.deadline.map_or(false, |d| d - now > window)
}

/// Finds incomplete tasks due within `window` that have not been reminded yet,
/// and re-arms flagged tasks whose deadline is now further away than `window`.
///
/// The result is computed from a snapshot; the store claims `notify` with a
/// conditional write and only the claimed tasks are reported.
pub fn sweep_reminders(tasks: &[Task], now: DateTime<Utc>, window: Duration) -> ReminderSweep {
    let mut sweep = ReminderSweep::default();
    for task in tasks {
        if due_for_reminder(task, now, window) {
            sweep.reminders.extend(Reminder::for_task(task, now, window));
            sweep.notify.push(task.id);
        } else if should_rearm(task, now, window) {
            sweep.rearm.push(task.id);
        }
    }
    sweep
}
