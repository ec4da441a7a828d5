//! Todo record types and the inputs accepted by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoMcpError};

/// Default number of records returned by `list`.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Todo priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = TodoMcpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TodoMcpError::Validation(format!(
                "Invalid priority '{}': expected low, medium or high.",
                other
            ))),
        }
    }
}

/// A stored todo item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
}

/// Input for creating a todo.
#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTodo {
    /// A new todo with the given title and default fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update. Only the fields that are `Some` change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TodoPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Apply the present fields to `todo`. Does not touch timestamps.
    pub(crate) fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = Some(due_date);
        }
    }
}

/// Filters for `list`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// `None` means [`DEFAULT_LIST_LIMIT`]; `Some(0)` means unlimited.
    pub limit: Option<usize>,
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        self.completed.map_or(true, |c| todo.completed == c)
            && self.priority.map_or(true, |p| todo.priority == p)
    }

    pub(crate) fn effective_limit(&self) -> Option<usize> {
        match self.limit {
            None => Some(DEFAULT_LIST_LIMIT),
            Some(0) => None,
            Some(n) => Some(n),
        }
    }
}

/// Parse a due date given as RFC 3339 or `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(TodoMcpError::Validation(format!(
        "Invalid due_date '{}': expected YYYY-MM-DD or an RFC 3339 timestamp.",
        input
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!(Priority::Medium.to_string(), "medium");
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_priority_parse_invalid() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert!(matches!(err, TodoMcpError::Validation(_)));
        assert!(err.to_string().contains("urgent"));
    }

    #[test]
    fn test_priority_serde() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(p, Priority::Low);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TodoPatch::new().is_empty());
        assert!(!TodoPatch::new().with_completed(false).is_empty());
    }

    #[test]
    fn test_filter_effective_limit() {
        assert_eq!(TodoFilter::default().effective_limit(), Some(10));
        let unlimited = TodoFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(unlimited.effective_limit(), None);
        let three = TodoFilter {
            limit: Some(3),
            ..Default::default()
        };
        assert_eq!(three.effective_limit(), Some(3));
    }

    #[test]
    fn test_parse_due_date_plain_date() {
        let due = parse_due_date("2025-01-31").unwrap();
        assert_eq!((due.year(), due.month(), due.day()), (2025, 1, 31));
        assert_eq!(due.hour(), 0);
    }

    #[test]
    fn test_parse_due_date_rfc3339() {
        let due = parse_due_date("2025-01-31T15:30:00+02:00").unwrap();
        assert_eq!(due.hour(), 13);
    }

    #[test]
    fn test_parse_due_date_invalid() {
        assert!(matches!(
            parse_due_date("next tuesday"),
            Err(TodoMcpError::Validation(_))
        ));
    }
}
