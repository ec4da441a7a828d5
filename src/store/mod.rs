//! Todo store
//!
//! A keyed record store behind create/read/update/delete operations. The whole store
//! is kept in memory behind a `RwLock` and, when opened with a path, written back as a
//! pretty-printed JSON document after every successful mutation.
//!
//! Mutations are staged on a copy of the state and only committed once the write to
//! disk succeeds, so a failed operation never leaves a partial change behind.

mod types;

pub use types::{
    parse_due_date, NewTodo, Priority, Todo, TodoFilter, TodoPatch, DEFAULT_LIST_LIMIT,
};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, TodoMcpError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreState {
    version: u32,
    next_id: i64,
    todos: Vec<Todo>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            version: 1,
            next_id: 1,
            todos: Vec::new(),
        }
    }
}

impl StoreState {
    fn position(&self, id: i64) -> Result<usize> {
        self.todos
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: i64) -> TodoMcpError {
    TodoMcpError::NotFound(format!("Todo with ID {} not found.", id))
}

/// Next `updated_at` value, strictly later than `previous`.
fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Todo store with optional JSON-file persistence.
pub struct TodoStore {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl TodoStore {
    /// Create an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Open (or create on first write) a store backed by the JSON file at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut state = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<StoreState>(&content)?
        } else {
            StoreState::default()
        };

        // Never hand out an id that is already taken, even if next_id was edited by hand.
        let max_id = state.todos.iter().map(|t| t.id).max().unwrap_or(0);
        state.next_id = state.next_id.max(max_id + 1);

        info!(path = %path.display(), todos = state.todos.len(), "Opened todo store");
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored todos.
    pub async fn len(&self) -> usize {
        self.state.read().await.todos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// List todos matching `filter`, newest-created first.
    pub async fn list(&self, filter: &TodoFilter) -> Vec<Todo> {
        let state = self.state.read().await;
        let mut todos: Vec<Todo> = state
            .todos
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        todos.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = filter.effective_limit() {
            todos.truncate(limit);
        }
        todos
    }

    /// Get a todo by id.
    pub async fn get(&self, id: i64) -> Result<Todo> {
        let state = self.state.read().await;
        let index = state.position(id)?;
        Ok(state.todos[index].clone())
    }

    /// Create a todo and return the stored record.
    pub async fn create(&self, new: NewTodo) -> Result<Todo> {
        if new.title.trim().is_empty() {
            return Err(TodoMcpError::Validation(
                "Title must not be empty.".to_string(),
            ));
        }

        self.mutate(|state| {
            let now = Utc::now();
            let todo = Todo {
                id: state.next_id,
                title: new.title,
                description: new.description,
                completed: false,
                created_at: now,
                updated_at: now,
                due_date: new.due_date,
                priority: new.priority,
            };
            state.next_id += 1;
            state.todos.push(todo.clone());
            Ok(todo)
        })
        .await
    }

    /// Apply a partial update and return the updated record.
    ///
    /// A missing id is reported before an empty patch.
    pub async fn update(&self, id: i64, patch: TodoPatch) -> Result<Todo> {
        self.mutate(|state| {
            let index = state.position(id)?;
            if patch.is_empty() {
                return Err(TodoMcpError::Validation("No fields to update.".to_string()));
            }
            if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(TodoMcpError::Validation(
                    "Title must not be empty.".to_string(),
                ));
            }

            let todo = &mut state.todos[index];
            patch.apply_to(todo);
            todo.updated_at = touch(todo.updated_at);
            Ok(todo.clone())
        })
        .await
    }

    /// Delete a todo and return the removed record.
    pub async fn delete(&self, id: i64) -> Result<Todo> {
        self.mutate(|state| {
            let index = state.position(id)?;
            Ok(state.todos.remove(index))
        })
        .await
    }

    /// Run `op` against a copy of the state, persist it, then commit.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut StoreState) -> Result<T>,
    {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let out = op(&mut staged)?;
        self.persist(&staged).await?;
        *state = staged;
        Ok(out)
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), todos = state.todos.len(), "Saved todo store");
        Ok(())
    }
}
