//! Todo tools
//!
//! The five tools the todo service publishes: `list_todos`, `create_todo`,
//! `update_todo`, `delete_todo` and `get_todo`. Each one wraps the shared
//! [`TodoStore`] and answers with pretty-printed JSON.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, TodoMcpError};
use crate::session::ToolArguments;
use crate::store::{parse_due_date, NewTodo, Priority, TodoFilter, TodoPatch, TodoStore};

use super::{Tool, ToolOutput, ToolRegistry};

/// Register all todo tools against `store`, in their published order.
pub fn register_todo_tools(registry: &mut ToolRegistry, store: Arc<TodoStore>) {
    registry.register(Box::new(ListTodosTool::new(Arc::clone(&store))));
    registry.register(Box::new(CreateTodoTool::new(Arc::clone(&store))));
    registry.register(Box::new(UpdateTodoTool::new(Arc::clone(&store))));
    registry.register(Box::new(DeleteTodoTool::new(Arc::clone(&store))));
    registry.register(Box::new(GetTodoTool::new(store)));
}

fn parse_args<T: DeserializeOwned>(args: ToolArguments) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| TodoMcpError::Validation(format!("Invalid arguments: {}", e)))
}

fn parse_priority(value: Option<String>) -> Result<Option<Priority>> {
    value.map(|p| p.parse()).transpose()
}

fn parse_due(value: Option<String>) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value.as_deref().map(parse_due_date).transpose()
}

// ============================================================================
// list_todos
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListArgs {
    completed: Option<bool>,
    priority: Option<String>,
    limit: Option<usize>,
}

/// Lists todos, newest first, with optional filters.
pub struct ListTodosTool {
    store: Arc<TodoStore>,
}

impl ListTodosTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTodosTool {
    fn name(&self) -> &str {
        "list_todos"
    }

    fn description(&self) -> &str {
        "List todos, newest first. Optionally filter by completion status and priority."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "completed": {
                    "type": "boolean",
                    "description": "Only return todos with this completion status"
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Only return todos with this priority"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 0,
                    "default": 10,
                    "description": "Maximum number of todos to return (0 for all)"
                }
            }
        })
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput> {
        let args: ListArgs = parse_args(args)?;
        let filter = TodoFilter {
            completed: args.completed,
            priority: parse_priority(args.priority)?,
            limit: args.limit,
        };
        let todos = self.store.list(&filter).await;
        ToolOutput::json(&todos)
    }
}

// ============================================================================
// create_todo
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    #[serde(default)]
    description: String,
    priority: Option<String>,
    due_date: Option<String>,
}

/// Creates a todo.
pub struct CreateTodoTool {
    store: Arc<TodoStore>,
}

impl CreateTodoTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTodoTool {
    fn name(&self) -> &str {
        "create_todo"
    }

    fn description(&self) -> &str {
        "Create a new todo item."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "Title of the todo"},
                "description": {"type": "string", "default": "", "description": "Longer description"},
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "default": "medium"
                },
                "due_date": {
                    "type": "string",
                    "description": "Due date as YYYY-MM-DD or an RFC 3339 timestamp"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput> {
        let args: CreateArgs = parse_args(args)?;
        let mut new = NewTodo::new(args.title)
            .with_description(args.description)
            .with_priority(parse_priority(args.priority)?.unwrap_or_default());
        if let Some(due) = parse_due(args.due_date)? {
            new = new.with_due_date(due);
        }

        let todo = self.store.create(new).await?;

        let mut payload = serde_json::to_value(&todo)?;
        if let Value::Object(map) = &mut payload {
            map.insert(
                "message".to_string(),
                json!(format!("Created todo: {} (ID: {})", todo.title, todo.id)),
            );
        }
        ToolOutput::json(&payload)
    }
}

// ============================================================================
// update_todo
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    id: i64,
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    priority: Option<String>,
    due_date: Option<String>,
}

/// Updates the supplied fields of a todo.
pub struct UpdateTodoTool {
    store: Arc<TodoStore>,
}

impl UpdateTodoTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTodoTool {
    fn name(&self) -> &str {
        "update_todo"
    }

    fn description(&self) -> &str {
        "Update an existing todo. Only the fields provided are changed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "description": "ID of the todo to update"},
                "title": {"type": "string"},
                "description": {"type": "string"},
                "completed": {"type": "boolean"},
                "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                "due_date": {
                    "type": "string",
                    "description": "Due date as YYYY-MM-DD or an RFC 3339 timestamp"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput> {
        let args: UpdateArgs = parse_args(args)?;
        // Unknown ids are reported before field validation
        self.store.get(args.id).await?;
        let patch = TodoPatch {
            title: args.title,
            description: args.description,
            completed: args.completed,
            priority: parse_priority(args.priority)?,
            due_date: parse_due(args.due_date)?,
        };

        let todo = self.store.update(args.id, patch).await?;
        ToolOutput::json(&json!({
            "message": format!("Updated todo ID {}", todo.id),
            "todo": todo,
        }))
    }
}

// ============================================================================
// delete_todo
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdArgs {
    id: i64,
}

/// Deletes a todo.
pub struct DeleteTodoTool {
    store: Arc<TodoStore>,
}

impl DeleteTodoTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTodoTool {
    fn name(&self) -> &str {
        "delete_todo"
    }

    fn description(&self) -> &str {
        "Delete a todo by ID."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "description": "ID of the todo to delete"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput> {
        let args: IdArgs = parse_args(args)?;
        let todo = self.store.delete(args.id).await?;
        ToolOutput::json(&json!({
            "message": format!("Deleted todo: {} (ID: {})", todo.title, todo.id),
        }))
    }
}

// ============================================================================
// get_todo
// ============================================================================

/// Fetches a single todo.
pub struct GetTodoTool {
    store: Arc<TodoStore>,
}

impl GetTodoTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTodoTool {
    fn name(&self) -> &str {
        "get_todo"
    }

    fn description(&self) -> &str {
        "Get a single todo by ID."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "description": "ID of the todo"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput> {
        let args: IdArgs = parse_args(args)?;
        let todo = self.store.get(args.id).await?;
        ToolOutput::json(&todo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (ToolRegistry, Arc<TodoStore>) {
        let store = Arc::new(TodoStore::in_memory());
        let mut registry = ToolRegistry::new();
        register_todo_tools(&mut registry, Arc::clone(&store));
        (registry, store)
    }

    fn args(value: Value) -> ToolArguments {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn call(registry: &ToolRegistry, name: &str, value: Value) -> (Value, bool) {
        let output = registry.execute(name, args(value)).await.unwrap();
        (serde_json::from_str(&output.content).unwrap(), output.is_error)
    }

    #[test]
    fn test_tools_published_in_order() {
        let (registry, _) = registry();
        assert_eq!(
            registry.names(),
            vec!["list_todos", "create_todo", "update_todo", "delete_todo", "get_todo"]
        );
        for descriptor in registry.descriptors() {
            let schema = descriptor.input_schema.unwrap();
            assert_eq!(schema["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_create_todo() {
        let (registry, store) = registry();
        let (body, is_error) = call(
            &registry,
            "create_todo",
            json!({"title": "Ship release", "priority": "high"}),
        )
        .await;

        assert!(!is_error);
        assert_eq!(body["id"], 1);
        assert_eq!(body["priority"], "high");
        assert_eq!(body["description"], "");
        assert_eq!(body["completed"], false);
        assert_eq!(body["message"], "Created todo: Ship release (ID: 1)");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_todo_with_due_date() {
        let (registry, _) = registry();
        let (body, is_error) = call(
            &registry,
            "create_todo",
            json!({"title": "Taxes", "due_date": "2026-04-15"}),
        )
        .await;

        assert!(!is_error);
        assert!(body["due_date"].as_str().unwrap().starts_with("2026-04-15T00:00:00"));
    }

    #[tokio::test]
    async fn test_create_todo_invalid_priority() {
        let (registry, store) = registry();
        let (body, is_error) = call(
            &registry,
            "create_todo",
            json!({"title": "x", "priority": "urgent"}),
        )
        .await;

        assert!(is_error);
        assert!(body["error"].as_str().unwrap().contains("Invalid priority"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_todo_missing_title() {
        let (registry, _) = registry();
        let (body, is_error) = call(&registry, "create_todo", json!({})).await;

        assert!(is_error);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_list_todos_filters() {
        let (registry, _) = registry();
        call(&registry, "create_todo", json!({"title": "a", "priority": "high"})).await;
        call(&registry, "create_todo", json!({"title": "b", "priority": "low"})).await;
        call(&registry, "create_todo", json!({"title": "c", "priority": "high"})).await;
        call(&registry, "update_todo", json!({"id": 3, "completed": true})).await;

        let (body, is_error) = call(
            &registry,
            "list_todos",
            json!({"completed": false, "priority": "high"}),
        )
        .await;
        assert!(!is_error);
        let todos = body.as_array().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["title"], "a");

        let (body, _) = call(&registry, "list_todos", json!({"limit": 2})).await;
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_update_todo_partial() {
        let (registry, _) = registry();
        call(
            &registry,
            "create_todo",
            json!({"title": "Ship release", "description": "v1", "priority": "high"}),
        )
        .await;

        let (body, is_error) =
            call(&registry, "update_todo", json!({"id": 1, "completed": true})).await;

        assert!(!is_error);
        assert_eq!(body["message"], "Updated todo ID 1");
        assert_eq!(body["todo"]["completed"], true);
        assert_eq!(body["todo"]["title"], "Ship release");
        assert_eq!(body["todo"]["description"], "v1");
        assert_eq!(body["todo"]["priority"], "high");
    }

    #[tokio::test]
    async fn test_update_todo_no_fields() {
        let (registry, _) = registry();
        call(&registry, "create_todo", json!({"title": "x"})).await;

        let (body, is_error) = call(&registry, "update_todo", json!({"id": 1})).await;
        assert!(is_error);
        assert_eq!(body["error"], "No fields to update.");
    }

    #[tokio::test]
    async fn test_not_found_is_error_result() {
        let (registry, _) = registry();
        for name in ["get_todo", "delete_todo"] {
            let (body, is_error) = call(&registry, name, json!({"id": 42})).await;
            assert!(is_error);
            assert_eq!(body["error"], "Todo with ID 42 not found.");
        }

        let (body, is_error) =
            call(&registry, "update_todo", json!({"id": 42, "title": "y"})).await;
        assert!(is_error);
        assert_eq!(body["error"], "Todo with ID 42 not found.");
    }

    #[tokio::test]
    async fn test_update_unknown_id_wins_over_invalid_fields() {
        let (registry, _) = registry();
        let (body, is_error) =
            call(&registry, "update_todo", json!({"id": 99, "priority": "urgent"})).await;
        assert!(is_error);
        assert_eq!(body["error"], "Todo with ID 99 not found.");

        let (body, is_error) =
            call(&registry, "update_todo", json!({"id": 99, "due_date": "someday"})).await;
        assert!(is_error);
        assert_eq!(body["error"], "Todo with ID 99 not found.");
    }

    #[tokio::test]
    async fn test_delete_and_get() {
        let (registry, store) = registry();
        call(&registry, "create_todo", json!({"title": "Temp"})).await;

        let (body, _) = call(&registry, "get_todo", json!({"id": 1})).await;
        assert_eq!(body["title"], "Temp");

        let (body, is_error) = call(&registry, "delete_todo", json!({"id": 1})).await;
        assert!(!is_error);
        assert_eq!(body["message"], "Deleted todo: Temp (ID: 1)");
        assert!(store.is_empty().await);
    }
}
