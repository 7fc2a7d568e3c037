//! GraphQL schema and resolvers for the todo collection.

use async_graphql::{Context, EmptySubscription, ID, Object, Result, Schema, SimpleObject};

use crate::todo::{AddTodoInput, CompletedTodo, EditedTodo, Todo, TodoPatch, TodoService, input};

pub type TodoSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Builds the executable schema with the service available to every resolver.
pub fn build_schema(service: TodoService) -> TodoSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "Todo")]
pub struct TodoObject {
    #[graphql(name = "_id")]
    pub id: ID,
    pub title: String,
    pub description: String,
    pub reminder: String,
    pub image: Option<String>,
    pub status: bool,
}

impl From<Todo> for TodoObject {
    fn from(todo: Todo) -> Self {
        Self {
            id: ID(todo.id().to_hex()),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            reminder: input::format_reminder(todo.reminder()),
            image: todo.image().map(str::to_string),
            status: todo.status(),
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct EditTodoResponse {
    #[graphql(name = "_id")]
    pub id: ID,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<EditedTodo> for EditTodoResponse {
    fn from(edited: EditedTodo) -> Self {
        Self {
            id: ID(edited.id.to_hex()),
            title: edited.title,
            description: edited.description,
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct CompleteTodoResponse {
    #[graphql(name = "_id")]
    pub id: ID,
    pub status: bool,
}

impl From<CompletedTodo> for CompleteTodoResponse {
    fn from(completed: CompletedTodo) -> Self {
        Self {
            id: ID(completed.id.to_hex()),
            status: completed.status,
        }
    }
}

#[derive(Debug, SimpleObject)]
pub struct DeleteTodoResponse {
    pub success: bool,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn todos(&self, ctx: &Context<'_>) -> Result<Vec<TodoObject>> {
        let service = ctx.data::<TodoService>()?;
        let todos = service.list_todos().await.inspect_err(|err| {
            tracing::error!("Failed to list todos: {}", err);
        })?;
        Ok(todos.into_iter().map(TodoObject::from).collect())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_todo(
        &self,
        ctx: &Context<'_>,
        title: String,
        description: String,
        reminder: String,
        image: Option<String>,
        status: bool,
    ) -> Result<TodoObject> {
        let service = ctx.data::<TodoService>()?;
        let request = AddTodoInput {
            title,
            description,
            reminder,
            image,
            status,
        };
        let todo = service.add_todo(request).await.inspect_err(|err| {
            tracing::warn!("Todo could not be added: {}", err);
        })?;
        Ok(TodoObject::from(todo))
    }

    async fn edit_todo(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "_id")] id: ID,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<EditTodoResponse> {
        let service = ctx.data::<TodoService>()?;
        let patch = TodoPatch { title, description };
        let edited = service.edit_todo(&id, patch).await?;
        Ok(EditTodoResponse::from(edited))
    }

    async fn complete_todo(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "_id")] id: ID,
    ) -> Result<CompleteTodoResponse> {
        let service = ctx.data::<TodoService>()?;
        let completed = service.complete_todo(&id).await?;
        Ok(CompleteTodoResponse::from(completed))
    }

    async fn delete_todo(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "_id")] id: ID,
    ) -> Result<DeleteTodoResponse> {
        let service = ctx.data::<TodoService>()?;
        service.delete_todo(&id).await?;
        Ok(DeleteTodoResponse { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::{MockTodoStore, StoreError};
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;
    use std::sync::Arc;

    const TODO_ID: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

    fn schema_with(store: MockTodoStore) -> TodoSchema {
        build_schema(TodoService::new(Arc::new(store)))
    }

    fn stored_todo(image: Option<&str>, status: bool) -> Todo {
        Todo::new(
            ObjectId::parse_str(TODO_ID).unwrap(),
            "Groceries".to_string(),
            "Milk and eggs".to_string(),
            input::parse_reminder("05/01/2024 09:30").unwrap(),
            image.map(str::to_string),
            status,
        )
    }

    #[test]
    fn can_export_declared_sdl() {
        let sdl = schema_with(MockTodoStore::new()).sdl();

        assert!(sdl.contains("type Todo {"));
        assert!(sdl.contains("_id: ID!"));
        assert!(sdl.contains("image: String\n"));
        assert!(sdl.contains("todos: [Todo!]!"));
        assert!(sdl.contains("completeTodo("));
        assert!(sdl.contains("): CompleteTodoResponse!"));
        assert!(sdl.contains("): DeleteTodoResponse!"));
        assert!(sdl.contains("type EditTodoResponse {"));
    }

    #[tokio::test]
    async fn can_resolve_todos_query() {
        let mut store = MockTodoStore::new();
        store
            .expect_find_all()
            .times(1)
            .returning(|| Ok(vec![stored_todo(Some("QUJD"), false), stored_todo(None, true)]));

        let response = schema_with(store)
            .execute("{ todos { _id title description reminder image status } }")
            .await;

        assert!(response.is_ok(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "todos": [
                    {
                        "_id": TODO_ID,
                        "title": "Groceries",
                        "description": "Milk and eggs",
                        "reminder": "2024-01-05 09:30:00",
                        "image": "QUJD",
                        "status": false
                    },
                    {
                        "_id": TODO_ID,
                        "title": "Groceries",
                        "description": "Milk and eggs",
                        "reminder": "2024-01-05 09:30:00",
                        "image": null,
                        "status": true
                    }
                ]
            })
        );
    }

    #[tokio::test]
    async fn can_resolve_add_todo_mutation() {
        let mut store = MockTodoStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_| Ok(ObjectId::parse_str(TODO_ID).unwrap()));

        let response = schema_with(store)
            .execute(
                r#"mutation {
                    addTodo(title: "Groceries", description: "Milk and eggs", reminder: "05/01/2024 09:30", image: "data:image/png;base64,QUJD", status: false) {
                        _id image reminder status
                    }
                }"#,
            )
            .await;

        assert!(response.is_ok(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "addTodo": {
                    "_id": TODO_ID,
                    "image": "QUJD",
                    "reminder": "2024-01-05 09:30:00",
                    "status": false
                }
            })
        );
    }

    #[tokio::test]
    async fn can_report_bad_reminder_as_graphql_error() {
        let store = MockTodoStore::new();

        let response = schema_with(store)
            .execute(
                r#"mutation {
                    addTodo(title: "t", description: "d", reminder: "soon", status: false) { _id }
                }"#,
            )
            .await;

        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.contains("Invalid reminder 'soon'"));
    }

    #[tokio::test]
    async fn can_resolve_edit_todo_mutation_with_variables() {
        let mut store = MockTodoStore::new();
        store.expect_update_fields().times(1).returning(|_, _| Ok(1));

        let request = async_graphql::Request::new(
            "mutation Edit($id: ID!, $title: String) { editTodo(_id: $id, title: $title) { _id title description } }",
        )
        .variables(async_graphql::Variables::from_json(
            json!({ "id": TODO_ID, "title": "Shopping" }),
        ));
        let response = schema_with(store).execute(request).await;

        assert!(response.is_ok(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({ "editTodo": { "_id": TODO_ID, "title": "Shopping", "description": null } })
        );
    }

    #[tokio::test]
    async fn can_report_already_completed_todo() {
        let mut store = MockTodoStore::new();
        store.expect_mark_complete().times(1).returning(|_| Ok(0));

        let response = schema_with(store)
            .execute(format!(r#"mutation {{ completeTodo(_id: "{}") {{ _id status }} }}"#, TODO_ID))
            .await;

        assert!(!response.is_ok());
        assert_eq!(
            response.errors[0].message,
            format!("Todo {} not found or already completed", TODO_ID)
        );
    }

    #[tokio::test]
    async fn can_report_store_failure_on_delete() {
        let mut store = MockTodoStore::new();
        store
            .expect_delete()
            .times(1)
            .returning(|_| Err(StoreError::MalformedDocument("boom".to_string())));

        let response = schema_with(store)
            .execute(format!(r#"mutation {{ deleteTodo(_id: "{}") {{ success }} }}"#, TODO_ID))
            .await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Malformed todo document: boom");
    }

    #[tokio::test]
    async fn cannot_query_undeclared_field() {
        let response = schema_with(MockTodoStore::new())
            .execute("{ todos { _id priority } }")
            .await;

        assert!(!response.is_ok());
    }
}
