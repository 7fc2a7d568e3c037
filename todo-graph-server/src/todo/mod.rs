use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

pub mod input;
pub mod store;

pub use store::{MongoTodoStore, StoreError};

#[derive(Debug, PartialEq, Clone)]
pub struct Todo {
    id: ObjectId,
    title: String,
    description: String,
    reminder: DateTime<Utc>,
    image: Option<String>,
    status: bool,
}

impl Todo {
    pub fn new(
        id: ObjectId,
        title: String,
        description: String,
        reminder: DateTime<Utc>,
        image: Option<String>,
        status: bool,
    ) -> Self {
        Self {
            id,
            title,
            description,
            reminder,
            image,
            status,
        }
    }

    /// Builds the todo that was stored from a `NewTodo` and its assigned ID.
    pub fn from_new(id: ObjectId, new_todo: NewTodo) -> Self {
        Self::new(
            id,
            new_todo.title,
            new_todo.description,
            new_todo.reminder,
            new_todo.image,
            new_todo.status,
        )
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reminder(&self) -> &DateTime<Utc> {
        &self.reminder
    }

    /// Returns the image as base64 text.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn status(&self) -> bool {
        self.status
    }
}

/// A todo ready to be inserted, with every field already in stored form.
#[derive(Debug, PartialEq, Clone)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub reminder: DateTime<Utc>,
    pub image: Option<String>,
    pub status: bool,
}

/// Raw arguments of the add operation, as sent by the client.
#[derive(Debug, Clone)]
pub struct AddTodoInput {
    pub title: String,
    pub description: String,
    pub reminder: String,
    pub image: Option<String>,
    pub status: bool,
}

/// Fields to overwrite on an existing todo. `None` leaves a field untouched.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Result of an edit. Title and description are the values the caller supplied.
#[derive(Debug, PartialEq, Clone)]
pub struct EditedTodo {
    pub id: ObjectId,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CompletedTodo {
    pub id: ObjectId,
    pub status: bool,
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    #[error("Invalid reminder '{0}', expected DD/MM/YYYY HH:MM")]
    InvalidReminder(String, #[source] chrono::ParseError),
    #[error("Invalid image payload: {0}")]
    InvalidImage(#[from] base64::DecodeError),
    #[error("Invalid todo ID '{0}'")]
    InvalidId(String),
    #[error("Todo {0} not found")]
    NotFound(ObjectId),
    #[error("Todo {0} not found or not edited")]
    NotFoundOrUnchanged(ObjectId),
    #[error("Todo {0} not found or already completed")]
    NotFoundOrAlreadyComplete(ObjectId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Storage accessor for the todo collection.
///
/// Update and delete operations report how many documents they changed so the
/// service can tell a missing or unchanged todo apart from a successful write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStore {
    /// Returns every todo in storage order.
    async fn find_all(&self) -> Result<Vec<Todo>, StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Todo>, StoreError>;

    /// Inserts a todo and returns the ID storage assigned to it.
    async fn insert(&self, todo: &NewTodo) -> Result<ObjectId, StoreError>;

    /// Sets the fields present in `patch`. Returns the number of modified documents.
    async fn update_fields(&self, id: ObjectId, patch: &TodoPatch) -> Result<u64, StoreError>;

    /// Sets `status` to true. Returns the number of modified documents.
    async fn mark_complete(&self, id: ObjectId) -> Result<u64, StoreError>;

    /// Returns the number of deleted documents.
    async fn delete(&self, id: ObjectId) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore + Send + Sync>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Retrieves all todos.
    #[tracing::instrument(skip(self))]
    pub async fn list_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self.store.find_all().await?;
        tracing::debug!("Loaded {} todos", todos.len());
        Ok(todos)
    }

    /// Creates a new todo.
    ///
    /// # Arguments
    ///
    /// * `request` - The client-supplied fields. The reminder must be
    ///   `DD/MM/YYYY HH:MM`, the image, when given, a data-URL.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Todo` with its generated ID, or an error otherwise.
    #[tracing::instrument(skip(self, request), fields(title = %request.title))]
    pub async fn add_todo(&self, request: AddTodoInput) -> Result<Todo, TodoServiceError> {
        let image = match request.image.as_deref() {
            Some(data_url) => input::decode_data_url(data_url)?,
            None => None,
        };
        let reminder = input::parse_reminder(&request.reminder)
            .map_err(|err| TodoServiceError::InvalidReminder(request.reminder.clone(), err))?;

        let new_todo = NewTodo {
            title: request.title,
            description: request.description,
            reminder,
            image,
            status: request.status,
        };
        let id = self.store.insert(&new_todo).await?;
        tracing::info!("Created todo {}", id);
        Ok(Todo::from_new(id, new_todo))
    }

    /// Edits the title and/or description of a todo.
    ///
    /// With an empty patch nothing is written and the current title and
    /// description are returned. Otherwise the supplied values are echoed back
    /// once exactly one document was modified.
    #[tracing::instrument(skip(self))]
    pub async fn edit_todo(&self, id: &str, patch: TodoPatch) -> Result<EditedTodo, TodoServiceError> {
        let id = parse_id(id)?;

        if patch.is_empty() {
            let existing = self
                .store
                .find_by_id(id)
                .await?
                .ok_or(TodoServiceError::NotFound(id))?;
            return Ok(EditedTodo {
                id,
                title: Some(existing.title),
                description: Some(existing.description),
            });
        }

        let modified = self.store.update_fields(id, &patch).await?;
        if modified != 1 {
            tracing::warn!("Todo {} was not edited", id);
            return Err(TodoServiceError::NotFoundOrUnchanged(id));
        }

        Ok(EditedTodo {
            id,
            title: patch.title,
            description: patch.description,
        })
    }

    /// Marks a todo as completed. Completing an already completed todo fails.
    #[tracing::instrument(skip(self))]
    pub async fn complete_todo(&self, id: &str) -> Result<CompletedTodo, TodoServiceError> {
        let id = parse_id(id)?;
        let modified = self.store.mark_complete(id).await?;
        if modified != 1 {
            tracing::warn!("Todo {} was not completed", id);
            return Err(TodoServiceError::NotFoundOrAlreadyComplete(id));
        }
        Ok(CompletedTodo { id, status: true })
    }

    /// Deletes a todo by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&self, id: &str) -> Result<(), TodoServiceError> {
        let id = parse_id(id)?;
        let deleted = self.store.delete(id).await?;
        if deleted != 1 {
            tracing::warn!("Todo {} was not deleted", id);
            return Err(TodoServiceError::NotFound(id));
        }
        tracing::info!("Deleted todo {}", id);
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<ObjectId, TodoServiceError> {
    ObjectId::parse_str(id).map_err(|_| TodoServiceError::InvalidId(id.to_string()))
}
