//! MongoDB implementation of the todo storage accessor.
//!
//! Documents in the collection have the shape
//! `{ _id, title, description, reminder, image, status }` where `reminder` is a
//! BSON datetime and `image` is base64 text or null.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::{Client, Collection};

use super::input;
use super::{NewTodo, Todo, TodoPatch, TodoStore};
use crate::config::Config;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Represents a connection or query failure reported by the driver.
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    /// Represents a stored document that cannot be read as a todo.
    #[error("Malformed todo document: {0}")]
    MalformedDocument(String),
}

/// Handle to the todo collection. Cloning shares the underlying client.
#[derive(Clone, Debug)]
pub struct MongoTodoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoTodoStore {
    /// Creates a client for the configured deployment.
    ///
    /// The driver connects lazily, so this only fails on an unusable
    /// connection string. Use [`MongoTodoStore::ping`] to check reachability.
    #[tracing::instrument(skip(config))]
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        Ok(Self::new(
            client,
            &config.database_name,
            &config.collection_name,
        ))
    }

    pub fn new(client: Client, database_name: &str, collection_name: &str) -> Self {
        let collection = client
            .database(database_name)
            .collection::<Document>(collection_name);
        Self { client, collection }
    }

    /// Sends a `ping` command to the deployment.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    /// Closes the client, waiting for in-flight operations to finish.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        let documents: Vec<Document> = self.collection.find(doc! {}).await?.try_collect().await?;
        documents.into_iter().map(Todo::try_from).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Todo>, StoreError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .map(Todo::try_from)
            .transpose()
    }

    #[tracing::instrument(skip(self, todo))]
    async fn insert(&self, todo: &NewTodo) -> Result<ObjectId, StoreError> {
        let result = self.collection.insert_one(new_todo_document(todo)).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::MalformedDocument(format!(
                "inserted ID {} is not an ObjectId",
                result.inserted_id
            ))
        })
    }

    #[tracing::instrument(skip(self))]
    async fn update_fields(&self, id: ObjectId, patch: &TodoPatch) -> Result<u64, StoreError> {
        let mut fields = Document::new();
        if let Some(title) = &patch.title {
            fields.insert("title", title.as_str());
        }
        if let Some(description) = &patch.description {
            fields.insert("description", description.as_str());
        }

        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await?;
        Ok(result.modified_count)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_complete(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "status": true } })
            .await?;
        Ok(result.modified_count)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count)
    }
}

fn new_todo_document(todo: &NewTodo) -> Document {
    doc! {
        "title": todo.title.as_str(),
        "description": todo.description.as_str(),
        "reminder": bson::DateTime::from_millis(todo.reminder.timestamp_millis()),
        "image": todo.image.as_deref(),
        "status": todo.status,
    }
}

impl TryFrom<Document> for Todo {
    type Error = StoreError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        let malformed = |field: &str, reason: String| {
            StoreError::MalformedDocument(format!("field '{}': {}", field, reason))
        };

        let id = document
            .get_object_id("_id")
            .map_err(|err| malformed("_id", err.to_string()))?;
        let title = document
            .get_str("title")
            .map_err(|err| malformed("title", err.to_string()))?;
        let description = document
            .get_str("description")
            .map_err(|err| malformed("description", err.to_string()))?;
        let status = document
            .get_bool("status")
            .map_err(|err| malformed("status", err.to_string()))?;

        let reminder = match document.get("reminder") {
            Some(Bson::DateTime(stored)) => DateTime::<Utc>::from_timestamp_millis(stored.timestamp_millis())
                .ok_or_else(|| malformed("reminder", format!("{} is out of range", stored)))?,
            Some(Bson::String(stored)) => input::parse_stored_reminder(stored)
                .ok_or_else(|| malformed("reminder", format!("cannot parse '{}'", stored)))?,
            other => return Err(malformed("reminder", format!("unexpected value {:?}", other))),
        };

        // Older documents may hold raw image bytes instead of base64 text.
        let image = match document.get("image") {
            None | Some(Bson::Null) => None,
            Some(Bson::String(text)) if text.is_empty() => None,
            Some(Bson::String(text)) => Some(text.clone()),
            Some(Bson::Binary(binary)) if binary.bytes.is_empty() => None,
            Some(Bson::Binary(binary)) => Some(input::encode_image(&binary.bytes)),
            Some(other) => return Err(malformed("image", format!("unexpected value {:?}", other))),
        };

        Ok(Todo::new(
            id,
            title.to_string(),
            description.to_string(),
            reminder,
            image,
            status,
        ))
    }
}
