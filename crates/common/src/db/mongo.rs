//! MongoDB client and typed collection wrapper

use bson::{doc, oid::ObjectId, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::config::DocumentStoreConfig;
use crate::errors::{AppError, Result, StoreKind};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify connectivity
    pub async fn new(config: &DocumentStoreConfig) -> Result<Self> {
        info!("Connecting to MongoDB...");

        // Bound server selection so an unreachable MongoDB fails fast
        let timeout = config.timeout_ms;
        let timeout_uri = if config.uri.contains('?') {
            format!(
                "{}&serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                config.uri, timeout, timeout
            )
        } else {
            format!(
                "{}?serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                config.uri, timeout, timeout
            )
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| AppError::Connection {
                message: format!("Failed to connect to MongoDB: {}", e),
            })?;

        client
            .database(&config.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Connection {
                message: format!("MongoDB ping failed: {}", e),
            })?;

        info!("Connected to MongoDB database '{}'", config.db_name);

        Ok(Self {
            client,
            db_name: config.db_name.clone(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection handle and apply schema indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document and return its generated id
    pub async fn insert_one(&self, item: &T) -> Result<ObjectId> {
        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::dependency(StoreKind::Content, "Failed to get inserted id"))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Find failed: {}", e)))
    }

    /// Point update of a single document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Update failed: {}", e)))
    }

    /// Point delete of a single document
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Delete failed: {}", e)))
    }

    /// Run an aggregation pipeline and collect the raw result documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        use futures::TryStreamExt;

        let cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Aggregation failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| AppError::dependency(StoreKind::Content, format!("Aggregation cursor failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
