//! Document store adapter (MongoDB)
//!
//! Catalog records are flat documents in a single collection. Ids are
//! assigned by the store on insert; callers that need them reload the
//! corpus afterwards (insert-then-reload). Every operation is a single
//! round trip, there are no transactions.

use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::config::DocumentStoreConfig;
use crate::errors::{AppError, Result, StoreKind};
use crate::models::{Game, GameRecord};
use crate::CATALOG_COLLECTION;

/// Internal document shape: store-assigned id plus the flat record
#[derive(Debug, Serialize, Deserialize)]
struct GameDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,

    #[serde(flatten)]
    record: GameRecord,
}

impl GameDocument {
    fn into_game(self) -> Result<Game> {
        let id = self
            .id
            .ok_or_else(|| AppError::MalformedRecord("document without _id".to_string()))?;
        Ok(Game {
            id: id.to_hex(),
            record: self.record,
        })
    }
}

/// Document store handle, opened once and shared by all pipeline tasks
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
    db: Database,
    games: Collection<GameDocument>,
}

impl DocumentStore {
    /// Connect and verify the server is reachable
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self> {
        info!("Connecting to document store...");

        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            AppError::Connection {
                store: StoreKind::Document,
                message: e.to_string(),
            }
        })?;
        options.connect_timeout = Some(std::time::Duration::from_secs(
            config.connect_timeout_secs,
        ));

        let client = Client::with_options(options).map_err(|e| AppError::Connection {
            store: StoreKind::Document,
            message: e.to_string(),
        })?;
        let db = client.database(&config.database);

        // A failed ping surfaces unreachable servers at startup instead of
        // on the first insert
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Connection {
                store: StoreKind::Document,
                message: e.to_string(),
            })?;

        let games = db.collection::<GameDocument>(CATALOG_COLLECTION);

        info!(database = %config.database, "Document store connected");

        Ok(Self { client, db, games })
    }

    /// Drop every collection in the database; re-running the pipeline is
    /// destroy-then-rebuild, never merge
    pub async fn clear(&self) -> Result<()> {
        let names = self.db.list_collection_names().await?;
        for name in names {
            debug!(collection = %name, "Dropping collection");
            self.db.collection::<Document>(&name).drop().await?;
        }
        Ok(())
    }

    /// Insert one catalog record, returning the store-assigned id in hex form
    pub async fn insert_game(&self, record: &GameRecord) -> Result<String> {
        record.validate()?;

        let inserted = self
            .games
            .insert_one(GameDocument {
                id: None,
                record: record.clone(),
            })
            .await?;

        inserted
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| AppError::MalformedRecord("insert returned a non-ObjectId".to_string()))
    }

    /// Reload the whole corpus with stringified ids
    pub async fn get_all_games(&self) -> Result<Vec<Game>> {
        let documents: Vec<GameDocument> = self.games.find(doc! {}).await?.try_collect().await?;
        documents.into_iter().map(GameDocument::into_game).collect()
    }

    /// Find one record by its hex id
    pub async fn get_game_by_id(&self, id: &str) -> Result<Option<Game>> {
        let oid = ObjectId::parse_str(id)
            .map_err(|e| AppError::MalformedRecord(format!("invalid id {id:?}: {e}")))?;
        let found = self.games.find_one(doc! { "_id": oid }).await?;
        found.map(GameDocument::into_game).transpose()
    }

    /// Case-insensitive name search, capped at `limit` records
    pub async fn search_games(&self, pattern: &str, limit: i64) -> Result<Vec<Game>> {
        let filter = doc! { "name": { "$regex": pattern, "$options": "i" } };
        let documents: Vec<GameDocument> = self
            .games
            .find(filter)
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(GameDocument::into_game).collect()
    }

    /// First `n` records in natural order, used for demo sampling
    pub async fn get_random_games(&self, n: i64) -> Result<Vec<Game>> {
        let documents: Vec<GameDocument> = self
            .games
            .find(doc! {})
            .limit(n)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(GameDocument::into_game).collect()
    }

    /// Shut the client down, closing its connections
    pub async fn close(self) {
        self.client.shutdown().await;
        info!("Document store connection closed");
    }
}
