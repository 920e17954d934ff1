// src/db.rs
use async_trait::async_trait;
use log::{error, info};
use scylla::{query::Query, Session, SessionBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::new_id;

pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Key the store attaches to every document it holds.
pub const STORE_ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Stocks,
    Portfolios,
    Trades,
    Alerts,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Stocks,
        Collection::Portfolios,
        Collection::Trades,
        Collection::Alerts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Stocks => "stocks",
            Collection::Portfolios => "portfolios",
            Collection::Trades => "trades",
            Collection::Alerts => "alerts",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, Value),
    Ne(String, Value),
}

/// Field-level predicate over a document. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Ne(field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => doc.get(field) == Some(value),
            Clause::Ne(field, value) => doc.get(field) != Some(value),
        })
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Filter, limit: usize)
        -> StoreResult<Vec<Value>>;

    async fn insert_many(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> StoreResult<Option<Value>> {
        Ok(self.find(collection, filter, 1).await?.into_iter().next())
    }

    async fn insert_one(&self, collection: Collection, doc: Value) -> StoreResult<()> {
        self.insert_many(collection, vec![doc]).await
    }
}

fn with_store_id(mut doc: Value) -> StoreResult<(String, Value)> {
    let map = doc
        .as_object_mut()
        .ok_or("Only JSON objects can be stored")?;
    let id = match map.get(STORE_ID_FIELD).and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = new_id();
            map.insert(STORE_ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
    };
    Ok((id, doc))
}

pub async fn find_as<T: DeserializeOwned>(
    store: &dyn Store,
    collection: Collection,
    filter: &Filter,
    limit: usize,
) -> StoreResult<Vec<T>> {
    let docs = store.find(collection, filter, limit).await?;
    let mut items = Vec::with_capacity(docs.len());
    for doc in docs {
        // Deserializing into the model drops the store-native id.
        items.push(serde_json::from_value(doc)?);
    }
    Ok(items)
}

pub async fn find_one_as<T: DeserializeOwned>(
    store: &dyn Store,
    collection: Collection,
    filter: &Filter,
) -> StoreResult<Option<T>> {
    match store.find_one(collection, filter).await? {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}

pub async fn insert_all<T: Serialize>(
    store: &dyn Store,
    collection: Collection,
    items: &[T],
) -> StoreResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    let mut docs = Vec::with_capacity(items.len());
    for item in items {
        docs.push(serde_json::to_value(item)?);
    }
    store.insert_many(collection, docs).await
}

/// Document tables on Scylla: each collection is `(id TEXT PRIMARY KEY, doc TEXT)`
/// with the document held as JSON text.
pub struct ScyllaStore {
    session: Session,
    keyspace: String,
}

impl ScyllaStore {
    pub async fn connect(uri: &str, keyspace: &str) -> StoreResult<Self> {
        let session = SessionBuilder::new().known_node(uri).build().await?;

        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await?;
        for collection in Collection::ALL {
            session
                .query(
                    format!(
                        "CREATE TABLE IF NOT EXISTS {}.{} (id TEXT PRIMARY KEY, doc TEXT)",
                        keyspace,
                        collection.name()
                    ),
                    &[],
                )
                .await?;
        }

        info!("Successfully connected to ScyllaDB at {}.", uri);
        Ok(ScyllaStore {
            session,
            keyspace: keyspace.to_string(),
        })
    }

    fn table(&self, collection: Collection) -> String {
        format!("{}.{}", self.keyspace, collection.name())
    }

    async fn scan(&self, collection: Collection) -> StoreResult<Vec<(String, Value)>> {
        let query = Query::new(format!("SELECT id, doc FROM {}", self.table(collection)));
        let result = self.session.query(query, &[]).await?;

        let mut docs = Vec::new();
        for row in result.rows.unwrap_or_default() {
            let id = row
                .columns
                .get(0)
                .and_then(|col| col.as_ref())
                .and_then(|v| v.as_text())
                .cloned();
            let doc = row
                .columns
                .get(1)
                .and_then(|col| col.as_ref())
                .and_then(|v| v.as_text())
                .cloned();
            match (id, doc) {
                (Some(id), Some(doc)) => docs.push((id, serde_json::from_str(&doc)?)),
                (id, doc) => error!(
                    "Missing data in {} row: id = {:?}, doc = {:?}",
                    collection.name(),
                    id,
                    doc
                ),
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl Store for ScyllaStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: usize,
    ) -> StoreResult<Vec<Value>> {
        Ok(self
            .scan(collection)
            .await?
            .into_iter()
            .map(|(_, doc)| doc)
            .filter(|doc| filter.matches(doc))
            .take(limit)
            .collect())
    }

    async fn insert_many(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()> {
        let query = Query::new(format!(
            "INSERT INTO {} (id, doc) VALUES (?, ?)",
            self.table(collection)
        ));
        for doc in docs {
            let (id, doc) = with_store_id(doc)?;
            let text = serde_json::to_string(&doc)?;
            self.session.query(query.clone(), (id, text)).await?;
        }
        Ok(())
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let matching: Vec<String> = self
            .scan(collection)
            .await?
            .into_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id)
            .collect();

        if filter.is_empty() {
            self.session
                .query(format!("TRUNCATE {}", self.table(collection)), &[])
                .await?;
        } else {
            let query = Query::new(format!("DELETE FROM {} WHERE id = ?", self.table(collection)));
            for id in &matching {
                self.session.query(query.clone(), (id.as_str(),)).await?;
            }
        }
        Ok(matching.len() as u64)
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        Ok(self
            .scan(collection)
            .await?
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .count() as u64)
    }
}

/// In-process backend. Holds documents in insertion order per collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: usize,
    ) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_many(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()> {
        let mut stored = Vec::with_capacity(docs.len());
        for doc in docs {
            stored.push(with_store_id(doc)?.1);
        }
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .extend(stored);
        Ok(())
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }
}
