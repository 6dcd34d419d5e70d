//! Document backend over the MongoDB driver.
//!
//! Documents are stored flat as
//! `{service, team, round, flagid, description, timestamp}`. Timestamps are
//! BSON dates and therefore carry millisecond precision.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};

use crate::catalog::{FlagRecord, RecordKey};

use super::errors::{Result, StoreError};
use super::{RecordFilter, RecordStore};

/// Record store backed by one MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Build a client for `uri`. No round trip happens here; the driver
    /// connects lazily.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        selection_timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(selection_timeout);
        options.app_name = Some("flagsync".to_string());

        let client = Client::with_options(options)?;
        let collection = client.database(database).collection::<Document>(collection);

        Ok(Self {
            client,
            database: database.to_string(),
            collection,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Round trip to the server.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    pub async fn close(self) {
        self.client.shutdown().await;
    }
}

fn key_filter(key: &RecordKey) -> Document {
    doc! {
        "service": key.service.as_str(),
        "team": key.team,
        "round": key.round,
        "flagid": key.flagid.as_str(),
    }
}

fn query_filter(filter: &RecordFilter) -> Document {
    let mut query = Document::new();
    if let Some(service) = &filter.service {
        query.insert("service", service.as_str());
    }
    if let Some(team) = filter.team {
        query.insert("team", team);
    }
    if let Some(round) = filter.round {
        query.insert("round", round);
    }
    query
}

pub(crate) fn to_document(record: &FlagRecord) -> Document {
    doc! {
        "service": record.service.as_str(),
        "team": record.team,
        "round": record.round,
        "flagid": record.flagid.as_str(),
        "description": record.description.as_str(),
        "timestamp": bson::DateTime::from_millis(record.timestamp.timestamp_millis()),
    }
}

fn read_str(doc: &Document, field: &str) -> Result<String> {
    doc.get_str(field)
        .map(str::to_string)
        .map_err(|e| StoreError::corrupt(format!("field {field:?}: {e}")))
}

/// Integers written by other tools may come back as int32 or double.
fn read_int(doc: &Document, field: &str) -> Result<i64> {
    match doc.get(field) {
        Some(Bson::Int32(v)) => Ok(i64::from(*v)),
        Some(Bson::Int64(v)) => Ok(*v),
        Some(Bson::Double(v)) if v.fract() == 0.0 => Ok(*v as i64),
        Some(other) => Err(StoreError::corrupt(format!(
            "field {field:?}: expected an integer, found {other}"
        ))),
        None => Err(StoreError::corrupt(format!("field {field:?} is missing"))),
    }
}

pub(crate) fn from_document(doc: &Document) -> Result<FlagRecord> {
    let millis = doc
        .get_datetime("timestamp")
        .map_err(|e| StoreError::corrupt(format!("field \"timestamp\": {e}")))?
        .timestamp_millis();
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::corrupt(format!("timestamp {millis} out of range")))?;

    Ok(FlagRecord {
        service: read_str(doc, "service")?,
        team: read_int(doc, "team")?,
        round: read_int(doc, "round")?,
        flagid: read_str(doc, "flagid")?,
        description: read_str(doc, "description")?,
        timestamp,
    })
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn delete_matching(&self, key: &RecordKey) -> Result<u64> {
        let result = self.collection.delete_many(key_filter(key)).await?;
        Ok(result.deleted_count)
    }

    async fn insert_many(&self, records: &[FlagRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let docs: Vec<Document> = records.iter().map(to_document).collect();
        let result = self.collection.insert_many(docs).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<FlagRecord>> {
        let mut cursor = self
            .collection
            .find(query_filter(filter))
            .sort(doc! { "service": 1, "team": 1, "round": 1, "description": 1 })
            .await?;

        let mut records = Vec::new();
        while cursor.advance().await? {
            let doc = cursor.deserialize_current()?;
            records.push(from_document(&doc)?);
        }
        Ok(records)
    }
}
