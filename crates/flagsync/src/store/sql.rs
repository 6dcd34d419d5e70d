//! Relational backend over SeaORM (SQLite, PostgreSQL).

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select,
};

use crate::catalog::{FlagRecord, RecordKey};
use crate::entity::flag_id::{ActiveModel, Column, Entity as FlagId};

use super::errors::Result;
use super::{RecordFilter, RecordStore};

/// Maximum rows per INSERT statement.
pub const INSERT_CHUNK_SIZE: usize = 500;

/// Record store backed by the `flagids` table.
#[derive(Debug, Clone)]
///
/// Clones share one connection pool.
pub struct SqlStore {
    db: Arc<DatabaseConnection>,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Connect, apply SQLite pragmas and run pending migrations.
    ///
    /// Without the `migrate` feature the schema must already exist.
    pub async fn connect(uri: &str) -> Result<Self> {
        #[cfg(feature = "migrate")]
        let db = crate::db::connect_and_migrate(uri).await?;
        #[cfg(not(feature = "migrate"))]
        let db = crate::db::connect(uri).await?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }

    /// Close the pool once the last clone is released.
    pub async fn close(self) -> Result<()> {
        if let Ok(db) = Arc::try_unwrap(self.db) {
            db.close().await?;
        }
        Ok(())
    }
}

fn apply_filter(mut query: Select<FlagId>, filter: &RecordFilter) -> Select<FlagId> {
    if let Some(service) = &filter.service {
        query = query.filter(Column::Service.eq(service.as_str()));
    }
    if let Some(team) = filter.team {
        query = query.filter(Column::Team.eq(team));
    }
    if let Some(round) = filter.round {
        query = query.filter(Column::Round.eq(round));
    }
    query
}

#[async_trait]
impl RecordStore for SqlStore {
    async fn delete_matching(&self, key: &RecordKey) -> Result<u64> {
        let result = FlagId::delete_many()
            .filter(Column::Service.eq(key.service.as_str()))
            .filter(Column::Team.eq(key.team))
            .filter(Column::Round.eq(key.round))
            .filter(Column::Flagid.eq(key.flagid.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn insert_many(&self, records: &[FlagRecord]) -> Result<u64> {
        let mut inserted = 0u64;
        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let models: Vec<ActiveModel> = chunk.iter().map(ActiveModel::from_record).collect();
            inserted += FlagId::insert_many(models)
                .exec_without_returning(self.db.as_ref())
                .await?;
        }
        Ok(inserted)
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<FlagRecord>> {
        let models = apply_filter(FlagId::find(), filter)
            .order_by_asc(Column::Service)
            .order_by_asc(Column::Team)
            .order_by_asc(Column::Round)
            .order_by_asc(Column::Description)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(FlagRecord::from).collect())
    }
}
