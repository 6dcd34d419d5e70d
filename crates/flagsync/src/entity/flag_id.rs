//! FlagId entity - one published flag identifier for a (service, team, round).

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::FlagRecord;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flagids")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Key ─────────────────────────────────────────────────────────────────
    pub service: String,
    pub team: i64,
    pub round: i64,
    pub flagid: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// When the cycle that wrote this row began flattening.
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for FlagRecord {
    fn from(model: Model) -> Self {
        FlagRecord {
            service: model.service,
            team: model.team,
            round: model.round,
            flagid: model.flagid,
            description: model.description,
            timestamp: model.timestamp.with_timezone(&Utc),
        }
    }
}

impl ActiveModel {
    /// Build an insertable row with a fresh id.
    pub fn from_record(record: &FlagRecord) -> Self {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            service: Set(record.service.clone()),
            team: Set(record.team),
            round: Set(record.round),
            flagid: Set(record.flagid.clone()),
            description: Set(record.description.clone()),
            timestamp: Set(record.timestamp.fixed_offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record() -> FlagRecord {
        FlagRecord {
            service: "svc1".to_string(),
            team: 1,
            round: 20,
            flagid: "NEW".to_string(),
            description: "user".to_string(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn active_model_carries_record_fields() {
        let am = ActiveModel::from_record(&record());

        assert_eq!(am.service, Set("svc1".to_string()));
        assert_eq!(am.team, Set(1));
        assert_eq!(am.round, Set(20));
        assert_eq!(am.flagid, Set("NEW".to_string()));
        assert_eq!(am.description, Set("user".to_string()));
        assert_eq!(
            am.timestamp,
            Set(record().timestamp.fixed_offset())
        );
    }

    #[test]
    fn active_models_get_distinct_ids() {
        let a = ActiveModel::from_record(&record());
        let b = ActiveModel::from_record(&record());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn model_converts_back_to_record() {
        let original = record();
        let model = Model {
            id: Uuid::new_v4(),
            service: original.service.clone(),
            team: original.team,
            round: original.round,
            flagid: original.flagid.clone(),
            description: original.description.clone(),
            timestamp: original.timestamp.fixed_offset(),
        };

        assert_eq!(FlagRecord::from(model), original);
    }
}
