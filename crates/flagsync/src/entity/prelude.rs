//! Common re-exports for convenient entity usage.

pub use super::flag_id::{
    ActiveModel as FlagIdActiveModel, Column as FlagIdColumn, Entity as FlagId,
    Model as FlagIdModel,
};
