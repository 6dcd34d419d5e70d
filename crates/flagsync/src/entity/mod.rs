//! SeaORM entity definitions for the SQL store.

pub mod flag_id;
pub mod prelude;
