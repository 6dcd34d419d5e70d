//! Initial migration creating the flag identifier table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flagids::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Flagids::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Flagids::Service).string().not_null())
                    .col(ColumnDef::new(Flagids::Team).big_integer().not_null())
                    .col(ColumnDef::new(Flagids::Round).big_integer().not_null())
                    .col(ColumnDef::new(Flagids::Flagid).string().not_null())
                    .col(ColumnDef::new(Flagids::Description).text().not_null())
                    .col(
                        ColumnDef::new(Flagids::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index for delete-by-key. Not unique: a cycle interrupted
        // between delete and insert may leave duplicates behind.
        manager
            .create_index(
                Index::create()
                    .name("idx_flagids_key")
                    .table(Flagids::Table)
                    .col(Flagids::Service)
                    .col(Flagids::Team)
                    .col(Flagids::Round)
                    .col(Flagids::Flagid)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Flagids::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Flagids {
    Table,
    Id,
    Service,
    Team,
    Round,
    Flagid,
    Description,
    Timestamp,
}
