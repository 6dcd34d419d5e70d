use flagsync::db;
use flagsync::migration::{Migrator, MigratorTrait};
use flagsync::Backend;

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    store_uri: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if Backend::from_uri(store_uri)? != Backend::Sql {
        return Err(format!(
            "migrations only apply to SQL stores; {} needs no schema",
            Backend::Mongo
        )
        .into());
    }

    let db = db::connect(store_uri).await?;

    match action {
        MigrateAction::Up => {
            println!("Applying migrations...");
            Migrator::up(&db, None).await?;
            println!("Migrations applied successfully.");
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("Rollback complete.");
        }
        MigrateAction::Status => {
            println!("Migration status:");
            Migrator::status(&db).await?;
        }
        MigrateAction::Fresh => {
            println!("Dropping all tables and reapplying migrations...");
            Migrator::fresh(&db).await?;
            println!("Fresh migration complete.");
        }
    }

    db.close().await?;
    Ok(())
}
