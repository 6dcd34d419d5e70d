use clap::ValueEnum;
use flagsync::{AnyStore, FlagRecord, RecordFilter, RecordStore};

use crate::config::Config;

/// Output format for stored records.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// One stored flag identifier for display.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, tabled::Tabled)]
pub(crate) struct FlagRow {
    #[tabled(rename = "Service")]
    pub service: String,
    #[tabled(rename = "Team")]
    pub team: i64,
    #[tabled(rename = "Round")]
    pub round: i64,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Flag ID")]
    pub flagid: String,
    #[tabled(rename = "Synced At")]
    pub timestamp: String,
}

impl From<FlagRecord> for FlagRow {
    fn from(record: FlagRecord) -> Self {
        Self {
            service: record.service,
            team: record.team,
            round: record.round,
            description: record.description,
            flagid: record.flagid,
            timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

fn render(rows: Vec<FlagRow>, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table if rows.is_empty() => Ok("No flag identifiers stored.".to_string()),
        OutputFormat::Table => {
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            Ok(table.to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(&rows),
    }
}

/// Print stored records matching `filter`.
pub(crate) async fn handle_list(
    config: &Config,
    filter: RecordFilter,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = AnyStore::open(&config.store_options()).await?;
    let records = store.find(&filter).await;
    store.close().await?;

    let rows: Vec<FlagRow> = records?.into_iter().map(FlagRow::from).collect();
    println!("{}", render(rows, format)?);
    Ok(())
}
