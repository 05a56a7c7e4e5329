use anyhow::Context;

use crate::cli::utils::{load_config, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    db.migrate().await.context("migration failed")?;
    db.close().await;

    output_success(output_format, "Migrations applied", None)
}
