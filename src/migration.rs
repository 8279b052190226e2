use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use sqlx::SqlitePool;

/// Runs every `NNN_name.sql` file in `dir` in numeric order.
///
/// Statements must be idempotent; every file runs on every start.
pub async fn migrate(p: &SqlitePool, dir: impl AsRef<Path>) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    let mut migration_files: Vec<(usize, PathBuf)> = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading migrations from {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;

        if !entry.metadata()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        let file_name = entry.file_name();
        let file_name = file_name
            .to_str()
            .ok_or_else(|| anyhow!("non utf-8 migration name: {}", path.display()))?;
        let migration_number: usize = file_name
            .get(..3)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| anyhow!("migration '{file_name}' must start with a 3 digit number"))?;

        migration_files.push((migration_number, path))
    }

    migration_files.sort_by_key(|v| v.0);

    log::info!("starting migration ({} files)", migration_files.len());
    for (_, path) in &migration_files {
        let content = fs::read_to_string(path)?;
        log::debug!("migrating {}", path.display());
        sqlx::raw_sql(&content)
            .execute(p)
            .await
            .with_context(|| format!("applying {}", path.display()))?;
    }

    log::info!("migration end");
    Ok(())
}
