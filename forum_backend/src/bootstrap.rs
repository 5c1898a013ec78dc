use crate::config::ForumConfig;
use crate::database::Database;
use anyhow::{Context, Result};
use std::fs;

pub struct BootstrapResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
}

pub fn initialize(config: &ForumConfig) -> Result<BootstrapResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;
    create_dir_if_missing(&config.paths.logs_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    tracing::info!(
        directories_created = ?directories_created,
        database_initialized,
        db_path = %config.paths.db_path.display(),
        "forum storage ready"
    );

    Ok(BootstrapResources {
        directories_created,
        database_initialized,
        database,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        created.push(path.display().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForumPaths, PaginationConfig};
    use tempfile::tempdir;

    #[test]
    fn creates_layout_once() {
        let dir = tempdir().unwrap();
        let config = ForumConfig::new(
            0,
            ForumPaths::from_base_dir(dir.path()).unwrap(),
            PaginationConfig::default(),
        );

        let first = initialize(&config).unwrap();
        assert!(first.database_initialized);
        assert_eq!(first.directories_created.len(), 2);
        assert!(config.paths.db_path.exists());
        drop(first);

        let second = initialize(&config).unwrap();
        assert!(!second.database_initialized);
        assert!(second.directories_created.is_empty());
    }
}
