use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_PORT: u16 = 8080;
pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 1000;

#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub api_port: u16,
    pub paths: ForumPaths,
    pub pagination: PaginationConfig,
}

impl ForumConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("FORUM_BASE_DIR") {
            Ok(raw) if !raw.trim().is_empty() => ForumPaths::from_base_dir(raw.trim())?,
            _ => ForumPaths::discover()?,
        };
        let api_port = env::var("FORUM_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_API_PORT);
        let pagination = PaginationConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            pagination,
        })
    }

    pub fn new(api_port: u16, paths: ForumPaths, pagination: PaginationConfig) -> Self {
        Self {
            api_port,
            paths,
            pagination,
        }
    }
}

/// Page size used by topic listing.
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig {
    pub per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PaginationConfig {
    /// Zero falls back to the default; anything above `MAX_PER_PAGE` is capped.
    pub fn new(per_page: usize) -> Self {
        if per_page == 0 {
            return Self::default();
        }
        Self {
            per_page: per_page.min(MAX_PER_PAGE),
        }
    }

    pub fn from_env() -> Self {
        let per_page = env::var("FORUM_PER_PAGE")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PER_PAGE);
        Self::new(per_page)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ForumPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl ForumPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("forum.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}
