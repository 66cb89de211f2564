use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use log::debug;
use std::env;
use std::path::PathBuf;

/// Environment variable holding the path of the task database.
pub const DATABASE_VAR: &str = "TASKMAN_DATABASE";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_file: PathBuf,
}

impl Config {
    /// Read the configuration from the environment (and `.env`), falling
    /// back to the platform data directory.
    pub fn load() -> Result<Config> {
        dotenv::dotenv().ok();
        let database_file = match env::var_os(DATABASE_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_database_file()?
                .ok_or_else(|| anyhow!("Failed to find a location for the task database."))?,
        };
        debug!("using database {}", database_file.display());
        Ok(Config { database_file })
    }
}

fn default_database_file() -> Result<Option<PathBuf>> {
    if let Some(base_dirs) = ProjectDirs::from("com", "taskman", "taskman") {
        let root_dir = base_dirs.data_dir();
        if !root_dir.exists() {
            std::fs::create_dir_all(root_dir)
                .with_context(|| format!("Failed to create directory {}.", root_dir.display()))?;
        }
        let mut path = PathBuf::from(root_dir);
        path.push("tasks.sqlite");
        Ok(Some(path))
    } else {
        Ok(None)
    }
}
