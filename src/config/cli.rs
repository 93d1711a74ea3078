use crate::config::{EngineKind, StoreConfig};
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "small-kv")]
#[command(about = "Console client for a sorted key-value store")]
pub struct CliConfig {
    /// Directory holding the table files [default: data]
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Storage engine [default: lsm]
    #[arg(long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Memtable size in bytes that triggers a flush to disk
    #[arg(long)]
    pub flush_threshold: Option<usize>,

    /// Compact all tables when the store is closed
    #[arg(long)]
    pub compact_on_close: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the TOML file if one was given, then lets flags override it.
    pub fn resolve(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_file(path)?,
            None => StoreConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut StoreConfig) {
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if let Some(engine) = self.engine {
            config.storage.engine = engine;
        }
        if let Some(threshold) = self.flush_threshold {
            config.storage.flush_threshold_bytes = threshold;
        }
        if self.compact_on_close {
            config.storage.compact_on_close = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_flags() {
        let cli = CliConfig::parse_from(["small-kv"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"from-file\"\nengine = \"memory\"\nflush_threshold_bytes = 2048\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from([
            "small-kv",
            "--config",
            path.as_str(),
            "--engine",
            "lsm",
            "--compact-on-close",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.storage.data_dir, "from-file");
        assert_eq!(config.storage.engine, EngineKind::Lsm);
        assert_eq!(config.storage.flush_threshold_bytes, 2048);
        assert!(config.storage.compact_on_close);
    }

    #[test]
    fn test_data_dir_and_threshold_flags() {
        let cli = CliConfig::parse_from([
            "small-kv",
            "--data-dir",
            "/tmp/elsewhere",
            "--flush-threshold",
            "8192",
            "-v",
        ]);
        assert!(cli.verbose);

        let config = cli.resolve().unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/elsewhere");
        assert_eq!(config.storage.flush_threshold_bytes, 8192);
    }
}
