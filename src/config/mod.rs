#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::StoreConfig;

/// Which storage engine backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Sorted tables on disk behind an in-memory write buffer
    #[default]
    Lsm,
    /// Sorted map in memory; nothing is persisted
    Memory,
}

impl EngineKind {
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Lsm => "lsm",
            EngineKind::Memory => "memory",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
