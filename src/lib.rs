pub mod config;
pub mod console;
pub mod core;
pub mod domain;
pub mod storage;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{EngineKind, StoreConfig};
pub use console::{Command, Console};
pub use core::factory::open_dao;
pub use domain::model::{Keyed, Record};
pub use domain::ports::{Dao, RecordIter};
pub use storage::lsm::{LsmDao, LsmOptions};
pub use storage::memory::MemoryDao;
pub use utils::error::{KvError, Result};
