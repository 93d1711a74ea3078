use crate::config::{EngineKind, StoreConfig};
use crate::domain::ports::Dao;
use crate::storage::ensure_directory;
use crate::storage::lsm::LsmDao;
use crate::storage::memory::MemoryDao;
use crate::utils::error::Result;

/// Opens the engine selected by `config` over its data directory.
pub fn open_dao(config: &StoreConfig) -> Result<Box<dyn Dao>> {
    let dir = config.data_dir();
    tracing::debug!("Opening {} engine at {}", config.storage.engine, dir.display());

    match config.storage.engine {
        EngineKind::Memory => {
            // the directory is still prepared so it can be reported to the user
            ensure_directory(dir)?;
            Ok(Box::new(MemoryDao::new()))
        }
        EngineKind::Lsm => Ok(Box::new(LsmDao::open(dir, config.lsm_options())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::KvError;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, engine: EngineKind) -> StoreConfig {
        let mut config = StoreConfig::default();
        config.storage.data_dir = dir.path().join("store").to_str().unwrap().to_string();
        config.storage.engine = engine;
        config
    }

    #[test]
    fn test_opens_lsm_and_persists() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, EngineKind::Lsm);

        let mut dao = open_dao(&config).unwrap();
        dao.upsert(b"k", b"v").unwrap();
        dao.close().unwrap();

        let dao = open_dao(&config).unwrap();
        assert_eq!(dao.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn test_memory_engine_forgets_and_creates_dir() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, EngineKind::Memory);

        let mut dao = open_dao(&config).unwrap();
        dao.upsert(b"k", b"v").unwrap();
        dao.close().unwrap();
        assert!(config.data_dir().is_dir());

        let dao = open_dao(&config).unwrap();
        assert!(matches!(dao.get(b"k"), Err(KvError::NotFound { .. })));
    }
}
