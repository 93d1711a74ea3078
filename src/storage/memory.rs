use crate::domain::model::Record;
use crate::domain::ports::{Dao, RecordIter};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Volatile store backed by a sorted map.
#[derive(Debug, Default)]
pub struct MemoryDao {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Dao for MemoryDao {
    fn iter_from(&self, from: &[u8]) -> Result<RecordIter<'_>> {
        let tail = self
            .map
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .map(|(key, value)| Ok(Record::of(key.clone(), value.clone())));
        Ok(Box::new(tail))
    }

    fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::KvError;

    #[test]
    fn test_upsert_get_remove() {
        let mut dao = MemoryDao::new();
        dao.upsert(b"k", b"v1").unwrap();
        dao.upsert(b"k", b"v2").unwrap();
        assert_eq!(dao.get(b"k").unwrap(), b"v2");
        assert_eq!(dao.len(), 1);

        dao.remove(b"k").unwrap();
        assert!(matches!(dao.get(b"k"), Err(KvError::NotFound { .. })));
        assert!(dao.is_empty());
    }

    #[test]
    fn test_get_does_not_return_successor() {
        let mut dao = MemoryDao::new();
        dao.upsert(b"b", b"1").unwrap();
        assert!(matches!(dao.get(b"a"), Err(KvError::NotFound { .. })));
    }

    #[test]
    fn test_remove_absent_key_is_ok() {
        let mut dao = MemoryDao::new();
        assert!(dao.remove(b"nothing").is_ok());
    }

    #[test]
    fn test_iter_from_is_sorted_tail() {
        let mut dao = MemoryDao::new();
        for key in ["d", "b", "a", "c"] {
            dao.upsert(key.as_bytes(), key.as_bytes()).unwrap();
        }
        let keys: Vec<Vec<u8>> = dao
            .iter_from(b"b")
            .unwrap()
            .map(|r| r.unwrap().key().to_vec())
            .collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }
}
