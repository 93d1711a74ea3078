use crate::domain::model::{Keyed, Record};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Rough per-entry bookkeeping cost counted on top of key and value bytes.
const ENTRY_OVERHEAD: usize = 32;

/// A stored version of a key. `value == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

impl Cell {
    pub fn live(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    pub fn into_record(self) -> Option<Record> {
        let Cell { key, value } = self;
        value.map(|value| Record::of(key, value))
    }
}

impl Keyed for Cell {
    fn key(&self) -> &[u8] {
        &self.key
    }
}

fn footprint(key: &[u8], value: &Option<Vec<u8>>) -> usize {
    key.len() + value.as_ref().map_or(0, Vec::len) + ENTRY_OVERHEAD
}

#[derive(Debug, Default)]
pub struct MemTable {
    entries: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    size_bytes: usize,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, key: &[u8], value: &[u8]) {
        self.put(key, Some(value.to_vec()));
    }

    /// Records a tombstone even for keys not present here; older tables may still hold them.
    pub fn remove(&mut self, key: &[u8]) {
        self.put(key, None);
    }

    fn put(&mut self, key: &[u8], value: Option<Vec<u8>>) {
        self.size_bytes += footprint(key, &value);
        if let Some(previous) = self.entries.insert(key.to_vec(), value) {
            self.size_bytes -= footprint(key, &previous);
        }
    }

    pub fn iter_from<'a>(&'a self, from: &[u8]) -> impl Iterator<Item = Result<Cell>> + 'a {
        self.entries
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .map(|(key, value)| {
                Ok(Cell {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
    }

    pub fn cells(&self) -> impl Iterator<Item = Result<Cell>> + '_ {
        self.iter_from(&[])
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.size_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_tracks_overwrites() {
        let mut table = MemTable::new();
        table.upsert(b"key", b"12345");
        assert_eq!(table.size_bytes(), 3 + 5 + ENTRY_OVERHEAD);

        table.upsert(b"key", b"1");
        assert_eq!(table.size_bytes(), 3 + 1 + ENTRY_OVERHEAD);

        table.remove(b"key");
        assert_eq!(table.size_bytes(), 3 + ENTRY_OVERHEAD);
        assert_eq!(table.len(), 1);

        table.clear();
        assert_eq!(table.size_bytes(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_of_absent_key_leaves_tombstone() {
        let mut table = MemTable::new();
        table.remove(b"ghost");
        let cells: Vec<Cell> = table.cells().map(|c| c.unwrap()).collect();
        assert_eq!(cells, vec![Cell::tombstone("ghost")]);
    }

    #[test]
    fn test_iter_from_is_tail() {
        let mut table = MemTable::new();
        for key in ["c", "a", "b", "d"] {
            table.upsert(key.as_bytes(), b"v");
        }
        let keys: Vec<Vec<u8>> = table.iter_from(b"b").map(|c| c.unwrap().key).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }
}
