use crate::core::iters;
use crate::domain::model::Record;
use crate::utils::error::{KvError, Result};

/// Ascending stream of records. Items are fallible because on-disk reads can fail midway.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// Sorted key-value storage.
pub trait Dao {
    /// All records with `key >= from`, ascending by key.
    fn iter_from(&self, from: &[u8]) -> Result<RecordIter<'_>>;

    /// Records with keys between `from` inclusive and `to` exclusive.
    /// A missing `to` means no upper bound.
    fn range(&self, from: &[u8], to: Option<&[u8]>) -> Result<RecordIter<'_>> {
        let Some(to) = to else {
            return self.iter_from(from);
        };

        if from > to {
            return Ok(iters::empty());
        }

        Ok(Box::new(iters::until(self.iter_from(from)?, to.to_vec())))
    }

    /// Value stored under `key`, or [`KvError::NotFound`].
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.iter_from(key)?.next() {
            Some(record) => {
                let record = record?;
                if record.key() == key {
                    Ok(record.into_value())
                } else {
                    Err(KvError::not_found(key))
                }
            }
            None => Err(KvError::not_found(key)),
        }
    }

    fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    fn remove(&mut self, key: &[u8]) -> Result<()>;

    fn compact(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
