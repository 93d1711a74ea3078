use crate::core::iters::{self, KeyedIterExt};
use crate::domain::ports::{Dao, RecordIter};
use crate::storage::ensure_directory;
use crate::storage::memtable::{Cell, MemTable};
use crate::storage::sstable::{parse_generation, table_file_name, SsTable, TEMP_EXTENSION};
use crate::utils::error::{KvError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FLUSH_THRESHOLD: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsmOptions {
    /// Memtable size that triggers a flush to a new table.
    pub flush_threshold_bytes: usize,
    pub compact_on_close: bool,
}

impl Default for LsmOptions {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: DEFAULT_FLUSH_THRESHOLD,
            compact_on_close: false,
        }
    }
}

/// Log-structured store: a memtable in front of immutable sorted tables.
pub struct LsmDao {
    dir: PathBuf,
    options: LsmOptions,
    memtable: MemTable,
    // newest first
    tables: Vec<SsTable>,
    next_generation: u64,
    closed: bool,
}

impl LsmDao {
    pub fn open(dir: impl AsRef<Path>, options: LsmOptions) -> Result<Self> {
        let dir = dir.as_ref();
        ensure_directory(dir)?;

        let mut tables = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                tracing::warn!("Removing unfinished table {}", path.display());
                fs::remove_file(&path)?;
                continue;
            }
            if let Some(generation) = parse_generation(&path) {
                tables.push(SsTable::open(&path, generation)?);
            }
        }
        tables.sort_by(|a, b| b.generation().cmp(&a.generation()));

        let next_generation = tables.first().map_or(1, |table| table.generation() + 1);
        tracing::info!(
            "Opened {} with {} tables, next generation {}",
            dir.display(),
            tables.len(),
            next_generation
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            options,
            memtable: MemTable::new(),
            tables,
            next_generation,
            closed: false,
        })
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn memtable_len(&self) -> usize {
        self.memtable.len()
    }

    /// Writes the memtable out as a new table. Tombstones are kept so they
    /// keep shadowing older tables.
    pub fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        let generation = self.next_generation;
        let path = self.dir.join(table_file_name(generation));
        let table = SsTable::write(&path, generation, self.memtable.cells())?;
        self.next_generation += 1;

        tracing::info!(
            "Flushed {} cells ({} bytes) to {}",
            table.len(),
            self.memtable.size_bytes(),
            path.display()
        );
        self.tables.insert(0, table);
        self.memtable.clear();
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(KvError::Closed);
        }
        Ok(())
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.memtable.size_bytes() >= self.options.flush_threshold_bytes {
            tracing::debug!(
                "Memtable reached {} bytes, flushing",
                self.memtable.size_bytes()
            );
            self.flush()?;
        }
        Ok(())
    }

    /// Newest version of every key at or after `from`, tombstones included.
    fn cells_from(&self, from: &[u8]) -> Result<impl Iterator<Item = Result<Cell>> + '_> {
        let mut sources: Vec<Box<dyn Iterator<Item = Result<Cell>> + '_>> =
            Vec::with_capacity(self.tables.len() + 1);
        sources.push(Box::new(self.memtable.iter_from(from)));
        for table in &self.tables {
            sources.push(Box::new(table.iter_from(from)?));
        }
        Ok(iters::merge(sources).collapse_equals())
    }

    fn write_compacted(&mut self) -> Result<SsTable> {
        let generation = self.next_generation;
        let path = self.dir.join(table_file_name(generation));
        let live = self
            .cells_from(&[])?
            .filter(|cell| !matches!(cell, Ok(cell) if cell.is_tombstone()));
        let compacted = SsTable::write(&path, generation, live)?;
        self.next_generation += 1;
        Ok(compacted)
    }

    /// Replaces every current table with `compacted`.
    ///
    /// Tables are deleted oldest first and the first failure stops the pass,
    /// so whatever remains on disk is a newest suffix whose tombstones still
    /// shadow the values they removed.
    fn retire_tables(&mut self, compacted: SsTable) -> Result<()> {
        let mut obsolete = std::mem::take(&mut self.tables);
        self.tables.push(compacted);

        while let Some(table) = obsolete.last() {
            if let Err(e) = table.delete() {
                tracing::warn!(
                    "Could not delete {}, keeping {} obsolete tables: {}",
                    table.path().display(),
                    obsolete.len(),
                    e
                );
                self.tables.extend(obsolete);
                return Err(e);
            }
            obsolete.pop();
        }

        if self.tables[0].is_empty() {
            self.tables.remove(0).delete()?;
        }
        Ok(())
    }
}

impl Dao for LsmDao {
    fn iter_from(&self, from: &[u8]) -> Result<RecordIter<'_>> {
        self.ensure_open()?;
        let live = self.cells_from(from)?.filter_map(|cell| match cell {
            Ok(cell) => cell.into_record().map(Ok),
            Err(e) => Some(Err(e)),
        });
        Ok(Box::new(live))
    }

    fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.memtable.upsert(key, value);
        self.maybe_flush()
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.memtable.remove(key);
        self.maybe_flush()
    }

    /// Rewrites everything into one table of live cells.
    fn compact(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.tables.is_empty() && self.memtable.is_empty() {
            return Ok(());
        }

        // memtable tombstones must reach disk before older tables go away
        self.flush()?;
        let compacted = self.write_compacted()?;
        let generation = compacted.generation();
        let live_cells = compacted.len();
        let merged = self.tables.len();
        self.retire_tables(compacted)?;

        tracing::info!(
            "Compacted {} tables into {} live cells at generation {}",
            merged,
            live_cells,
            generation
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.flush()?;
        if self.options.compact_on_close {
            self.compact()?;
        }
        self.closed = true;
        tracing::info!("Closed store at {}", self.dir.display());
        Ok(())
    }
}

impl Drop for LsmDao {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.flush() {
                tracing::warn!("Failed to flush {} on drop: {}", self.dir.display(), e);
            }
        }
    }
}
