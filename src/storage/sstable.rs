//! Immutable sorted table files.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! cell*   key_len:u32 key tag:u8 [value_len:u32 value]   (tag 0 = tombstone, 1 = value)
//! index   offset:u64 per cell
//! trailer count:u64 magic:u32
//! ```

use crate::storage::memtable::Cell;
use crate::utils::error::{KvError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const TABLE_EXTENSION: &str = "sst";
pub const TEMP_EXTENSION: &str = "tmp";

const MAGIC: u32 = 0x534B_5654;
const TRAILER_LEN: u64 = 8 + 4;
const TAG_TOMBSTONE: u8 = 0;
const TAG_VALUE: u8 = 1;

pub fn table_file_name(generation: u64) -> String {
    format!("{:016}.{}", generation, TABLE_EXTENSION)
}

/// Generation encoded in a table file name, if the path names a table.
pub fn parse_generation(path: &Path) -> Option<u64> {
    if path.extension()? != TABLE_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

#[derive(Debug)]
pub struct SsTable {
    path: PathBuf,
    generation: u64,
    offsets: Vec<u64>,
    data_end: u64,
}

impl SsTable {
    /// Writes `cells` (already sorted by key) to `path`. The file only appears once complete.
    pub fn write<I>(path: &Path, generation: u64, cells: I) -> Result<SsTable>
    where
        I: IntoIterator<Item = Result<Cell>>,
    {
        let tmp = path.with_extension(format!("{}.{}", TABLE_EXTENSION, TEMP_EXTENSION));

        let (offsets, data_end) = match write_cells(&tmp, cells) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };
        fs::rename(&tmp, path)?;

        tracing::debug!("Wrote {} cells to {}", offsets.len(), path.display());
        Ok(SsTable {
            path: path.to_path_buf(),
            generation,
            offsets,
            data_end,
        })
    }

    pub fn open(path: &Path, generation: u64) -> Result<SsTable> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < TRAILER_LEN {
            return Err(KvError::corrupt(path, "file shorter than trailer"));
        }

        file.seek(SeekFrom::Start(len - TRAILER_LEN))?;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        file.read_exact(&mut trailer)?;

        let count = be_u64(&trailer[..8]);
        let magic = be_u32(&trailer[8..]);
        if magic != MAGIC {
            return Err(KvError::corrupt(path, format!("bad magic {:#010x}", magic)));
        }

        let data_end = count
            .checked_mul(8)
            .and_then(|index_len| (len - TRAILER_LEN).checked_sub(index_len))
            .ok_or_else(|| KvError::corrupt(path, format!("cell count {} exceeds file size", count)))?;

        file.seek(SeekFrom::Start(data_end))?;
        let mut index = vec![0u8; (count * 8) as usize];
        file.read_exact(&mut index)?;

        let offsets: Vec<u64> = index.chunks_exact(8).map(be_u64).collect();
        let sorted = offsets.windows(2).all(|w| w[0] < w[1]);
        if !sorted || offsets.last().is_some_and(|&last| last >= data_end) {
            return Err(KvError::corrupt(path, "offset index out of order or out of bounds"));
        }

        Ok(SsTable {
            path: path.to_path_buf(),
            generation,
            offsets,
            data_end,
        })
    }

    /// Cells with `key >= from`, streamed from disk on a private file handle.
    pub fn iter_from(&self, from: &[u8]) -> Result<TableIter> {
        let mut cells = CellReader {
            reader: BufReader::new(File::open(&self.path)?),
            path: self.path.clone(),
            position: 0,
            data_end: self.data_end,
        };
        let start = self.lower_bound(&mut cells, from)?;
        if let Some(&offset) = self.offsets.get(start) {
            cells.seek(offset)?;
        }

        Ok(TableIter {
            cells,
            remaining: self.offsets.len() - start,
        })
    }

    fn lower_bound(&self, cells: &mut CellReader, from: &[u8]) -> Result<usize> {
        let (mut lo, mut hi) = (0, self.offsets.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            cells.seek(self.offsets[mid])?;
            let key = cells.read_key()?;
            if key.as_slice() < from {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn delete(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

pub struct TableIter {
    cells: CellReader,
    remaining: usize,
}

impl Iterator for TableIter {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.cells.read_cell() {
            Ok(cell) => Some(Ok(cell)),
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// Buffered reader over the data section. Reads that would cross into the
/// offset index are reported as corruption.
struct CellReader {
    reader: BufReader<File>,
    path: PathBuf,
    position: u64,
    data_end: u64,
}

impl CellReader {
    fn seek(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    fn read_key(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()?;
        self.read_bytes(len)
    }

    fn read_cell(&mut self) -> Result<Cell> {
        let key = self.read_key()?;

        let mut tag = [0u8; 1];
        self.read_exact(&mut tag)?;
        match tag[0] {
            TAG_TOMBSTONE => Ok(Cell::tombstone(key)),
            TAG_VALUE => {
                let len = self.read_u32()?;
                let value = self.read_bytes(len)?;
                Ok(Cell::live(key, value))
            }
            other => Err(KvError::corrupt(&self.path, format!("unknown cell tag {}", other))),
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, len: u32) -> Result<Vec<u8>> {
        self.check_bounds(u64::from(len))?;
        let mut bytes = vec![0u8; len as usize];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_bounds(buf.len() as u64)?;
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => KvError::corrupt(&self.path, "truncated cell"),
            _ => KvError::IoError(e),
        })?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn check_bounds(&self, len: u64) -> Result<()> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.data_end => Ok(()),
            _ => Err(KvError::corrupt(
                &self.path,
                format!("{} bytes at offset {} run past the data section", len, self.position),
            )),
        }
    }
}

fn write_cells<I>(tmp: &Path, cells: I) -> Result<(Vec<u64>, u64)>
where
    I: IntoIterator<Item = Result<Cell>>,
{
    let mut writer = BufWriter::new(File::create(tmp)?);
    let mut offsets = Vec::new();
    let mut position = 0u64;

    for cell in cells {
        let cell = cell?;
        offsets.push(position);
        position += write_cell(&mut writer, &cell)?;
    }

    for offset in &offsets {
        writer.write_all(&offset.to_be_bytes())?;
    }
    writer.write_all(&(offsets.len() as u64).to_be_bytes())?;
    writer.write_all(&MAGIC.to_be_bytes())?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok((offsets, position))
}

fn write_cell(writer: &mut impl Write, cell: &Cell) -> io::Result<u64> {
    writer.write_all(&length_prefix(cell.key.len())?.to_be_bytes())?;
    writer.write_all(&cell.key)?;

    match &cell.value {
        None => {
            writer.write_all(&[TAG_TOMBSTONE])?;
            Ok(4 + cell.key.len() as u64 + 1)
        }
        Some(value) => {
            writer.write_all(&[TAG_VALUE])?;
            writer.write_all(&length_prefix(value.len())?.to_be_bytes())?;
            writer.write_all(value)?;
            Ok(4 + cell.key.len() as u64 + 1 + 4 + value.len() as u64)
        }
    }
}

fn length_prefix(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} bytes do not fit a table length prefix", len),
        )
    })
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

fn be_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_cells() -> Vec<Result<Cell>> {
        vec![
            Ok(Cell::live("apple", "red")),
            Ok(Cell::tombstone("banana")),
            Ok(Cell::live("cherry", "")),
            Ok(Cell::live("date", "brown")),
        ]
    }

    fn collect(iter: TableIter) -> Vec<Cell> {
        iter.map(|c| c.unwrap()).collect()
    }

    #[test]
    fn test_write_then_open_reads_all_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(1));

        SsTable::write(&path, 1, sample_cells()).unwrap();
        let table = SsTable::open(&path, 1).unwrap();

        assert_eq!(table.len(), 4);
        let cells = collect(table.iter_from(b"").unwrap());
        assert_eq!(cells[0], Cell::live("apple", "red"));
        assert!(cells[1].is_tombstone());
        assert_eq!(cells[2], Cell::live("cherry", ""));
        assert_eq!(cells[3], Cell::live("date", "brown"));
        assert!(!dir.path().join("0000000000000001.sst.tmp").exists());
    }

    #[test]
    fn test_iter_from_seeks_lower_bound() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(7));
        let table = SsTable::write(&path, 7, sample_cells()).unwrap();

        let keys: Vec<Vec<u8>> = collect(table.iter_from(b"c").unwrap())
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec![b"cherry".to_vec(), b"date".to_vec()]);

        assert_eq!(collect(table.iter_from(b"banana").unwrap()).len(), 3);
        assert!(collect(table.iter_from(b"zzz").unwrap()).is_empty());
    }

    #[test]
    fn test_empty_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(2));
        SsTable::write(&path, 2, Vec::new()).unwrap();

        let table = SsTable::open(&path, 2).unwrap();
        assert!(table.is_empty());
        assert!(collect(table.iter_from(b"a").unwrap()).is_empty());
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(3));
        SsTable::write(&path, 3, sample_cells()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            SsTable::open(&path, 3),
            Err(KvError::CorruptTable { .. })
        ));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(4));
        fs::write(&path, b"tiny").unwrap();

        assert!(matches!(
            SsTable::open(&path, 4),
            Err(KvError::CorruptTable { .. })
        ));
    }

    #[test]
    fn test_failed_write_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(5));
        let cells = vec![Ok(Cell::live("a", "1")), Err(KvError::Closed)];

        assert!(SsTable::write(&path, 5, cells).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_cell_tag_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(8));
        SsTable::write(&path, 8, vec![Ok(Cell::live("apple", "red"))]).unwrap();

        // key_len:u32 + "apple" puts the tag at offset 9
        let mut bytes = fs::read(&path).unwrap();
        bytes[9] = 7;
        fs::write(&path, bytes).unwrap();

        let table = SsTable::open(&path, 8).unwrap();
        let mut cells = table.iter_from(b"").unwrap();
        assert!(matches!(cells.next(), Some(Err(KvError::CorruptTable { .. }))));
        assert!(cells.next().is_none());
    }

    #[test]
    fn test_value_length_past_data_section_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(table_file_name(9));
        let cells = vec![Ok(Cell::live("apple", "red")), Ok(Cell::live("banana", "yellow"))];
        SsTable::write(&path, 9, cells).unwrap();

        // still inside the file, but runs into the offset index
        let mut bytes = fs::read(&path).unwrap();
        bytes[10..14].copy_from_slice(&30u32.to_be_bytes());
        fs::write(&path, bytes).unwrap();

        let table = SsTable::open(&path, 9).unwrap();
        let cells: Vec<Result<Cell>> = table.iter_from(b"").unwrap().collect();
        assert_eq!(cells.len(), 1);
        assert!(matches!(cells[0], Err(KvError::CorruptTable { .. })));
    }

    #[test]
    fn test_parse_generation() {
        assert_eq!(parse_generation(Path::new("data/0000000000000042.sst")), Some(42));
        assert_eq!(parse_generation(Path::new("data/0000000000000042.sst.tmp")), None);
        assert_eq!(parse_generation(Path::new("data/notes.txt")), None);
    }
}
