//! # Bucketed String File
//!
//! Domain lists too large for memory. Entries are spread over buckets by
//! their string hash; a lookup reads exactly one bucket with a single
//! positioned read and scans it byte by byte.
//!
//! ## Layout
//!
//! ```text
//! MAGIC "DBLSTRNG" (8) | VERSION (1) | list id (i32) | name length (i16)
//! | name (UTF-8) | entry count (i32) | bucket count (i32)
//! | bucket offsets (i32 x bucket count) | buckets ("entry\n"...)
//! ```
//!
//! ## Versions
//!
//! - `1`: legacy bucket function `bc/2 + (h % bc)/2`. It skews negative
//!   hashes into the lower half and is kept only to read old files.
//! - `2`: `(h & 0x7fffffff) % bc`. The only version written.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::codec::{self, HeaderReader, HeaderWriter};
use crate::domain::hash_functions::string_hash;
use crate::domain::{DecisionFor, DomainFilter, Domains, FilterOrigin};
use crate::error::FilterError;

pub const STRING_MAGIC: &[u8; 8] = b"DBLSTRNG";
pub const STRING_FORMAT_VERSION: u8 = 2;
pub const LEGACY_STRING_FORMAT_VERSION: u8 = 1;

/// Target number of entries per bucket
pub const ENTRIES_PER_BUCKET: usize = 256;

const KIND: &str = "string";

/// Bucket assignment, bound to the file's version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketFunction {
    Legacy,
    Masked,
}

impl BucketFunction {
    pub fn for_version(version: u8) -> Result<Self, FilterError> {
        match version {
            LEGACY_STRING_FORMAT_VERSION => Ok(BucketFunction::Legacy),
            STRING_FORMAT_VERSION => Ok(BucketFunction::Masked),
            _ => Err(FilterError::UnsupportedVersion {
                kind: KIND,
                version,
            }),
        }
    }

    pub fn bucket(self, hash: i32, bucket_count: usize) -> usize {
        let count = bucket_count.max(1) as i64;
        let index = match self {
            BucketFunction::Legacy => count / 2 + (i64::from(hash) % count) / 2,
            BucketFunction::Masked => i64::from(hash & 0x7fff_ffff) % count,
        };
        index as usize
    }
}

pub struct StringFileFilter {
    path: PathBuf,
    file: File,
    list_id: i32,
    name: String,
    entry_count: usize,
    version: u8,
    bucket_function: BucketFunction,
    buckets: Vec<Range<u64>>,
    origin: FilterOrigin,
}

impl fmt::Debug for StringFileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringFileFilter")
            .field("path", &self.path)
            .field("list_id", &self.list_id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("entries", &self.entry_count)
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl StringFileFilter {
    /// Open an existing string file.
    pub fn open(path: &Path) -> Result<Self, FilterError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut header = HeaderReader::new(BufReader::new(&file), KIND);

        header.expect_magic(STRING_MAGIC)?;
        let version = header.read_u8()?;
        let bucket_function = BucketFunction::for_version(version)?;
        let list_id = header.read_i32()?;
        let name_len = header.read_len_i16("name length")?;
        let name = header.read_string(name_len, "name")?;
        let entry_count = header.read_len_i32("entry count")?;
        let bucket_count = header.read_len_i32("bucket count")?;
        if bucket_count == 0 || bucket_count as u64 * 4 > file_len {
            return Err(FilterError::corrupt(
                KIND,
                format!("implausible bucket count {bucket_count}"),
            ));
        }
        let offsets = (0..bucket_count)
            .map(|_| header.read_i32())
            .collect::<Result<Vec<_>, _>>()?;
        let payload_start = header.position();
        drop(header);

        let buckets = codec::bucket_ranges(KIND, &offsets, payload_start, file_len)?;

        debug!(
            path = %path.display(),
            list_id,
            version,
            entries = entry_count,
            buckets = bucket_count,
            "Opened string filter file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            origin: FilterOrigin::new(Some(list_id), format!("string-file({name})")),
            list_id,
            name,
            entry_count,
            version,
            bucket_function,
            buckets,
        })
    }

    /// Write a new file from a re-readable source, then open it.
    ///
    /// `source` is called up to three times: to count entries, to size
    /// buckets and to place entries. It must yield the same entries each
    /// time. Empty entries are skipped; entries containing a newline are
    /// rejected.
    pub fn write<F, I, S>(
        path: &Path,
        list_id: i32,
        name: &str,
        source: F,
    ) -> Result<Self, FilterError>
    where
        F: FnMut() -> Result<I, FilterError>,
        I: IntoIterator<Item = Result<S, FilterError>>,
        S: AsRef<str>,
    {
        write_versioned(path, list_id, name, STRING_FORMAT_VERSION, source)?;
        Self::open(path)
    }

    /// Write a new file from entries held in memory.
    pub fn from_entries<S: AsRef<str>>(
        path: &Path,
        list_id: i32,
        name: &str,
        entries: &[S],
    ) -> Result<Self, FilterError> {
        Self::write(path, list_id, name, || {
            Ok(entries.iter().map(Ok::<&S, FilterError>))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list_name(&self) -> &str {
        &self.name
    }

    pub fn format_version(&self) -> u8 {
        self.version
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn read_bucket(&self, index: usize) -> Result<Vec<u8>, FilterError> {
        Ok(codec::read_range(&self.file, &self.buckets[index])?)
    }

    fn contains(&self, value: &str) -> Result<bool, FilterError> {
        let needle = value.as_bytes();
        if needle.is_empty() {
            return Ok(false);
        }
        let index = self
            .bucket_function
            .bucket(string_hash(value), self.buckets.len());
        let bucket = self.read_bucket(index)?;
        Ok(bucket.split(|&b| b == b'\n').any(|line| line == needle))
    }

    fn bucket_entries(&self, index: usize) -> Vec<Result<String, FilterError>> {
        match self.read_bucket(index) {
            Ok(bytes) => bytes
                .split(|&b| b == b'\n')
                .filter(|line| !line.is_empty())
                .map(|line| {
                    String::from_utf8(line.to_vec())
                        .map_err(|_| FilterError::corrupt(KIND, "entry is not UTF-8"))
                })
                .collect(),
            Err(e) => vec![Err(e)],
        }
    }
}

impl DomainFilter<str> for StringFileFilter {
    fn is_blocked(&self, value: &str) -> DecisionFor<str> {
        let blocked = self.contains(value).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "String filter lookup failed");
            false
        });
        DecisionFor::<str>::new(value.to_string(), blocked, self.origin.clone())
    }

    fn size(&self) -> usize {
        self.entry_count
    }

    fn domains(&self) -> Result<Domains<'_, String>, FilterError> {
        Ok(Box::new(
            (0..self.buckets.len()).flat_map(move |index| self.bucket_entries(index)),
        ))
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn list_id(&self) -> Option<i32> {
        Some(self.list_id)
    }
}

fn checked_entry(entry: &str) -> Result<&str, FilterError> {
    if entry.contains('\n') {
        return Err(FilterError::InvalidEntry(format!(
            "entry contains a newline: {entry:?}"
        )));
    }
    Ok(entry)
}

pub(crate) fn write_versioned<F, I, S>(
    path: &Path,
    list_id: i32,
    name: &str,
    version: u8,
    mut source: F,
) -> Result<(), FilterError>
where
    F: FnMut() -> Result<I, FilterError>,
    I: IntoIterator<Item = Result<S, FilterError>>,
    S: AsRef<str>,
{
    let bucket_function = BucketFunction::for_version(version)?;

    // Pass 1: count
    let mut entry_count = 0usize;
    for entry in source()? {
        let entry = entry?;
        if !checked_entry(entry.as_ref())?.is_empty() {
            entry_count += 1;
        }
    }
    let bucket_count = (entry_count / ENTRIES_PER_BUCKET).max(1);

    // Pass 2: bucket sizes
    let mut sizes = vec![0u64; bucket_count];
    for entry in source()? {
        let entry = entry?;
        let entry = checked_entry(entry.as_ref())?;
        if entry.is_empty() {
            continue;
        }
        let index = bucket_function.bucket(string_hash(entry), bucket_count);
        sizes[index] += entry.len() as u64 + 1;
    }

    let mut header = HeaderWriter::default();
    header
        .put_bytes(STRING_MAGIC)
        .put_u8(version)
        .put_i32(list_id)
        .put_i16(codec::to_i16(name.len(), "list name")?)
        .put_bytes(name.as_bytes())
        .put_i32(codec::to_i32(entry_count, "entry count")?)
        .put_i32(codec::to_i32(bucket_count, "bucket count")?);
    let mut offset = 0u64;
    let mut starts = Vec::with_capacity(bucket_count);
    for size in &sizes {
        header.put_i32(codec::to_i32(offset as usize, "bucket offset")?);
        starts.push(offset);
        offset += size;
    }
    let header = header.into_bytes();
    let payload_start = header.len() as u64;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    codec::write_all_at(&file, &header, 0)?;
    file.set_len(payload_start + offset)?;

    // Pass 3: place entries
    let mut cursors: Vec<u64> = starts.iter().map(|s| payload_start + s).collect();
    let mut line = Vec::new();
    for entry in source()? {
        let entry = entry?;
        let entry = checked_entry(entry.as_ref())?;
        if entry.is_empty() {
            continue;
        }
        let index = bucket_function.bucket(string_hash(entry), bucket_count);
        line.clear();
        line.extend_from_slice(entry.as_bytes());
        line.push(b'\n');
        if cursors[index] + line.len() as u64 > payload_start + starts[index] + sizes[index] {
            return Err(FilterError::InvalidEntry(
                "source yielded different entries between passes".into(),
            ));
        }
        codec::write_all_at(&file, &line, cursors[index])?;
        cursors[index] += line.len() as u64;
    }
    let complete = cursors
        .iter()
        .zip(starts.iter().zip(&sizes))
        .all(|(cursor, (start, size))| *cursor == payload_start + start + size);
    if !complete {
        return Err(FilterError::InvalidEntry(
            "source yielded different entries between passes".into(),
        ));
    }
    file.sync_all()?;

    debug!(
        path = %path.display(),
        list_id,
        version,
        entries = entry_count,
        buckets = bucket_count,
        "Wrote string filter file"
    );
    Ok(())
}
