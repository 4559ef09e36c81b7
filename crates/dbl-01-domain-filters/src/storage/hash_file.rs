//! # Bucketed Hash File
//!
//! Fixed-length digests (MD5 or SHA-1 of a domain). The bucket count is a
//! power of two and the bucket index is the leading bits of the digest,
//! so sorted digests fill the buckets in order.
//!
//! ## Layout
//!
//! ```text
//! MAGIC "DBLHASHF" (8) | VERSION (1) | list id (i32) | name length (i16)
//! | hash function name length (i16) | entry count (i32)
//! | hash length (i16) | bucket count (i32) | name | hash function name
//! | bucket offsets (i32 x bucket count) | buckets (sorted digests)
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use shared_types::HashAlgorithm;
use tracing::{debug, warn};

use super::codec::{self, HeaderReader, HeaderWriter};
use super::string_file::ENTRIES_PER_BUCKET;
use crate::domain::{DecisionFor, DomainFilter, Domains, FilterOrigin};
use crate::error::FilterError;

pub const HASH_MAGIC: &[u8; 8] = b"DBLHASHF";
pub const HASH_FORMAT_VERSION: u8 = 1;

const KIND: &str = "hash";

/// Power-of-two bucket count for `entry_count` digests
pub fn hash_bucket_count(entry_count: usize) -> usize {
    (entry_count / ENTRIES_PER_BUCKET).max(1).next_power_of_two()
}

/// Leading `log2(bucket_count)` bits of the digest, most significant first
pub fn hash_bucket(digest: &[u8], bucket_count: usize) -> usize {
    let bits = bucket_count.max(1).trailing_zeros() as usize;
    let mut index = 0usize;
    for bit in 0..bits.min(digest.len() * 8) {
        let byte = digest[bit / 8];
        index = (index << 1) | usize::from((byte >> (7 - bit % 8)) & 1);
    }
    index
}

pub struct HashFileFilter {
    path: PathBuf,
    file: File,
    list_id: i32,
    name: String,
    algorithm: HashAlgorithm,
    entry_count: usize,
    hash_len: usize,
    buckets: Vec<Range<u64>>,
    origin: FilterOrigin,
}

impl fmt::Debug for HashFileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFileFilter")
            .field("path", &self.path)
            .field("list_id", &self.list_id)
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("entries", &self.entry_count)
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl HashFileFilter {
    pub fn open(path: &Path) -> Result<Self, FilterError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut header = HeaderReader::new(BufReader::new(&file), KIND);

        header.expect_magic(HASH_MAGIC)?;
        let version = header.read_u8()?;
        if version != HASH_FORMAT_VERSION {
            return Err(FilterError::UnsupportedVersion {
                kind: KIND,
                version,
            });
        }
        let list_id = header.read_i32()?;
        let name_len = header.read_len_i16("name length")?;
        let function_len = header.read_len_i16("hash function name length")?;
        let entry_count = header.read_len_i32("entry count")?;
        let hash_len = header.read_len_i16("hash length")?;
        let bucket_count = header.read_len_i32("bucket count")?;
        let name = header.read_string(name_len, "name")?;
        let function = header.read_string(function_len, "hash function name")?;

        let algorithm = HashAlgorithm::from_name(&function).ok_or_else(|| {
            FilterError::corrupt(KIND, format!("unknown hash function {function:?}"))
        })?;
        if hash_len != algorithm.digest_len() {
            return Err(FilterError::corrupt(
                KIND,
                format!("hash length {hash_len} does not match {algorithm}"),
            ));
        }
        if !bucket_count.is_power_of_two() || bucket_count as u64 * 4 > file_len {
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
        if buckets.iter().any(|r| (r.end - r.start) % hash_len as u64 != 0) {
            return Err(FilterError::corrupt(KIND, "bucket is not a whole number of digests"));
        }

        debug!(
            path = %path.display(),
            list_id,
            algorithm = %algorithm,
            entries = entry_count,
            buckets = bucket_count,
            "Opened hash filter file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            origin: FilterOrigin::new(Some(list_id), format!("hash-file({name}, {algorithm})")),
            list_id,
            name,
            algorithm,
            entry_count,
            hash_len,
            buckets,
        })
    }

    /// Write a new file from a re-readable source of digests, then open it.
    ///
    /// `source` is called three times: to count digests, to size buckets
    /// and to place digests. Buckets are then sorted and deduplicated one at
    /// a time, so memory stays bounded by the largest bucket. Every digest
    /// must have the algorithm's length.
    pub fn write<F, I, D>(
        path: &Path,
        list_id: i32,
        name: &str,
        algorithm: HashAlgorithm,
        mut source: F,
    ) -> Result<Self, FilterError>
    where
        F: FnMut() -> Result<I, FilterError>,
        I: IntoIterator<Item = Result<D, FilterError>>,
        D: AsRef<[u8]>,
    {
        let hash_len = algorithm.digest_len();

        // Pass 1: count
        let mut entry_count = 0usize;
        for digest in source()? {
            checked_digest(digest?.as_ref(), algorithm)?;
            entry_count += 1;
        }
        let bucket_count = hash_bucket_count(entry_count);

        // Pass 2: bucket sizes
        let mut counts = vec![0usize; bucket_count];
        for digest in source()? {
            let digest = digest?;
            let digest = checked_digest(digest.as_ref(), algorithm)?;
            counts[hash_bucket(digest, bucket_count)] += 1;
        }

        let header = encode_header(list_id, name, algorithm, entry_count, &counts)?;
        let payload_start = header.len() as u64;
        let payload_len = (entry_count * hash_len) as u64;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        codec::write_all_at(&file, &header, 0)?;
        file.set_len(payload_start + payload_len)?;

        // Pass 3: place digests
        let mut starts = Vec::with_capacity(bucket_count);
        let mut offset = payload_start;
        for count in &counts {
            starts.push(offset);
            offset += (count * hash_len) as u64;
        }
        let mut cursors = starts.clone();
        for digest in source()? {
            let digest = digest?;
            let digest = checked_digest(digest.as_ref(), algorithm)?;
            let index = hash_bucket(digest, bucket_count);
            if cursors[index] + hash_len as u64 > starts[index] + (counts[index] * hash_len) as u64 {
                return Err(FilterError::InvalidEntry(
                    "source yielded different digests between passes".into(),
                ));
            }
            codec::write_all_at(&file, digest, cursors[index])?;
            cursors[index] += hash_len as u64;
        }
        let complete = cursors
            .iter()
            .zip(starts.iter().zip(&counts))
            .all(|(cursor, (start, count))| *cursor == start + (count * hash_len) as u64);
        if !complete {
            return Err(FilterError::InvalidEntry(
                "source yielded different digests between passes".into(),
            ));
        }

        // Sort and deduplicate each bucket, compacting towards the front
        let mut unique = Vec::with_capacity(bucket_count);
        let mut write_pos = payload_start;
        for (start, count) in starts.iter().zip(&counts) {
            let range = *start..start + (count * hash_len) as u64;
            let bucket = codec::read_range(&file, &range)?;
            let mut digests: Vec<&[u8]> = bucket.chunks_exact(hash_len).collect();
            digests.sort_unstable();
            digests.dedup();
            let sorted = digests.concat();
            codec::write_all_at(&file, &sorted, write_pos)?;
            write_pos += sorted.len() as u64;
            unique.push(digests.len());
        }
        let unique_count = unique.iter().sum::<usize>();
        let header = encode_header(list_id, name, algorithm, unique_count, &unique)?;
        codec::write_all_at(&file, &header, 0)?;
        file.set_len(write_pos)?;
        file.sync_all()?;
        drop(file);

        debug!(
            path = %path.display(),
            list_id,
            algorithm = %algorithm,
            entries = unique_count,
            duplicates = entry_count - unique_count,
            buckets = bucket_count,
            "Wrote hash filter file"
        );
        Self::open(path)
    }

    /// Write a new file from digests held in memory.
    pub fn from_digests<D: AsRef<[u8]>>(
        path: &Path,
        list_id: i32,
        name: &str,
        algorithm: HashAlgorithm,
        digests: &[D],
    ) -> Result<Self, FilterError> {
        Self::write(path, list_id, name, algorithm, || {
            Ok(digests.iter().map(Ok::<&D, FilterError>))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list_name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn read_bucket(&self, index: usize) -> Result<Vec<u8>, FilterError> {
        Ok(codec::read_range(&self.file, &self.buckets[index])?)
    }

    fn contains(&self, digest: &[u8]) -> Result<bool, FilterError> {
        if digest.len() != self.hash_len {
            return Ok(false);
        }
        let bucket = self.read_bucket(hash_bucket(digest, self.buckets.len()))?;

        // digests within a bucket are sorted
        let (mut low, mut high) = (0, bucket.len() / self.hash_len);
        while low < high {
            let mid = (low + high) / 2;
            let candidate = &bucket[mid * self.hash_len..(mid + 1) * self.hash_len];
            match candidate.cmp(digest) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(true),
            }
        }
        Ok(false)
    }
}

impl DomainFilter<[u8]> for HashFileFilter {
    fn is_blocked(&self, value: &[u8]) -> DecisionFor<[u8]> {
        let blocked = self.contains(value).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Hash filter lookup failed");
            false
        });
        DecisionFor::<[u8]>::new(value.to_vec(), blocked, self.origin.clone())
    }

    fn size(&self) -> usize {
        self.entry_count
    }

    fn domains(&self) -> Result<Domains<'_, Vec<u8>>, FilterError> {
        let hash_len = self.hash_len;
        Ok(Box::new((0..self.buckets.len()).flat_map(move |index| {
            match self.read_bucket(index) {
                Ok(bytes) => bytes.chunks_exact(hash_len).map(|d| Ok(d.to_vec())).collect(),
                Err(e) => vec![Err(e)],
            }
        })))
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn list_id(&self) -> Option<i32> {
        Some(self.list_id)
    }
}

fn checked_digest(digest: &[u8], algorithm: HashAlgorithm) -> Result<&[u8], FilterError> {
    let hash_len = algorithm.digest_len();
    if digest.len() != hash_len {
        return Err(FilterError::InvalidEntry(format!(
            "{algorithm} digest must be {hash_len} bytes, got {}",
            digest.len()
        )));
    }
    Ok(digest)
}

/// Header and bucket offsets for buckets holding `counts` digests each
fn encode_header(
    list_id: i32,
    name: &str,
    algorithm: HashAlgorithm,
    entry_count: usize,
    counts: &[usize],
) -> Result<Vec<u8>, FilterError> {
    let hash_len = algorithm.digest_len();
    let function = algorithm.name();
    let mut header = HeaderWriter::default();
    header
        .put_bytes(HASH_MAGIC)
        .put_u8(HASH_FORMAT_VERSION)
        .put_i32(list_id)
        .put_i16(codec::to_i16(name.len(), "list name")?)
        .put_i16(codec::to_i16(function.len(), "hash function name")?)
        .put_i32(codec::to_i32(entry_count, "entry count")?)
        .put_i16(codec::to_i16(hash_len, "hash length")?)
        .put_i32(codec::to_i32(counts.len(), "bucket count")?)
        .put_bytes(name.as_bytes())
        .put_bytes(function.as_bytes());
    let mut offset = 0usize;
    for count in counts {
        header.put_i32(codec::to_i32(offset, "bucket offset")?);
        offset += count * hash_len;
    }
    Ok(header.into_bytes())
}
