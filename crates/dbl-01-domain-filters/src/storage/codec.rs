//! Shared plumbing for bucketed storage files
//!
//! All integers are big-endian. Bucket offsets are relative to the first
//! payload byte.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;

use crate::error::FilterError;

/// Sequential reader over a file header
pub(crate) struct HeaderReader<R> {
    inner: R,
    position: u64,
    kind: &'static str,
}

impl<R: Read> HeaderReader<R> {
    pub(crate) fn new(inner: R, kind: &'static str) -> Self {
        Self {
            inner,
            position: 0,
            kind,
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, FilterError> {
        let kind = self.kind;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => FilterError::corrupt(kind, "truncated header"),
            _ => FilterError::Io(e),
        })?;
        self.position += len as u64;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FilterError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.read_bytes(N)?);
        Ok(buf)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FilterError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, FilterError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, FilterError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Length prefix that must not be negative
    pub(crate) fn read_len_i16(&mut self, field: &str) -> Result<usize, FilterError> {
        let value = self.read_i16()?;
        usize::try_from(value)
            .map_err(|_| FilterError::corrupt(self.kind, format!("negative {field}: {value}")))
    }

    pub(crate) fn read_len_i32(&mut self, field: &str) -> Result<usize, FilterError> {
        let value = self.read_i32()?;
        usize::try_from(value)
            .map_err(|_| FilterError::corrupt(self.kind, format!("negative {field}: {value}")))
    }

    pub(crate) fn read_string(&mut self, len: usize, field: &str) -> Result<String, FilterError> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|_| FilterError::corrupt(self.kind, format!("{field} is not UTF-8")))
    }

    pub(crate) fn expect_magic(&mut self, magic: &[u8]) -> Result<(), FilterError> {
        let found = self.read_bytes(magic.len())?;
        if found != magic {
            return Err(FilterError::BadMagic {
                kind: self.kind,
                expected: magic.to_vec(),
                found,
            });
        }
        Ok(())
    }
}

/// Header bytes under construction
#[derive(Default)]
pub(crate) struct HeaderWriter {
    bytes: Vec<u8>,
}

impl HeaderWriter {
    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn put_u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub(crate) fn put_i16(&mut self, value: i16) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub(crate) fn put_i32(&mut self, value: i32) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Narrow a length into a header field
pub(crate) fn to_i16(value: usize, field: &str) -> Result<i16, FilterError> {
    i16::try_from(value)
        .map_err(|_| FilterError::InvalidEntry(format!("{field} too large: {value}")))
}

pub(crate) fn to_i32(value: usize, field: &str) -> Result<i32, FilterError> {
    i32::try_from(value)
        .map_err(|_| FilterError::InvalidEntry(format!("{field} too large: {value}")))
}

/// Turn relative bucket offsets into absolute byte ranges.
///
/// Offsets must start at zero, never decrease, and stay inside the payload.
pub(crate) fn bucket_ranges(
    kind: &'static str,
    offsets: &[i32],
    payload_start: u64,
    file_len: u64,
) -> Result<Vec<Range<u64>>, FilterError> {
    let payload_len = file_len
        .checked_sub(payload_start)
        .ok_or_else(|| FilterError::corrupt(kind, "payload starts past end of file"))?;

    let mut relative = Vec::with_capacity(offsets.len() + 1);
    for &offset in offsets {
        let offset = u64::try_from(offset)
            .map_err(|_| FilterError::corrupt(kind, format!("negative bucket offset {offset}")))?;
        relative.push(offset);
    }
    relative.push(payload_len);

    if relative.first() != Some(&0) && !offsets.is_empty() {
        return Err(FilterError::corrupt(kind, "first bucket does not start the payload"));
    }
    if relative.windows(2).any(|w| w[0] > w[1]) {
        return Err(FilterError::corrupt(kind, "bucket offsets out of order or past end of file"));
    }

    Ok(relative
        .windows(2)
        .map(|w| payload_start + w[0]..payload_start + w[1])
        .collect())
}

/// Read exactly one byte range without moving any shared cursor
pub(crate) fn read_range(file: &File, range: &Range<u64>) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    read_exact_at(file, &mut buf, range.start)?;
    Ok(buf)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
pub(crate) fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
