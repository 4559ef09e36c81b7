//! Storage Layer - Bucketed filter files
//!
//! - `string_file`: newline-delimited domains, bucketed by string hash
//! - `hash_file`: sorted fixed-length digests, bucketed by leading bits
//!
//! Both formats are read one bucket at a time; the whole file is never
//! loaded for a lookup.

mod codec;
pub mod hash_file;
pub mod string_file;

pub use hash_file::{HashFileFilter, HASH_FORMAT_VERSION, HASH_MAGIC};
pub use string_file::{
    BucketFunction, StringFileFilter, LEGACY_STRING_FORMAT_VERSION, STRING_FORMAT_VERSION,
    STRING_MAGIC,
};
