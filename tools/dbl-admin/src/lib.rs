//! DBL-Admin library: the commands behind the `dbl-admin` binary.

pub mod commands;
