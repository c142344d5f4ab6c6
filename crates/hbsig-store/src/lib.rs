//! hbsig Store - durable storage for signing states
//!
//! `FileStore` implements `hbsig_core::StateStore` on top of the local file
//! system. Every write replaces the target atomically.

pub mod file;
pub mod fsutil;

pub use file::FileStore;
pub use fsutil::{read_file, write_secure_file};
