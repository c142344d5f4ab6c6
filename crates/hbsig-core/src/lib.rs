//! hbsig Core - one-time signature state lifecycle
//!
//! This crate provides:
//! - Key generation with its initial persisted state
//! - Leaf index allocation and detachment validation
//! - The fixed-size, checksummed state format
//! - The signing state machine (persist before release)
//! - Detachment of leaf ranges into independent states
//! - The `StateStore` seam and an in-memory store

pub mod allocator;
pub mod detach;
pub mod error;
pub mod keygen;
pub mod serializer;
pub mod signer;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

pub use detach::{detach, Detachment};
pub use error::{Result, StateError, StorageError};
pub use keygen::generate_key;
pub use serializer::STATE_SIZE;
pub use signer::{sign, Signer};
pub use state::{KeyStatus, SigningState};
pub use store::{MemoryStore, StateStore};
