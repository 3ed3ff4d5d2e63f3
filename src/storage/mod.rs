//!
//! fatecraft storage module
//! ------------------------
//! Durable client-side key/value storage: the local-storage equivalent that
//! keeps a signed-in session alive across restarts.
//!
//! Values are opaque strings (the session store writes JSON). Two backends:
//! - `FileStorage`: one file per key under a state directory, written through a
//!   temporary file and renamed into place so a crash never leaves half a record.
//! - `MemoryStorage`: a shared in-process map. Clones share the same map, which
//!   lets tests drop and rebuild a session store to simulate a reload.
//!
//! The session store is the only writer of the session key; everything else
//! reads session state through the store.

use std::sync::Arc;

use crate::error::StorageError;

pub mod kv;

pub use kv::{FileStorage, MemoryStorage};

pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub type SharedStorage = Arc<dyn DurableStorage>;
