//! appstat-state — application model and backing store for appstat.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage of `Application` resources, plus the read-only
//! [`ApplicationLister`] capability the metrics collector consumes.
//!
//! # Architecture
//!
//! Applications are JSON-serialized into redb's `&[u8]` value columns under
//! `{namespace}/{name}` keys. Every `list` call runs inside a single read
//! transaction, so callers always observe one consistent snapshot.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod lister;
pub mod selector;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use lister::ApplicationLister;
pub use selector::LabelSelector;
pub use store::StateStore;
pub use types::*;
