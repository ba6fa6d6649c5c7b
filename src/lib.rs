//! Redmap - Typed object mapping for Redis
//!
//! This library binds typed Rust values to Redis keys: scalars through an
//! encode/decode layer, and sets, lists, hashes and sorted sets through
//! collection handles that translate their operations into Redis commands.
//!
//! # Architecture
//! - `types`: conversion between Rust values and Redis bulks, plus the
//!   value-level load/save protocol
//! - `collections`: Set / List / Hash / SortedSet handles bound to keys
//! - `session`: connection management, key namespace and command routing
//! - `transaction`: optimistic WATCH/MULTI/EXEC retry loops
//! - `retry`: backoff policy for reconnecting on transient errors
//! - `config`: TOML + environment configuration loading
//!
//! # Example
//! ```no_run
//! use redmap::{Session, types::{Integer, SetOf}};
//!
//! # async fn demo() -> redmap::Result<()> {
//! let session = Session::open_url("redis://127.0.0.1:6379/0").await?;
//!
//! // Scalars go through GET/SET with typed codecs.
//! session.set("answer", 42, Integer).await?;
//! assert_eq!(session.get("answer", Integer).await?, Some(42));
//!
//! // Collections are live handles; operations become Redis commands.
//! let tags = session.set("tags", vec![1, 2, 3], SetOf(Integer)).await?;
//! tags.add(&4).await?;
//! assert_eq!(tags.len().await?, 4);
//! # Ok(())
//! # }
//! ```

pub mod collections;
pub mod config;
pub mod errors;
pub mod retry;
pub mod session;
pub mod transaction;
pub mod types;

pub use collections::{Hash, List, Set, SortedSet};
pub use config::RedmapConfig;
pub use errors::{RedmapError, Result};
pub use session::Session;
