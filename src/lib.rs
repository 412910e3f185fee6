// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod briefing;
pub mod config;
pub mod cursor;
pub mod cycle;
pub mod deliver;
pub mod digest;
pub mod ingest;
pub mod sanitize;

// ---- Re-exports for stable public API ----
pub use crate::config::{MailSettings, Settings};
pub use crate::cursor::{CursorStore, FileCursor, MemoryCursor};
pub use crate::deliver::{DeliveryOutcome, MAX_ARTIFACT_BYTES};
pub use crate::digest::{assemble, DocMeta};
pub use crate::ingest::types::{FeedSource, Post};
pub use crate::sanitize::sanitize_fragment;
