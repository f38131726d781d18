//! Backing store - spreadsheet-backed persistence for transactions,
//! memories, assets, and tasks.
//!
//! The connection is established once at startup and injected wherever it
//! is needed. When that initial connection fails, callers receive an
//! [`UnavailableStore`] implementing the same trait with documented
//! degraded responses, so the assistant stays usable chat-only.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

pub mod auth;
pub mod rows;
pub mod sheets;
pub mod unavailable;

pub use rows::{Assets, MemoryEntry, Task, Transaction};
pub use sheets::SheetStore;
pub use unavailable::UnavailableStore;

use crate::config::Settings;
use crate::error::Result;

/// Sentinel returned by `memories_text` when the store is unreachable.
pub const MEMORY_UNAVAILABLE: &str = "(memory bank unavailable)";

/// Sentinel returned by `memories_text` when the memory table is empty.
pub const MEMORY_EMPTY: &str = "(no long-term memories yet)";

/// The store contract. Write paths surface errors; read paths degrade to
/// documented zero/empty values so a read can never fail a turn.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append one transaction row. No idempotency key, no dedup.
    async fn append_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Full scan aggregation for one date: total plus display items.
    /// Unreachable store yields `(0.0, [diagnostic])`.
    async fn expenses_by_date(&self, target: NaiveDate) -> (f64, Vec<String>);

    /// Convenience wrapper over `expenses_by_date` for the current date.
    async fn today_total(&self) -> f64;

    /// Best-effort append of a learned fact; `false` on failure.
    async fn append_memory(&self, category: &str, observation: &str, context: Option<&str>)
        -> bool;

    /// The full memory table as bulleted text, or a sentinel.
    async fn memories_text(&self) -> String;

    /// All asset categories; creates the worksheet with seed rows if absent.
    async fn assets(&self) -> Assets;

    /// Update an asset amount in place by category, appending when new.
    async fn update_asset(&self, category: &str, amount: f64) -> bool;

    /// All tasks whose status is not "Done".
    async fn pending_tasks(&self) -> Vec<Task>;

    /// Append a new Pending task dated today.
    async fn add_task(&self, name: &str, priority: &str) -> bool;
}

/// Connect to the backing store, falling back to the degraded
/// implementation when the connection cannot be established.
pub async fn connect(settings: &Settings) -> Arc<dyn Store> {
    match SheetStore::connect(settings).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Backing store unavailable, running degraded: {}", e);
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    }
}
