//! Degraded store used when the backing-store connection fails at startup.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};

use super::rows::{Assets, Task, Transaction};
use super::{Store, MEMORY_UNAVAILABLE};

/// Implements the full [`Store`] contract with the documented degraded
/// value for every operation. Carries the connection failure reason so
/// diagnostics stay actionable.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Store for UnavailableStore {
    async fn append_transaction(&self, _tx: &Transaction) -> Result<()> {
        Err(Error::Store(format!(
            "backing store unavailable: {}",
            self.reason
        )))
    }

    async fn expenses_by_date(&self, _target: NaiveDate) -> (f64, Vec<String>) {
        (
            0.0,
            vec![format!("backing store unavailable: {}", self.reason)],
        )
    }

    async fn today_total(&self) -> f64 {
        0.0
    }

    async fn append_memory(
        &self,
        _category: &str,
        _observation: &str,
        _context: Option<&str>,
    ) -> bool {
        false
    }

    async fn memories_text(&self) -> String {
        MEMORY_UNAVAILABLE.to_string()
    }

    async fn assets(&self) -> Assets {
        Assets::default()
    }

    async fn update_asset(&self, _category: &str, _amount: f64) -> bool {
        false
    }

    async fn pending_tasks(&self) -> Vec<Task> {
        Vec::new()
    }

    async fn add_task(&self, _name: &str, _priority: &str) -> bool {
        false
    }
}
