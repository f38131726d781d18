//! Typed row schemas for the backing-store worksheets.
//!
//! Each worksheet carries a fixed header row; the constants here are the
//! single source of truth for worksheet names, column order, and the
//! currency prefix stripped during amount normalization.

use std::collections::BTreeMap;

pub const TRANSACTIONS_SHEET: &str = "Transactions";
pub const MEMORY_SHEET: &str = "Memory";
pub const ASSETS_SHEET: &str = "Assets";
pub const TASKS_SHEET: &str = "Tasks";

pub const TRANSACTION_HEADERS: [&str; 5] = ["Date", "Item", "Amount", "Category", "Remarks"];
pub const MEMORY_HEADERS: [&str; 4] = ["Date", "Category", "Observation", "Context"];
pub const ASSET_HEADERS: [&str; 3] = ["Category", "Amount", "LastUpdated"];
pub const TASK_HEADERS: [&str; 4] = ["Date", "Task", "Status", "Priority"];

/// Currency prefix users type and the model echoes back ("RM50").
pub const CURRENCY_PREFIX: &str = "RM";

/// The derived-total label; never stored as a real asset category.
pub const NET_WORTH_LABEL: &str = "NetWorth";

/// A single expense row, appended once and never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: String,
    pub item: String,
    pub amount: f64,
    pub category: String,
    pub comment: Option<String>,
}

impl Transaction {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.item.clone(),
            self.amount.to_string(),
            self.category.clone(),
            self.comment.clone().unwrap_or_default(),
        ]
    }
}

/// One learned fact about the user, appended to the Memory worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub date: String,
    pub category: String,
    pub observation: String,
    pub context: Option<String>,
}

impl MemoryEntry {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.category.clone(),
            self.observation.clone(),
            self.context.clone().unwrap_or_default(),
        ]
    }

    /// Render as one bullet of the memory block injected into the persona.
    pub fn bullet(&self) -> String {
        match self.context.as_deref().filter(|c| !c.is_empty()) {
            Some(ctx) => format!("- [{}] {} (context: {})", self.category, self.observation, ctx),
            None => format!("- [{}] {}", self.category, self.observation),
        }
    }

    pub fn from_row(row: &[String]) -> Option<Self> {
        let observation = row.get(2)?.clone();
        if observation.is_empty() {
            return None;
        }
        Some(Self {
            date: row.first().cloned().unwrap_or_default(),
            category: row.get(1).cloned().unwrap_or_default(),
            observation,
            context: row.get(3).cloned().filter(|c| !c.is_empty()),
        })
    }
}

/// Asset categories mapped to amounts, with the net worth derived at read
/// time rather than stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assets {
    pub categories: BTreeMap<String, f64>,
}

impl Assets {
    /// Sum of every category except the derived label itself.
    pub fn net_worth(&self) -> f64 {
        self.categories
            .iter()
            .filter(|(category, _)| category.as_str() != NET_WORTH_LABEL)
            .map(|(_, amount)| amount)
            .sum()
    }
}

/// A tracked task; creation is append-only and the pending view filters on
/// status.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub date: String,
    pub task: String,
    pub status: String,
    pub priority: String,
}

impl Task {
    pub const STATUS_PENDING: &'static str = "Pending";
    pub const STATUS_DONE: &'static str = "Done";

    pub fn is_pending(&self) -> bool {
        self.status != Self::STATUS_DONE
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.task.clone(),
            self.status.clone(),
            self.priority.clone(),
        ]
    }

    pub fn from_row(row: &[String]) -> Option<Self> {
        let task = row.get(1)?.clone();
        if task.is_empty() {
            return None;
        }
        Some(Self {
            date: row.first().cloned().unwrap_or_default(),
            task,
            status: row.get(2).cloned().unwrap_or_default(),
            priority: row.get(3).cloned().unwrap_or_default(),
        })
    }
}

/// Normalize a raw amount cell to a number.
///
/// Strips the currency prefix and thousands separators before parsing.
/// Blank or unparseable cells return `None` and contribute nothing to an
/// aggregation; they are a data-quality issue, not an error.
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(CURRENCY_PREFIX, "").replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
