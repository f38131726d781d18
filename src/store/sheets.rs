//! Google Sheets-backed store adapter.
//!
//! `SheetsClient` is a thin wrapper over the Sheets v4 values/batchUpdate
//! endpoints; `SheetStore` implements the [`Store`] contract on top of it.
//! Worksheet schemas are validated (and repaired) once at connect time.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;
use crate::error::{Error, Result};

use super::auth::{ServiceAccountKey, TokenProvider};
use super::rows::{
    self, normalize_amount, Assets, MemoryEntry, Task, Transaction, ASSETS_SHEET, ASSET_HEADERS,
    MEMORY_HEADERS, MEMORY_SHEET, TASKS_SHEET, TASK_HEADERS, TRANSACTIONS_SHEET,
    TRANSACTION_HEADERS,
};
use super::{Store, MEMORY_EMPTY, MEMORY_UNAVAILABLE};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Seed rows written when the Assets worksheet is created lazily.
const ASSET_SEED_CATEGORIES: [&str; 2] = ["Cash", "Investments"];

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

/// Low-level Sheets v4 REST client.
pub struct SheetsClient {
    client: reqwest::Client,
    auth: TokenProvider,
    base_url: String,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(client: reqwest::Client, auth: TokenProvider, spreadsheet_id: String) -> Self {
        Self {
            client,
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.base_url, self.spreadsheet_id, range, suffix
        )
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Store(format!(
            "{}: HTTP {}: {}",
            action, status, body
        )))
    }

    /// Read a range; missing cells come back as empty rows.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .get(self.values_url(range, ""))
            .bearer_auth(bearer)
            .send()
            .await?;
        let response = Self::check(response, "values get").await?;

        let value_range: ValueRange = response.json().await?;
        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Append one row to the bottom of a worksheet.
    pub async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .post(self.values_url(
                sheet,
                ":append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            ))
            .bearer_auth(bearer)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(response, "values append").await?;
        Ok(())
    }

    /// Overwrite a range in place.
    pub async fn update_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .put(self.values_url(range, "?valueInputOption=USER_ENTERED"))
            .bearer_auth(bearer)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        Self::check(response, "values update").await?;
        Ok(())
    }

    /// Create a new worksheet in the spreadsheet.
    pub async fn add_sheet(&self, title: &str) -> Result<()> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .post(format!(
                "{}/v4/spreadsheets/{}:batchUpdate",
                self.base_url, self.spreadsheet_id
            ))
            .bearer_auth(bearer)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await?;
        Self::check(response, "add sheet").await?;
        Ok(())
    }

    /// Numeric sheet id for a worksheet title, if it exists.
    pub async fn sheet_id(&self, title: &str) -> Result<Option<i64>> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .get(format!(
                "{}/v4/spreadsheets/{}?fields=sheets.properties",
                self.base_url, self.spreadsheet_id
            ))
            .bearer_auth(bearer)
            .send()
            .await?;
        let response = Self::check(response, "spreadsheet get").await?;

        let meta: SpreadsheetMeta = response.json().await?;
        Ok(meta
            .sheets
            .into_iter()
            .find(|s| s.properties.title == title)
            .map(|s| s.properties.sheet_id))
    }

    /// Insert blank rows above `start_index` (zero-based).
    pub async fn insert_rows(&self, sheet_id: i64, start_index: i64, count: i64) -> Result<()> {
        let bearer = self.auth.bearer().await?;
        let response = self
            .client
            .post(format!(
                "{}/v4/spreadsheets/{}:batchUpdate",
                self.base_url, self.spreadsheet_id
            ))
            .bearer_auth(bearer)
            .json(&json!({
                "requests": [{
                    "insertDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": start_index,
                            "endIndex": start_index + count
                        },
                        "inheritFromBefore": false
                    }
                }]
            }))
            .send()
            .await?;
        Self::check(response, "insert rows").await?;
        Ok(())
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Column letter for a 1-based column count (worksheets here are <= 5 wide).
fn last_column(count: usize) -> char {
    (b'A' + count as u8 - 1) as char
}

fn header_range(sheet: &str, count: usize) -> String {
    format!("{}!A1:{}1", sheet, last_column(count))
}

fn data_range(sheet: &str, count: usize) -> String {
    format!("{}!A2:{}", sheet, last_column(count))
}

fn today_string() -> String {
    Local::now().date_naive().to_string()
}

/// The spreadsheet-backed [`Store`] implementation.
pub struct SheetStore {
    api: SheetsClient,
}

impl SheetStore {
    /// Establish the store connection: load credentials, exchange the first
    /// token, and validate/repair worksheet schemas. Runs once at startup.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let spreadsheet_id = settings
            .spreadsheet_id()
            .ok_or_else(|| Error::Config("sheets.spreadsheet_id not set".to_string()))?;
        let key = ServiceAccountKey::load(settings)?;

        let client = reqwest::Client::new();
        let auth = TokenProvider::new(client.clone(), key);
        let api = SheetsClient::new(client, auth, spreadsheet_id);

        let store = Self { api };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Build a store over an existing client (tests, alternate endpoints).
    pub fn with_api(api: SheetsClient) -> Self {
        Self { api }
    }

    /// Validate each worksheet's header row, creating or repairing as
    /// needed. The Assets worksheet is created lazily on first read instead.
    pub async fn ensure_schema(&self) -> Result<()> {
        let schemas: [(&str, &[&str]); 3] = [
            (TRANSACTIONS_SHEET, &TRANSACTION_HEADERS),
            (MEMORY_SHEET, &MEMORY_HEADERS),
            (TASKS_SHEET, &TASK_HEADERS),
        ];

        for (sheet, headers) in schemas {
            self.ensure_sheet_headers(sheet, headers).await?;
        }
        Ok(())
    }

    async fn ensure_sheet_headers(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        let header_row = match self.api.get_values(&format!("{}!1:1", sheet)).await {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                // A range that fails to parse usually means the worksheet
                // does not exist yet.
                tracing::info!("Worksheet {} missing ({}), creating", sheet, e);
                self.api.add_sheet(sheet).await?;
                None
            }
        };

        let expected: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

        match header_row {
            None => {
                self.api
                    .update_range(&header_range(sheet, headers.len()), vec![expected])
                    .await?;
                tracing::info!("Wrote headers for empty worksheet {}", sheet);
            }
            Some(row) if row == expected => {}
            Some(row) if looks_like_data(&row) => {
                // First row is data; shift it down and put headers above it.
                let sheet_id = self
                    .api
                    .sheet_id(sheet)
                    .await?
                    .ok_or_else(|| Error::Store(format!("worksheet {} not found", sheet)))?;
                self.api.insert_rows(sheet_id, 0, 1).await?;
                self.api
                    .update_range(&header_range(sheet, headers.len()), vec![expected])
                    .await?;
                tracing::info!("Inserted headers above data rows in {}", sheet);
            }
            Some(row) => {
                tracing::warn!(
                    "Worksheet {} headers differ from schema (found {:?}); leaving untouched",
                    sheet,
                    row
                );
            }
        }
        Ok(())
    }

    /// Create the Assets worksheet with its seed rows.
    async fn seed_assets(&self) -> Result<Assets> {
        self.api.add_sheet(ASSETS_SHEET).await?;

        let headers: Vec<String> = ASSET_HEADERS.iter().map(|h| h.to_string()).collect();
        self.api
            .update_range(&header_range(ASSETS_SHEET, ASSET_HEADERS.len()), vec![headers])
            .await?;

        let today = today_string();
        let mut assets = Assets::default();
        for category in ASSET_SEED_CATEGORIES {
            self.api
                .append_row(
                    ASSETS_SHEET,
                    &[category.to_string(), "0".to_string(), today.clone()],
                )
                .await?;
            assets.categories.insert(category.to_string(), 0.0);
        }

        tracing::info!("Created Assets worksheet with seed categories");
        Ok(assets)
    }

    async fn asset_rows(&self) -> Result<Vec<Vec<String>>> {
        self.api
            .get_values(&data_range(ASSETS_SHEET, ASSET_HEADERS.len()))
            .await
    }
}

#[async_trait]
impl Store for SheetStore {
    async fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.api.append_row(TRANSACTIONS_SHEET, &tx.to_row()).await
    }

    async fn expenses_by_date(&self, target: NaiveDate) -> (f64, Vec<String>) {
        let rows = match self
            .api
            .get_values(&data_range(TRANSACTIONS_SHEET, TRANSACTION_HEADERS.len()))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Expense query failed: {}", e);
                return (0.0, vec![format!("query failed: {}", e)]);
            }
        };

        let target = target.to_string();
        let mut total = 0.0;
        let mut items = Vec::new();

        for row in rows {
            if row.first().map(String::as_str) != Some(target.as_str()) {
                continue;
            }
            let item = row.get(1).cloned().unwrap_or_else(|| "?".to_string());
            // Blank or unparseable amounts are skipped, not errors.
            let Some(amount) = row.get(2).and_then(|raw| normalize_amount(raw)) else {
                tracing::debug!("Skipping row with unparseable amount: {:?}", row);
                continue;
            };
            total += amount;
            items.push(format!("{} ({})", item, amount));
        }

        (total, items)
    }

    async fn today_total(&self) -> f64 {
        self.expenses_by_date(Local::now().date_naive()).await.0
    }

    async fn append_memory(&self, category: &str, observation: &str, context: Option<&str>) -> bool {
        let entry = MemoryEntry {
            date: today_string(),
            category: category.to_string(),
            observation: observation.to_string(),
            context: context.map(str::to_string),
        };
        match self.api.append_row(MEMORY_SHEET, &entry.to_row()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Memory append failed: {}", e);
                false
            }
        }
    }

    async fn memories_text(&self) -> String {
        let rows = match self
            .api
            .get_values(&data_range(MEMORY_SHEET, MEMORY_HEADERS.len()))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Memory read failed: {}", e);
                return MEMORY_UNAVAILABLE.to_string();
            }
        };

        let bullets: Vec<String> = rows
            .iter()
            .filter_map(|row| MemoryEntry::from_row(row))
            .map(|entry| entry.bullet())
            .collect();

        if bullets.is_empty() {
            MEMORY_EMPTY.to_string()
        } else {
            bullets.join("\n")
        }
    }

    async fn assets(&self) -> Assets {
        let rows = match self.asset_rows().await {
            Ok(rows) => rows,
            Err(_) => {
                // Worksheet missing; create it with the seed rows.
                return match self.seed_assets().await {
                    Ok(assets) => assets,
                    Err(e) => {
                        tracing::warn!("Assets worksheet creation failed: {}", e);
                        Assets::default()
                    }
                };
            }
        };

        let mut assets = Assets::default();
        for row in rows {
            let Some(category) = row.first().filter(|c| !c.is_empty()) else {
                continue;
            };
            if category.as_str() == rows::NET_WORTH_LABEL {
                continue;
            }
            let amount = row
                .get(1)
                .and_then(|raw| normalize_amount(raw))
                .unwrap_or(0.0);
            assets.categories.insert(category.clone(), amount);
        }
        assets
    }

    async fn update_asset(&self, category: &str, amount: f64) -> bool {
        let rows = match self.asset_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Asset read failed: {}", e);
                return false;
            }
        };

        let today = today_string();
        let existing = rows
            .iter()
            .position(|row| row.first().map(String::as_str) == Some(category));

        let result = match existing {
            Some(index) => {
                // Data rows start at worksheet row 2.
                let row_number = index + 2;
                self.api
                    .update_range(
                        &format!("{}!B{}:C{}", ASSETS_SHEET, row_number, row_number),
                        vec![vec![amount.to_string(), today]],
                    )
                    .await
            }
            None => {
                self.api
                    .append_row(
                        ASSETS_SHEET,
                        &[category.to_string(), amount.to_string(), today],
                    )
                    .await
            }
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Asset update failed: {}", e);
                false
            }
        }
    }

    async fn pending_tasks(&self) -> Vec<Task> {
        let rows = match self
            .api
            .get_values(&data_range(TASKS_SHEET, TASK_HEADERS.len()))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Task read failed: {}", e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| Task::from_row(row))
            .filter(Task::is_pending)
            .collect()
    }

    async fn add_task(&self, name: &str, priority: &str) -> bool {
        let task = Task {
            date: today_string(),
            task: name.to_string(),
            status: Task::STATUS_PENDING.to_string(),
            priority: priority.to_string(),
        };
        match self.api.append_row(TASKS_SHEET, &task.to_row()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Task append failed: {}", e);
                false
            }
        }
    }
}

fn looks_like_data(row: &[String]) -> bool {
    row.first()
        .and_then(|cell| cell.chars().next())
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
}
