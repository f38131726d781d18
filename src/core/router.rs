//! Intent routing for Octavia.
//!
//! Handles:
//! - Envelope extraction (first `{` to last `}` of the model output)
//! - `type` discrimination and typed intent decoding
//! - Dispatch to the store / deployment clients
//! - Error containment: the router never propagates an error to its caller
//!
//! Handlers return `Result<Option<String>>` so the two silent cases stay
//! distinguishable in code: `Ok(None)` means "no command intended, echo the
//! raw text"; `Err` means "command intended but failed", which becomes a
//! generic system-error reply.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{Store, Transaction};
use crate::vercel::{self, DeployStatus, DEFAULT_DEPLOY_LIMIT};

/// Source label for observations saved by the nutrition analyzer.
const FOOD_MEMORY_CATEGORY: &str = "Bio-Hacker";
const FOOD_MEMORY_CONTEXT: &str = "Visual Observation";

#[derive(Debug, Clone, Deserialize)]
struct RecordIntent {
    date: String,
    item: String,
    amount: f64,
    category: String,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MacroBreakdown {
    protein: String,
    carbs: String,
    fats: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FoodAnalysisIntent {
    item: String,
    calories: f64,
    macros: MacroBreakdown,
    advice: String,
    #[serde(default)]
    memory_to_save: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct QueryFinanceIntent {
    #[serde(default)]
    target_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct QueryVercelIntent {
    action: String,
}

/// Extract the intent envelope from raw model output.
///
/// Takes the span from the first `{` to the last `}` and parses it as one
/// JSON object. Returns `None` when there is no span or it does not parse;
/// both cases mean "plain chat reply".
pub fn extract_envelope(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Routes raw model output to its side effect and produces the reply text.
pub struct Router {
    store: Arc<dyn Store>,
    deploy: Arc<dyn DeployStatus>,
}

impl Router {
    pub fn new(store: Arc<dyn Store>, deploy: Arc<dyn DeployStatus>) -> Self {
        Self { store, deploy }
    }

    /// Route one model reply. Never returns an error: plain text and
    /// unrecognized envelopes pass through unchanged, failures become a
    /// system-error reply string.
    pub async fn route(&self, raw: &str, today: NaiveDate) -> String {
        let Some(envelope) = extract_envelope(raw) else {
            return raw.to_string();
        };

        let Some(kind) = envelope.get("type").and_then(Value::as_str).map(str::to_string)
        else {
            return raw.to_string();
        };

        let outcome = match kind.as_str() {
            "record" => self.handle_record(envelope).await,
            "food_analysis" => self.handle_food_analysis(envelope).await,
            "query_finance" => self.handle_query_finance(envelope, today).await,
            "query_vercel" => self.handle_query_vercel(envelope).await,
            other => {
                tracing::debug!("Unrecognized intent type '{}', passing through", other);
                Ok(None)
            }
        };

        match outcome {
            Ok(Some(reply)) => reply,
            Ok(None) => raw.to_string(),
            Err(e) => {
                tracing::warn!("Intent '{}' failed: {}", kind, e);
                format!("System error: {}", e)
            }
        }
    }

    async fn handle_record(&self, envelope: Value) -> Result<Option<String>> {
        let intent: RecordIntent = serde_json::from_value(envelope)
            .map_err(|e| Error::Intent(format!("record envelope: {}", e)))?;

        let tx = Transaction {
            date: intent.date,
            item: intent.item,
            amount: intent.amount,
            category: intent.category,
            comment: intent.comment,
        };
        self.store.append_transaction(&tx).await?;

        tracing::info!("Recorded {} ({})", tx.item, tx.amount);
        Ok(Some(format!("✅ Recorded | {} - RM{}", tx.item, tx.amount)))
    }

    async fn handle_food_analysis(&self, envelope: Value) -> Result<Option<String>> {
        let intent: FoodAnalysisIntent = serde_json::from_value(envelope)
            .map_err(|e| Error::Intent(format!("food_analysis envelope: {}", e)))?;

        // Save the observation before building the reply, so a learned fact
        // survives even if formatting changes later.
        if let Some(memory) = intent.memory_to_save.as_deref().filter(|m| !m.trim().is_empty()) {
            if !self
                .store
                .append_memory(FOOD_MEMORY_CATEGORY, memory, Some(FOOD_MEMORY_CONTEXT))
                .await
            {
                tracing::warn!("Could not save nutrition observation");
            }
        }

        Ok(Some(format!(
            "### 🍽️ Nutrition Analysis\n\
             **{}** (~{} kcal)\n\n\
             | Protein 🍖 | Carbs 🍚 | Fats 🥑 |\n\
             | :---: | :---: | :---: |\n\
             | {} | {} | {} |\n\n\
             > **{}'s Advice:**\n\
             > {}",
            intent.item,
            intent.calories,
            intent.macros.protein,
            intent.macros.carbs,
            intent.macros.fats,
            crate::persona::ASSISTANT_NAME,
            intent.advice,
        )))
    }

    async fn handle_query_finance(
        &self,
        envelope: Value,
        today: NaiveDate,
    ) -> Result<Option<String>> {
        let intent: QueryFinanceIntent = serde_json::from_value(envelope)
            .map_err(|e| Error::Intent(format!("query_finance envelope: {}", e)))?;

        let target = match intent.target_date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| Error::Intent(format!("target_date '{}': {}", raw, e)))?,
            None => today,
        };

        let (total, items) = self.store.expenses_by_date(target).await;

        // An empty day still renders as a report with total 0.
        let mut reply = format!(
            "💰 **{} expense report**\n\n**Total: RM{:.2}**\n",
            target, total
        );
        for item in items {
            reply.push_str(&format!("\n- {}", item));
        }
        Ok(Some(reply))
    }

    async fn handle_query_vercel(&self, envelope: Value) -> Result<Option<String>> {
        let intent: QueryVercelIntent = serde_json::from_value(envelope)
            .map_err(|e| Error::Intent(format!("query_vercel envelope: {}", e)))?;

        match intent.action.as_str() {
            "status" => {
                let deployments = self.deploy.latest_deployments(DEFAULT_DEPLOY_LIMIT).await?;
                Ok(Some(format!(
                    "📊 **Vercel Report**\n{}",
                    vercel::format_status_report(&deployments)
                )))
            }
            "list_projects" => {
                let names = self.deploy.project_names().await?;
                Ok(Some(format!(
                    "📦 **Projects**\n{}",
                    vercel::format_project_list(&names)
                )))
            }
            other => {
                tracing::debug!("Unknown vercel action '{}', passing through", other);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::rows::{Assets, MemoryEntry, Task};
    use crate::store::MEMORY_EMPTY;
    use crate::vercel::Deployment;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store that records every call for assertions.
    #[derive(Default)]
    struct MockStore {
        transactions: Mutex<Vec<Transaction>>,
        memories: Mutex<Vec<MemoryEntry>>,
        expenses: Mutex<Vec<(String, f64, Vec<String>)>>,
        queried_dates: Mutex<Vec<String>>,
        fail_appends: bool,
    }

    impl MockStore {
        fn with_expenses(date: &str, total: f64, items: Vec<&str>) -> Self {
            let store = Self::default();
            store.expenses.lock().unwrap().push((
                date.to_string(),
                total,
                items.into_iter().map(str::to_string).collect(),
            ));
            store
        }
    }

    #[async_trait]
    impl Store for MockStore {
        async fn append_transaction(&self, tx: &Transaction) -> crate::error::Result<()> {
            if self.fail_appends {
                return Err(Error::Store("append refused".to_string()));
            }
            self.transactions.lock().unwrap().push(tx.clone());
            Ok(())
        }

        async fn expenses_by_date(&self, target: NaiveDate) -> (f64, Vec<String>) {
            let key = target.to_string();
            self.queried_dates.lock().unwrap().push(key.clone());
            self.expenses
                .lock()
                .unwrap()
                .iter()
                .find(|(date, _, _)| *date == key)
                .map(|(_, total, items)| (*total, items.clone()))
                .unwrap_or((0.0, Vec::new()))
        }

        async fn today_total(&self) -> f64 {
            0.0
        }

        async fn append_memory(
            &self,
            category: &str,
            observation: &str,
            context: Option<&str>,
        ) -> bool {
            self.memories.lock().unwrap().push(MemoryEntry {
                date: "2026-08-08".to_string(),
                category: category.to_string(),
                observation: observation.to_string(),
                context: context.map(str::to_string),
            });
            true
        }

        async fn memories_text(&self) -> String {
            let memories = self.memories.lock().unwrap();
            if memories.is_empty() {
                MEMORY_EMPTY.to_string()
            } else {
                memories
                    .iter()
                    .map(MemoryEntry::bullet)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }

        async fn assets(&self) -> Assets {
            Assets::default()
        }

        async fn update_asset(&self, _category: &str, _amount: f64) -> bool {
            true
        }

        async fn pending_tasks(&self) -> Vec<Task> {
            Vec::new()
        }

        async fn add_task(&self, _name: &str, _priority: &str) -> bool {
            true
        }
    }

    struct StubDeploy {
        deployments: Vec<Deployment>,
        projects: Vec<String>,
    }

    impl StubDeploy {
        fn empty() -> Self {
            Self {
                deployments: Vec::new(),
                projects: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl DeployStatus for StubDeploy {
        async fn latest_deployments(&self, _limit: usize) -> crate::error::Result<Vec<Deployment>> {
            Ok(self.deployments.clone())
        }

        async fn project_names(&self) -> crate::error::Result<Vec<String>> {
            Ok(self.projects.clone())
        }
    }

    fn router_with(store: MockStore, deploy: StubDeploy) -> (Router, Arc<MockStore>) {
        let store = Arc::new(store);
        let router = Router::new(store.clone(), Arc::new(deploy));
        (router, store)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
    }

    #[test]
    fn test_extract_envelope() {
        let v = extract_envelope(r#"Sure! {"type": "record", "amount": 5} done"#).unwrap();
        assert_eq!(v["type"], "record");

        assert!(extract_envelope("no json here at all").is_none());
        assert!(extract_envelope("} backwards {").is_none());
        assert!(extract_envelope("broken { not json }").is_none());
        // Arrays are not intent envelopes.
        assert!(extract_envelope("[1, 2, 3]").is_none());
    }

    #[tokio::test]
    async fn test_plain_text_passes_through_unchanged() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let reply = router.route("Good morning! Ready to win the day.", today()).await;
        assert_eq!(reply, "Good morning! Ready to win the day.");
    }

    #[tokio::test]
    async fn test_unparseable_span_passes_through() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = "I think {this is not json} honestly";
        assert_eq!(router.route(raw, today()).await, raw);
    }

    #[tokio::test]
    async fn test_record_appends_once_and_confirms() {
        let (router, store) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "record", "date": "2026-08-08", "item": "Coffee", "amount": 12.5, "category": "Food", "comment": "again?"}"#;

        let reply = router.route(raw, today()).await;

        let transactions = store.transactions.lock().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].item, "Coffee");
        assert_eq!(transactions[0].amount, 12.5);
        assert_eq!(transactions[0].comment.as_deref(), Some("again?"));
        assert!(reply.contains("Coffee"));
        assert!(reply.contains("12.5"));
    }

    #[tokio::test]
    async fn test_record_missing_keys_is_system_error() {
        let (router, store) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "record", "item": "Coffee"}"#;

        let reply = router.route(raw, today()).await;

        assert!(reply.starts_with("System error:"));
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_store_failure_is_contained() {
        let store = MockStore {
            fail_appends: true,
            ..Default::default()
        };
        let (router, _) = router_with(store, StubDeploy::empty());
        let raw = r#"{"type": "record", "date": "2026-08-08", "item": "Coffee", "amount": 5, "category": "Food"}"#;

        let reply = router.route(raw, today()).await;
        assert!(reply.starts_with("System error:"));
    }

    #[tokio::test]
    async fn test_unknown_type_passes_through() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "unknown_cmd", "stuff": 1}"#;
        assert_eq!(router.route(raw, today()).await, raw);
    }

    #[tokio::test]
    async fn test_missing_type_passes_through() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"item": "Coffee"}"#;
        assert_eq!(router.route(raw, today()).await, raw);
    }

    #[tokio::test]
    async fn test_query_finance_defaults_to_today() {
        let store = MockStore::with_expenses("2026-08-08", 17.5, vec!["Coffee (12.5)", "Bus (5)"]);
        let (router, store) = router_with(store, StubDeploy::empty());

        let reply = router
            .route(r#"{"type": "query_finance"}"#, today())
            .await;

        assert_eq!(
            *store.queried_dates.lock().unwrap(),
            vec!["2026-08-08".to_string()]
        );
        assert!(reply.contains("RM17.50"));
        assert!(reply.contains("- Coffee (12.5)"));
    }

    #[tokio::test]
    async fn test_query_finance_with_target_date() {
        let store = MockStore::with_expenses("2026-08-01", 99.0, vec!["Books (99)"]);
        let (router, store) = router_with(store, StubDeploy::empty());

        let reply = router
            .route(
                r#"{"type": "query_finance", "target_date": "2026-08-01"}"#,
                today(),
            )
            .await;

        assert_eq!(
            *store.queried_dates.lock().unwrap(),
            vec!["2026-08-01".to_string()]
        );
        assert!(reply.contains("2026-08-01"));
        assert!(reply.contains("RM99.00"));
    }

    #[tokio::test]
    async fn test_query_finance_empty_day_still_reports() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let reply = router
            .route(r#"{"type": "query_finance"}"#, today())
            .await;

        assert!(reply.contains("RM0.00"));
        assert!(!reply.contains("\n- "));
    }

    #[tokio::test]
    async fn test_query_finance_bad_date_is_system_error() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let reply = router
            .route(
                r#"{"type": "query_finance", "target_date": "next tuesday"}"#,
                today(),
            )
            .await;
        assert!(reply.starts_with("System error:"));
    }

    #[tokio::test]
    async fn test_vercel_status_report() {
        let deploy = StubDeploy {
            deployments: vec![Deployment {
                name: "site".to_string(),
                state: "READY".to_string(),
                url: "site.example.com".to_string(),
            }],
            projects: Vec::new(),
        };
        let (router, _) = router_with(MockStore::default(), deploy);

        let reply = router
            .route(r#"{"type": "query_vercel", "action": "status"}"#, today())
            .await;

        assert!(reply.contains("✅"));
        assert!(reply.contains("site"));
        assert!(reply.contains("READY"));
        assert!(reply.contains("site.example.com"));
    }

    #[tokio::test]
    async fn test_vercel_list_projects() {
        let deploy = StubDeploy {
            deployments: Vec::new(),
            projects: vec!["octavia".to_string(), "landing".to_string()],
        };
        let (router, _) = router_with(MockStore::default(), deploy);

        let reply = router
            .route(
                r#"{"type": "query_vercel", "action": "list_projects"}"#,
                today(),
            )
            .await;

        assert!(reply.contains("octavia, landing"));
    }

    #[tokio::test]
    async fn test_vercel_unknown_action_passes_through() {
        let (router, _) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "query_vercel", "action": "redeploy"}"#;
        assert_eq!(router.route(raw, today()).await, raw);
    }

    #[tokio::test]
    async fn test_food_analysis_saves_memory_then_replies() {
        let (router, store) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "food_analysis", "item": "Nasi Lemak", "calories": 644,
            "macros": {"protein": "18g", "carbs": "80g", "fats": "28g"},
            "advice": "Heavy lunch. Walk it off.",
            "memory_to_save": "User eats nasi lemak on Fridays"}"#;

        let reply = router.route(raw, today()).await;

        let memories = store.memories.lock().unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].category, "Bio-Hacker");
        assert_eq!(memories[0].observation, "User eats nasi lemak on Fridays");
        assert_eq!(memories[0].context.as_deref(), Some("Visual Observation"));

        assert!(reply.contains("Nasi Lemak"));
        assert!(reply.contains("644"));
        assert!(reply.contains("18g"));
        assert!(reply.contains("Walk it off."));
    }

    #[tokio::test]
    async fn test_food_analysis_without_memory_saves_nothing() {
        let (router, store) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"{"type": "food_analysis", "item": "Salad", "calories": 150,
            "macros": {"protein": "5g", "carbs": "10g", "fats": "8g"},
            "advice": "Good choice.", "memory_to_save": ""}"#;

        router.route(raw, today()).await;
        assert!(store.memories.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_envelope_embedded_in_prose_still_routes() {
        let (router, store) = router_with(MockStore::default(), StubDeploy::empty());
        let raw = r#"On it, boss.
{"type": "record", "date": "2026-08-08", "item": "Taxi", "amount": 30, "category": "Transport"}
Anything else?"#;

        let reply = router.route(raw, today()).await;
        assert_eq!(store.transactions.lock().unwrap().len(), 1);
        assert!(reply.contains("Taxi"));
    }
}
