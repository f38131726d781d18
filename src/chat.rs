//! Chat surface - one assistant turn, and the interactive loop around it.
//!
//! Turns are handled strictly one at a time: inference, optional store
//! access, reply formatting, then the next line is read.

use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::Router;
use crate::error::Result;
use crate::persona;
use crate::providers::{Inference, UserInput};
use crate::store::Store;
use crate::vercel::DeployStatus;

/// The assembled assistant: inference provider, backing store, and router.
pub struct Assistant {
    provider: Arc<dyn Inference>,
    store: Arc<dyn Store>,
    router: Router,
}

impl Assistant {
    pub fn new(
        provider: Arc<dyn Inference>,
        store: Arc<dyn Store>,
        deploy: Arc<dyn DeployStatus>,
    ) -> Self {
        let router = Router::new(store.clone(), deploy);
        Self {
            provider,
            store,
            router,
        }
    }

    /// Handle one user input to completion and return the reply text.
    /// Failures never escape; they come back as a system-error reply.
    pub async fn turn(&self, input: UserInput) -> String {
        let today = Local::now().date_naive();

        // Fresh memory text every turn; the persona embeds it whole.
        let memory = self.store.memories_text().await;
        let prompt = persona::build_prompt(today, &memory);

        let raw = match self.provider.infer(&prompt, &input).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Inference failed: {}", e);
                return format!("System error: {}", e);
            }
        };

        self.router.route(&raw, today).await
    }
}

/// One transcript line of the interactive session.
#[allow(dead_code)]
struct TranscriptEntry {
    input: String,
    reply: String,
}

/// Run the interactive chat loop on stdin/stdout.
///
/// `/image <path>` and `/audio <path>` attach media; `quit` or `exit`
/// leaves the loop.
pub async fn run_repl(assistant: &Assistant) -> Result<()> {
    println!("{}", "=".repeat(50));
    println!("🦅 {} ready. Ask away.", persona::ASSISTANT_NAME);
    println!("Try: \"How much did I spend yesterday?\" or \"Check Vercel status\"");
    println!("Attachments: /image <path>, /audio <path>. Type 'quit' to leave.");
    println!("{}", "=".repeat(50));

    let mut transcript: Vec<TranscriptEntry> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let input = match parse_input_line(&line) {
            Ok(input) => input,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let reply = assistant.turn(input).await;
        println!("{}\n", reply);

        transcript.push(TranscriptEntry {
            input: line,
            reply,
        });
    }

    tracing::info!("Chat session ended after {} turn(s)", transcript.len());
    Ok(())
}

/// Turn a REPL line into a `UserInput`, loading attachment bytes.
fn parse_input_line(line: &str) -> std::result::Result<UserInput, String> {
    if let Some(path) = line.strip_prefix("/image ") {
        return load_attachment(path.trim(), false);
    }
    if let Some(path) = line.strip_prefix("/audio ") {
        return load_attachment(path.trim(), true);
    }
    Ok(UserInput::Text(line.to_string()))
}

pub fn load_attachment(path: &str, audio: bool) -> std::result::Result<UserInput, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Could not read {}: {}", path, e))?;
    let mime = guess_mime(Path::new(path), audio).to_string();

    Ok(if audio {
        UserInput::Audio { bytes, mime }
    } else {
        UserInput::Image { bytes, mime }
    })
}

fn guess_mime(path: &Path, audio: bool) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        _ if audio => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::store::UnavailableStore;
    use crate::vercel::{DeployStatus, Deployment};
    use async_trait::async_trait;

    /// Provider that replies with a canned string, or always fails.
    struct StubProvider {
        reply: Option<String>,
    }

    #[async_trait]
    impl Inference for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn infer(&self, _persona: &str, _input: &UserInput) -> crate::providers::Result<String> {
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ProviderError::NotAvailable("stub down".to_string())),
            }
        }
    }

    struct NoDeploys;

    #[async_trait]
    impl DeployStatus for NoDeploys {
        async fn latest_deployments(
            &self,
            _limit: usize,
        ) -> crate::error::Result<Vec<Deployment>> {
            Ok(Vec::new())
        }

        async fn project_names(&self) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn assistant_with(reply: Option<&str>) -> Assistant {
        Assistant::new(
            Arc::new(StubProvider {
                reply: reply.map(str::to_string),
            }),
            Arc::new(UnavailableStore::new("test mode")),
            Arc::new(NoDeploys),
        )
    }

    #[tokio::test]
    async fn test_chat_turn_echoes_plain_reply() {
        let assistant = assistant_with(Some("Hello boss."));
        let reply = assistant.turn(UserInput::Text("hi".to_string())).await;
        assert_eq!(reply, "Hello boss.");
    }

    #[tokio::test]
    async fn test_chat_turn_contains_inference_failure() {
        let assistant = assistant_with(None);
        let reply = assistant.turn(UserInput::Text("hi".to_string())).await;
        assert!(reply.starts_with("System error:"));
    }

    #[tokio::test]
    async fn test_degraded_store_still_answers_queries() {
        // Chat-only degraded mode: a finance query resolves to a report
        // with total 0 and the diagnostic item.
        let assistant = assistant_with(Some(r#"{"type": "query_finance"}"#));
        let reply = assistant.turn(UserInput::Text("spend?".to_string())).await;
        assert!(reply.contains("RM0.00"));
        assert!(reply.contains("backing store unavailable"));
    }

    #[test]
    fn test_parse_input_line() {
        assert!(matches!(
            parse_input_line("hello").unwrap(),
            UserInput::Text(t) if t == "hello"
        ));
        assert!(parse_input_line("/image /no/such/file.png").is_err());
        assert!(parse_input_line("/audio /no/such/file.wav").is_err());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("x.PNG"), false), "image/png");
        assert_eq!(guess_mime(Path::new("x.jpeg"), false), "image/jpeg");
        assert_eq!(guess_mime(Path::new("x.wav"), true), "audio/wav");
        assert_eq!(guess_mime(Path::new("recording"), true), "audio/webm");
        assert_eq!(
            guess_mime(Path::new("blob.bin"), false),
            "application/octet-stream"
        );
    }
}
