//! CLI commands for Octavia using clap.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::{self, Assistant};
use crate::config::{load_settings_or_default, write_settings_skeleton, Settings};
use crate::providers::{create_provider, UserInput};
use crate::store::{self, SheetStore, Store};
use crate::vercel::{self, DeployStatus, VercelClient};

/// Octavia - voice, vision, and text personal assistant.
#[derive(Parser)]
#[command(name = "octavia")]
#[command(version = "0.1.0")]
#[command(about = "Octavia - personal assistant with LLM intent routing", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the interactive chat loop
    Chat,

    /// Send one message and print the reply
    Send {
        /// Message text (optional when an attachment is given)
        message: Option<String>,

        /// Attach an image file
        #[arg(long)]
        image: Option<PathBuf>,

        /// Attach an audio file
        #[arg(long)]
        audio: Option<PathBuf>,
    },

    /// Query expenses for a date (defaults to today)
    Finance {
        /// Target date, YYYY-MM-DD
        date: Option<String>,
    },

    /// Deployment platform status
    #[command(subcommand)]
    Vercel(VercelCommand),

    /// Asset dashboard
    Assets {
        #[command(subcommand)]
        action: Option<AssetCommand>,
    },

    /// Task list
    Tasks {
        #[command(subcommand)]
        action: Option<TaskCommand>,
    },

    /// Long-term memory
    #[command(subcommand)]
    Memory(MemoryCommand),

    /// Run diagnostics on credentials and worksheet schemas
    Doctor,

    /// Write a settings skeleton
    Setup,
}

#[derive(Subcommand)]
pub enum VercelCommand {
    /// Show the latest deployments
    Status,

    /// List projects
    Projects,
}

#[derive(Subcommand)]
pub enum AssetCommand {
    /// Set an asset category amount
    Set {
        /// Category label, e.g. Cash
        category: String,

        /// Amount
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a pending task
    Add {
        /// Task text
        task: String,

        /// Priority label
        #[arg(long, default_value = "Medium")]
        priority: String,
    },
}

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// Show the memory bank
    List,

    /// Save an observation
    Add {
        /// Observation text
        observation: String,

        /// Source tag
        #[arg(long, default_value = "Manual")]
        category: String,

        /// Optional context note
        #[arg(long)]
        context: Option<String>,
    },
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        let settings = load_settings_or_default();

        match &self.command {
            Command::Chat => cmd_chat(&settings).await,
            Command::Send {
                message,
                image,
                audio,
            } => cmd_send(&settings, message.as_deref(), image.as_deref(), audio.as_deref()).await,
            Command::Finance { date } => cmd_finance(&settings, date.as_deref()).await,
            Command::Vercel(action) => cmd_vercel(&settings, action).await,
            Command::Assets { action } => cmd_assets(&settings, action.as_ref()).await,
            Command::Tasks { action } => cmd_tasks(&settings, action.as_ref()).await,
            Command::Memory(action) => cmd_memory(&settings, action).await,
            Command::Doctor => cmd_doctor(&settings).await,
            Command::Setup => cmd_setup(),
        }
    }
}

// Command implementations

async fn build_assistant(settings: &Settings) -> Result<Assistant> {
    let provider = create_provider(settings)?;
    let store = store::connect(settings).await;
    let deploy: Arc<dyn DeployStatus> = Arc::new(VercelClient::new(settings));
    Ok(Assistant::new(provider, store, deploy))
}

async fn cmd_chat(settings: &Settings) -> Result<()> {
    let assistant = build_assistant(settings).await?;
    chat::run_repl(&assistant).await?;
    Ok(())
}

async fn cmd_send(
    settings: &Settings,
    message: Option<&str>,
    image: Option<&std::path::Path>,
    audio: Option<&std::path::Path>,
) -> Result<()> {
    let input = if let Some(path) = image {
        chat::load_attachment(&path.to_string_lossy(), false)
            .map_err(anyhow::Error::msg)?
    } else if let Some(path) = audio {
        chat::load_attachment(&path.to_string_lossy(), true)
            .map_err(anyhow::Error::msg)?
    } else if let Some(text) = message {
        UserInput::Text(text.to_string())
    } else {
        anyhow::bail!("Nothing to send: give a message or an attachment");
    };

    let assistant = build_assistant(settings).await?;
    let reply = assistant.turn(input).await;
    println!("{}", reply);
    Ok(())
}

async fn cmd_finance(settings: &Settings, date: Option<&str>) -> Result<()> {
    let target = match date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date '{}': {}", raw, e))?,
        None => Local::now().date_naive(),
    };

    let store = store::connect(settings).await;
    let (total, items) = store.expenses_by_date(target).await;

    println!("💰 {} expense report", target);
    println!("Total: RM{:.2}", total);
    for item in items {
        println!("- {}", item);
    }
    Ok(())
}

async fn cmd_vercel(settings: &Settings, action: &VercelCommand) -> Result<()> {
    let client = VercelClient::new(settings);

    match action {
        VercelCommand::Status => {
            let deployments = client
                .latest_deployments(settings.vercel.deploy_limit)
                .await?;
            println!("{}", vercel::format_status_report(&deployments));
        }
        VercelCommand::Projects => {
            let names = client.project_names().await?;
            println!("{}", vercel::format_project_list(&names));
        }
    }
    Ok(())
}

async fn cmd_assets(settings: &Settings, action: Option<&AssetCommand>) -> Result<()> {
    let store = store::connect(settings).await;

    if let Some(AssetCommand::Set { category, amount }) = action {
        if store.update_asset(category, *amount).await {
            println!("Updated {} to {}", category, amount);
        } else {
            println!("Could not update {} (store unavailable?)", category);
        }
    }

    let assets = store.assets().await;
    println!("💰 Wealth dashboard");
    for (category, amount) in &assets.categories {
        println!("  {}: RM{:.2}", category, amount);
    }
    println!("  NetWorth: RM{:.2}", assets.net_worth());
    Ok(())
}

async fn cmd_tasks(settings: &Settings, action: Option<&TaskCommand>) -> Result<()> {
    let store = store::connect(settings).await;

    if let Some(TaskCommand::Add { task, priority }) = action {
        if store.add_task(task, priority).await {
            println!("Added: {} [{}]", task, priority);
        } else {
            println!("Could not add task (store unavailable?)");
        }
    }

    let pending = store.pending_tasks().await;
    if pending.is_empty() {
        println!("No pending tasks.");
        return Ok(());
    }

    println!("📋 Pending tasks ({})", pending.len());
    for task in pending {
        println!("  [{}] {} ({})", task.priority, task.task, task.date);
    }
    Ok(())
}

async fn cmd_memory(settings: &Settings, action: &MemoryCommand) -> Result<()> {
    let store = store::connect(settings).await;

    match action {
        MemoryCommand::List => {
            println!("{}", store.memories_text().await);
        }
        MemoryCommand::Add {
            observation,
            category,
            context,
        } => {
            if store
                .append_memory(category, observation, context.as_deref())
                .await
            {
                println!("Saved.");
            } else {
                println!("Could not save memory (store unavailable?)");
            }
        }
    }
    Ok(())
}

async fn cmd_doctor(settings: &Settings) -> Result<()> {
    println!("Running Octavia diagnostics...\n");

    let mut issues = Vec::new();

    print!("📋 Inference key... ");
    if settings.gemini_api_key().is_some() {
        println!("✓");
    } else {
        println!("✗");
        issues.push("GEMINI_API_KEY not set (chat will not start)".to_string());
    }

    print!("📋 Vercel token... ");
    if settings.vercel_token().is_some() {
        println!("✓");
    } else {
        println!("⚠ (not set, deployment reports degrade to an error reply)");
    }

    print!("📋 Backing store + worksheet schemas... ");
    match SheetStore::connect(settings).await {
        Ok(_) => println!("✓"),
        Err(e) => {
            println!("✗ ({})", e);
            issues.push(format!("Backing store unavailable: {}", e));
        }
    }

    if issues.is_empty() {
        println!("\n✅ Doctor passed.");
        Ok(())
    } else {
        println!("\nIssues:");
        for issue in &issues {
            println!("  - {}", issue);
        }
        Err(anyhow::anyhow!("Doctor found {} issue(s)", issues.len()))
    }
}

fn cmd_setup() -> Result<()> {
    let path = write_settings_skeleton()?;
    println!("Settings file: {}", path.display());
    println!("Fill in gemini.api_key (or set GEMINI_API_KEY), sheets.spreadsheet_id,");
    println!("sheets.service_account_file, and vercel.token as needed.");
    Ok(())
}
