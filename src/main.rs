use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use onchain_dashboard_lib::commands::{chat, indicator};
use onchain_dashboard_lib::config::Config;
use onchain_dashboard_lib::core::scheduler::{self, TickOutcome};
use onchain_dashboard_lib::llm::LLMProviderType;
use onchain_dashboard_lib::{init_tracing, AppContext};

#[derive(Parser)]
#[command(name = "onchain-dashboard", about = "Bitcoin on-chain indicator dashboard")]
struct Cli {
    /// Load config from a specific .env file
    #[arg(long, global = true)]
    config_file: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print every indicator and the overall recommendation
    Show,
    /// Manually edit an indicator's readings
    Edit {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        value: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        value2: Option<String>,
    },
    /// Fetch the spot price once
    Refresh,
    /// Halving cycle day count and projected windows
    Cycle,
    /// Refresh periodically until Ctrl+C
    Run,
    /// Ask the on-chain assistant (interactive without text)
    Chat { text: Vec<String> },
    /// Store the chat provider, model or API key
    Settings {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env_file(cli.config_file.as_deref())?;
    let ctx = AppContext::init(config).await?;

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {
            print!("{}", indicator::format_snapshot(&ctx.dashboard.snapshot()));
        }
        Command::Edit { id, value, value2 } => {
            let snapshot = indicator::edit_indicator(&ctx.dashboard, &id, value.as_deref(), value2.as_deref()).await?;
            print!("{}", indicator::format_snapshot(&snapshot));
        }
        Command::Refresh => {
            let refresher = ctx.price_refresher()?;
            match refresher.refresh_once().await {
                TickOutcome::Applied(_) => info!("Price refreshed"),
                TickOutcome::Superseded => info!("Refresh superseded by a newer edit"),
                TickOutcome::Skipped | TickOutcome::Stopped => {}
                TickOutcome::Failed(e) => warn!("Refresh failed, keeping previous readings: {}", e),
            }
            print!("{}", indicator::format_snapshot(&ctx.dashboard.snapshot()));
        }
        Command::Cycle => {
            let today = Utc::now().date_naive();
            print!("{}", indicator::format_cycle(&ctx.dashboard.snapshot(), today));
        }
        Command::Run => {
            let refresher = ctx.price_refresher()?;
            let handle = scheduler::start(
                refresher,
                ctx.config.refresh_interval,
                ctx.config.refresh_startup_delay,
            )
            .await?;

            let mut rx = ctx.dashboard.subscribe();
            print!("{}", indicator::format_snapshot(&rx.borrow_and_update()));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = rx.borrow_and_update().clone();
                        print!("{}", indicator::format_snapshot(&snapshot));
                    }
                }
            }

            info!("Shutting down...");
            handle.stop().await?;
            ctx.dashboard.flush().await;
        }
        Command::Chat { text } => {
            let mut session = chat::open_session(&ctx.pool, &ctx.config).await?;
            if text.is_empty() {
                chat::interactive(&mut session).await?;
            } else if let Some(reply) = chat::ask(&mut session, &text.join(" ")).await {
                println!("{}", reply);
            }
        }
        Command::Settings { provider, model, api_key } => {
            let update = chat::SettingsUpdate { provider, model, api_key };
            let settings = chat::update_settings(&ctx.pool, &ctx.config, update).await?;
            let (model, key) = match settings.provider {
                LLMProviderType::Gemini => (&settings.gemini_model, &settings.gemini_api_key),
                LLMProviderType::OpenAI => (&settings.openai_model, &settings.openai_api_key),
            };
            println!(
                "provider: {}\nmodel: {}\napi key: {}",
                settings.provider.as_str(),
                model,
                if key.is_some() { "set" } else { "not set" }
            );
        }
    }

    Ok(())
}
