//! Reverb command-line entry point: run the webhook server or operate on the
//! rules document and reply log from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use reverb_engine::{RuleEngine, SlidingWindowRateLimiter, ThreadRngSampler, WebhookProcessor};
use reverb_gateway::{LineClient, LineClientConfig, DEFAULT_LINE_API_BASE};
use reverb_server::{run_server, AppState, ServerConfig};
use reverb_store::{
    inspect_rules_file, render_reply_log_stats_report, render_rules_inspect_report,
    render_rules_template_report, render_rules_validate_report, validate_rules_file,
    write_rules_template, FileRuleStore, NdjsonReplyLogStore, RulesTemplateConfig,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "reverb",
    about = "Rule-based auto-reply engine for messaging platform webhooks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook server.
    Serve(ServeArgs),
    /// Author and check the rules document.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Query the reply audit log.
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to bind the webhook listener on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
    /// Account whose rules this deployment serves.
    #[arg(long, env = "REVERB_ACCOUNT_ID")]
    account_id: String,
    /// Shared secret for webhook signature verification.
    #[arg(long, env = "LINE_CHANNEL_SECRET", hide_env_values = true)]
    channel_secret: String,
    /// Bearer token for the platform messaging API.
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    channel_access_token: String,
    /// Rules document consulted once per webhook batch.
    #[arg(long, default_value = "rules.json")]
    rules_file: PathBuf,
    /// Append-only reply audit log.
    #[arg(long, default_value = "reply-log.ndjson")]
    reply_log_file: PathBuf,
    /// Platform API base url.
    #[arg(long, default_value = DEFAULT_LINE_API_BASE)]
    api_base: String,
    /// Outbound HTTP timeout in milliseconds.
    #[arg(long, default_value_t = 5_000, value_parser = parse_positive_u64)]
    http_timeout_ms: u64,
}

#[derive(Debug, Subcommand)]
enum RulesCommand {
    /// Write a starter rules document.
    Template {
        #[arg(long, default_value = "rules.json")]
        rules_file: PathBuf,
        #[arg(long, env = "REVERB_ACCOUNT_ID")]
        account_id: String,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Validate a rules document, reporting every diagnostic.
    Validate {
        #[arg(long, default_value = "rules.json")]
        rules_file: PathBuf,
    },
    /// Summarize a valid rules document.
    Inspect {
        #[arg(long, default_value = "rules.json")]
        rules_file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum LogsCommand {
    /// Aggregate reply outcomes for one account.
    Stats {
        #[arg(long, default_value = "reply-log.ndjson")]
        reply_log_file: PathBuf,
        #[arg(long, env = "REVERB_ACCOUNT_ID")]
        account_id: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Rules { command } => run_rules(command),
        Command::Logs { command } => run_logs(command),
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let gateway = LineClient::new(LineClientConfig {
        api_base: args.api_base,
        channel_access_token: args.channel_access_token,
        http_timeout_ms: args.http_timeout_ms,
    })?;
    let engine = RuleEngine::new(
        Arc::new(SlidingWindowRateLimiter::new()),
        Arc::new(NdjsonReplyLogStore::new(args.reply_log_file)),
        Arc::new(gateway),
        Arc::new(ThreadRngSampler),
    );
    let processor = WebhookProcessor::new(Arc::new(FileRuleStore::new(args.rules_file)), engine);
    let state = Arc::new(AppState {
        account_id: args.account_id,
        channel_secret: args.channel_secret,
        processor,
    });
    run_server(ServerConfig { bind: args.bind }, state).await
}

fn run_rules(command: RulesCommand) -> Result<()> {
    match command {
        RulesCommand::Template {
            rules_file,
            account_id,
            overwrite,
        } => {
            let report = write_rules_template(&RulesTemplateConfig {
                target_path: rules_file,
                account_id,
                overwrite,
            })?;
            println!("{}", render_rules_template_report(&report));
            Ok(())
        }
        RulesCommand::Validate { rules_file } => {
            let report = validate_rules_file(&rules_file);
            println!("{}", render_rules_validate_report(&report));
            if !report.is_valid() {
                bail!(
                    "rules document failed validation with {} diagnostic(s)",
                    report.diagnostics.len()
                );
            }
            Ok(())
        }
        RulesCommand::Inspect { rules_file } => {
            let report = inspect_rules_file(&rules_file)?;
            println!("{}", render_rules_inspect_report(&report));
            Ok(())
        }
    }
}

fn run_logs(command: LogsCommand) -> Result<()> {
    match command {
        LogsCommand::Stats {
            reply_log_file,
            account_id,
        } => {
            let stats = NdjsonReplyLogStore::new(reply_log_file).stats(&account_id)?;
            println!("{}", render_reply_log_stats_report(&stats));
            Ok(())
        }
    }
}
