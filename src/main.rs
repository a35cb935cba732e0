//! prpanel - multi-agent pull request reviewer
//!
//! A CLI tool that has five specialist LLM reviewers read a GitHub pull
//! request through the GitHub MCP server, in parallel, and a tech lead
//! consolidate their findings into a single review decision.
//!
//! Exit codes:
//!   0 - Review completed and results written
//!   1 - Missing configuration or runtime error

mod agent;
mod analysis;
mod cli;
mod config;
mod engine;
mod gateway;
mod models;
mod report;

#[cfg(test)]
mod testing;

use agent::roles::{
    render_specialist_instruction, SPECIALISTS, TECH_LEAD_NAME, TECH_LEAD_OUTPUT_KEY,
};
use agent::tools::missing_tools;
use agent::ReviewOrchestrator;
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, ConfigError, Settings, CONFIG_FILE_NAME, REQUIRED_VARS};
use engine::{resolve_access_token, ReasoningEngine, VertexEngine};
use gateway::{McpGateway, ToolGateway};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const RULE: &str = "================================================================================";

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("prpanel v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Config file: {:?}, dry run: {}",
        args.config, args.dry_run
    );

    match run_review(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(config_error) = e.downcast_ref::<ConfigError>() {
                print_config_help(config_error);
            } else {
                error!("Review failed: {:#}", e);
                eprintln!("\n❌ Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .prpanel.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, gateway and report outputs.");
    Ok(())
}

/// Initialize logging based on verbosity settings; `RUST_LOG` wins when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn print_config_help(error: &ConfigError) {
    eprintln!("❌ Error: {}", error);
    eprintln!("\nRequired environment variables:");
    for (name, description) in REQUIRED_VARS {
        eprintln!("  - {}: {}", name, description);
    }
}

/// Run the complete review workflow.
async fn run_review(args: Args) -> Result<()> {
    println!("\n{}", RULE);
    println!("🚀 Multi-Agent PR Review");
    println!("{}", RULE);

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let settings = Settings::resolve(config, &args)?;

    print_banner(&settings);

    let gateway = Arc::new(McpGateway::new(settings.mcp_config())?);
    discover_tools(gateway.as_ref()).await;

    if args.dry_run {
        print_plan(&settings);
        return Ok(());
    }

    let token = resolve_access_token(settings.access_token.as_deref())
        .await
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let engine = Arc::new(VertexEngine::new(&settings.vertex_config(), token)?);

    println!("🤖 Model: {}", engine.model_name());
    println!("👥 Running {} specialist reviews in parallel...\n", SPECIALISTS.len());

    let orchestrator = ReviewOrchestrator::new(engine, gateway, settings.agent_config())
        .with_progress(!args.quiet);
    let report = orchestrator.review(&settings.request).await;

    report::write_json_report(&report, &settings.output)?;
    println!("\n📄 Results saved to {}", settings.output.display());

    if let Some(ref markdown) = settings.markdown {
        report::write_markdown_report(&report, markdown)?;
        println!("📝 Markdown report saved to {}", markdown.display());
    }

    if !args.quiet {
        report::print_summary(&report);
    }

    info!(
        "Review of {} finished in {:.1}s: {} ({} findings)",
        report.pr,
        report.duration_seconds,
        report.final_decision,
        report.total_findings()
    );
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

fn print_banner(settings: &Settings) {
    println!("\n📋 Repository: {}", settings.request.full_name());
    println!("🔢 PR Number: #{}", settings.request.pr_number);
    println!("☁️  GCP Project: {}", settings.project_id);
    println!("📍 Location: {}", settings.location);
    println!("⏰ Time: {}", chrono::Local::now().to_rfc3339());
    println!("{}\n", RULE);
}

/// List the gateway's tools and warn about missing required ones.
async fn discover_tools(gateway: &dyn ToolGateway) {
    println!("🔧 Discovering available MCP tools...");
    match gateway.list_tools().await {
        Ok(tools) => {
            println!("✅ Found {} tools", tools.len());
            debug!("Gateway tools: {:?}", tools);
            for tool in missing_tools(&tools) {
                warn!("Required tool {} is not offered by the gateway", tool);
                println!("⚠️  Required tool missing: {}", tool);
            }
        }
        Err(e) => {
            warn!("Tool discovery failed: {}", e);
            println!("⚠️ Could not discover tools: {}", e);
        }
    }
}

/// Handle --dry-run: show what would run, without model calls.
fn print_plan(settings: &Settings) {
    println!("\n🔍 Dry run: no model calls will be made.\n");
    println!("   Session: {}", settings.request.session_key());
    println!("   Model: {}", settings.model.name);
    println!("   Specialists (in parallel):");
    for role in SPECIALISTS.iter() {
        let instruction = render_specialist_instruction(role, &settings.request);
        println!(
            "     - {} -> {} ({} chars of instruction)",
            role.description(),
            role.output_key(),
            instruction.chars().count()
        );
    }
    println!("   Then: {} -> {}", TECH_LEAD_NAME, TECH_LEAD_OUTPUT_KEY);
    println!("   Output: {}", settings.output.display());
    if let Some(ref markdown) = settings.markdown {
        println!("   Markdown: {}", markdown.display());
    }
    println!("\n✅ Dry run complete. No model calls were made.");
}
