use anyhow::Result;
use backlog_core::hierarchy::ItemKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "backlog")]
#[command(about = "Backlog CLI - generate, review and commit hierarchical work items", long_about = None)]
struct Cli {
    /// Directory holding config.toml, backlog.toml and audit.jsonl
    #[arg(long, global = true, env = "BACKLOG_HOME")]
    home: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage business briefs
    Brief {
        #[command(subcommand)]
        action: BriefAction,
    },
    /// List the children of a brief or work item
    List {
        #[arg(long)]
        parent_type: ItemKind,
        #[arg(long)]
        parent_id: String,
    },
    /// Generate child candidates, review them and commit the kept ones
    Generate(commands::generate::GenerateArgs),
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
enum BriefAction {
    /// Add or replace a business brief
    Add(BriefArgs),
    /// List business briefs
    List,
}

#[derive(Args)]
struct BriefArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    objective: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    let app = app::AppContext::load(cli.home)?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config::init(&app)?,
            ConfigAction::Show => commands::config::show(&app)?,
        },
        Commands::Brief { action } => match action {
            BriefAction::Add(args) => {
                commands::brief::add(&app, args.id, args.title, args.description, args.objective)
                    .await?
            }
            BriefAction::List => commands::brief::list(&app).await?,
        },
        Commands::List {
            parent_type,
            parent_id,
        } => commands::list::children(&app, parent_type, &parent_id).await?,
        Commands::Generate(args) => commands::generate::run(&app, args).await?,
    }

    Ok(())
}
