//! bioscience — NASA space biology publications from the terminal.
//! Entry point for the CLI binary.

mod commands;
mod config;
mod render;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bioscience_common::entities::{ExtractType, SortBy, SortOrder, SummaryStyle};

/// Search, browse and question NASA bioscience publications
#[derive(Parser, Debug)]
#[command(name = "bioscience", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file and BIOSCIENCE_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Serve requests from the bundled sample dataset instead of a backend
    #[arg(long, global = true)]
    offline: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check backend and model availability
    Health {
        /// Keep polling on the configured interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// Search publications
    Search(SearchArgs),
    /// Show one publication, optionally with an AI summary
    Show {
        id: String,
        /// Generate a structured AI summary
        #[arg(short, long)]
        summary: bool,
        /// Print the summary at once instead of typing it out
        #[arg(long)]
        no_animate: bool,
    },
    /// Dashboard statistics
    Stats,
    /// Ask a research question
    Ask {
        question: String,
        /// Extra context passed to the model
        #[arg(long)]
        context: Option<String>,
    },
    /// Multi-turn conversation with the research assistant
    Chat,
    /// Summarize a research topic
    Summarize {
        topic: String,
        #[arg(long, value_enum)]
        style: Option<StyleArg>,
    },
    /// Extract structured information from text
    Extract {
        text: String,
        #[arg(long = "type", value_enum)]
        extract_type: Option<ExtractArg>,
    },
    /// Identify research gaps
    Gaps {
        area: Option<String>,
    },
    /// Compare two research topics
    Compare {
        topic1: String,
        topic2: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Free-text query over titles, abstracts, tags and authors
    pub query: Option<String>,
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
    /// Earliest publication year
    #[arg(long)]
    pub from: Option<i32>,
    /// Latest publication year
    #[arg(long)]
    pub to: Option<i32>,
    /// Required tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,
    /// Browse results interactively
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SortArg {
    Relevance,
    Title,
    Year,
}

impl From<SortArg> for SortBy {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Relevance => SortBy::Relevance,
            SortArg::Title     => SortBy::Title,
            SortArg::Year      => SortBy::Year,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(o: OrderArg) -> Self {
        match o {
            OrderArg::Asc  => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StyleArg {
    Concise,
    Detailed,
    Technical,
}

impl From<StyleArg> for SummaryStyle {
    fn from(s: StyleArg) -> Self {
        match s {
            StyleArg::Concise   => SummaryStyle::Concise,
            StyleArg::Detailed  => SummaryStyle::Detailed,
            StyleArg::Technical => SummaryStyle::Technical,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ExtractArg {
    KeyFindings,
    Organisms,
    Methods,
    Results,
}

impl From<ExtractArg> for ExtractType {
    fn from(e: ExtractArg) -> Self {
        match e {
            ExtractArg::KeyFindings => ExtractType::KeyFindings,
            ExtractArg::Organisms   => ExtractType::Organisms,
            ExtractArg::Methods     => ExtractType::Methods,
            ExtractArg::Results     => ExtractType::Results,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "bioscience=info,warn",
        1 => "bioscience=debug,info",
        _ => "bioscience=trace,debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.api.base_url = url;
    }
    if cli.offline {
        config.api.offline = true;
    }
    debug!(?config, "Configuration loaded");
    if config.api.offline {
        info!("Offline mode: serving the bundled sample dataset");
    }

    let app = commands::App::new(config)?;

    match cli.command {
        Commands::Health { watch } => commands::health(&app, watch).await,
        Commands::Search(args) => commands::search(&app, args).await,
        Commands::Show { id, summary, no_animate } => commands::show(&app, &id, summary, !no_animate).await,
        Commands::Stats => commands::stats(&app).await,
        Commands::Ask { question, context } => commands::ask(&app, question, context).await,
        Commands::Chat => commands::chat(&app).await,
        Commands::Summarize { topic, style } => commands::summarize(&app, topic, style.map(Into::into)).await,
        Commands::Extract { text, extract_type } => {
            commands::extract(&app, text, extract_type.map(Into::into)).await
        }
        Commands::Gaps { area } => commands::gaps(&app, area).await,
        Commands::Compare { topic1, topic2 } => commands::compare(&app, topic1, topic2).await,
    }
}
