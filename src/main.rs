use analysis_session::AnalysisSession;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use insight_core::{AppConfig, ErrorExt, SortOrder};
use job_client::{HttpJobClient, JobClient, SimulatedJobClient};
use review_pager::{FeedbackSection, PageLoad, ResultsDashboard};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CRATES: [&str; 5] = [
    "review_insight",
    "insight_core",
    "job_client",
    "review_pager",
    "analysis_session",
];

/// Review Insight: analyse app-store reviews into complaints, praise and
/// feature requests.
#[derive(Parser)]
#[command(name = "review-insight", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the analysis service, overriding the configuration.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level for this program's crates. `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis and print the report.
    Analyze {
        /// App store URL, e.g. https://play.google.com/store/apps/details?id=com.example
        url: String,

        /// Use the built-in simulated service instead of the HTTP API.
        #[arg(long)]
        demo: bool,

        /// Review order: date_desc, date_asc, rating_desc or rating_asc.
        #[arg(long, default_value = "date_desc")]
        sort: String,

        /// Only show reviews from this category.
        #[arg(long)]
        category: Option<String>,

        /// Number of review pages to print per section.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES
            .iter()
            .map(|name| format!("{}={}", name, level))
            .collect();
        EnvFilter::new(directives.join(","))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = load_config(&cli)?;
    tracing::debug!("Using analysis service at {}", config.api.base_url);

    match cli.command {
        Commands::Analyze {
            url,
            demo,
            sort,
            category,
            pages,
        } => {
            let sort: SortOrder = sort.parse()?;
            let client: Arc<dyn JobClient> = if demo {
                tracing::info!("Running against the simulated analysis service");
                Arc::new(SimulatedJobClient::new())
            } else {
                Arc::new(HttpJobClient::new(&config.api)?)
            };

            let session = AnalysisSession::new(client, &config)?;
            let dashboard = run_analysis(&session, &url).await?;
            print_report(&dashboard, sort, category.as_deref(), pages.max(1)).await
        }
    }
}

async fn run_analysis(session: &AnalysisSession, url: &str) -> anyhow::Result<ResultsDashboard> {
    let mut updates = session.subscribe();
    if let Err(e) = session.start(url).await {
        bail!("{}", e.user_friendly_message());
    }

    let mut last_progress = None;
    let mut last_tip = "";
    let snapshot = loop {
        let snapshot = updates.borrow_and_update().clone();
        if last_progress != Some((snapshot.progress, snapshot.stage.clone())) {
            println!("[{:>3}%] {}", snapshot.progress, snapshot.stage);
            last_progress = Some((snapshot.progress, snapshot.stage.clone()));
        }
        if snapshot.current_tip != last_tip {
            println!("      Tip: {}", snapshot.current_tip);
            last_tip = snapshot.current_tip;
        }
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        updates
            .changed()
            .await
            .context("analysis session closed unexpectedly")?;
    };

    if let Some(error) = snapshot.error {
        bail!("{}", error);
    }
    session
        .dashboard()
        .context("analysis finished without a result")
}

async fn print_report(
    dashboard: &ResultsDashboard,
    sort: SortOrder,
    category: Option<&str>,
    pages: u32,
) -> anyhow::Result<()> {
    let result = dashboard.result();
    println!();
    println!("{} ({:.1}\u{2605})", result.app.name, result.app.rating);
    println!(
        "{} reviews: {} complaints, {} praise, {} feature requests",
        result.kpi.total, result.kpi.complaints, result.kpi.praise, result.kpi.features
    );

    for section in dashboard.sections() {
        if let Some(name) = category {
            if section.total_count(Some(name)) == 0 {
                continue;
            }
        }
        print_section(section, sort, category, pages).await?;
    }
    Ok(())
}

async fn print_section(
    section: &FeedbackSection,
    sort: SortOrder,
    category: Option<&str>,
    pages: u32,
) -> anyhow::Result<()> {
    println!();
    println!(
        "== {} ({}) ==",
        section.kind().title(),
        section.total_count(category)
    );
    for c in section.categories() {
        println!("  {:<24} {}", c.subcategory, c.count);
    }

    let pager = section.pager(category);
    pager.set_sort_order(sort).await?;
    for _ in 1..pages {
        if pager.load_more().await? == PageLoad::Exhausted {
            break;
        }
    }

    let view = pager.view();
    if view.items.is_empty() {
        println!("  (no reviews)");
        return Ok(());
    }
    println!("  -- {} reviews, page {} --", view.sort_order, view.page);
    for item in &view.items {
        match item.confidence {
            Some(confidence) => println!("  * {} [{:.0}%]", item.summary, confidence * 100.0),
            None => println!("  * {}", item.summary),
        }
        println!("    \"{}\"", item.quote);
    }
    if view.has_more {
        println!("  ... more available (use --pages)");
    } else if let Some(reported) = view.reported_total.filter(|&n| n > view.items.len()) {
        println!("  ({} of {} reported reviews available)", view.items.len(), reported);
    }
    Ok(())
}
