//! Subcommand handlers.

use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::warn;

use bioscience_client::dashboard::{self, DashboardStats};
use bioscience_client::search::PAGE_SIZE;
use bioscience_client::typing::{DEFAULT_SPEED, FINDING_STAGGER};
use bioscience_client::{
    ApiClient, Conversation, HealthMonitor, Mutations, OfflineTransport, Queries, QueryCache, QueryState,
    ReqwestTransport, SearchSession, Transport, TypingAnimation,
};
use bioscience_common::entities::*;

use crate::config::Config;
use crate::render;
use crate::SearchArgs;

/// Everything a command needs, built once from the configuration.
pub struct App {
    pub config: Config,
    pub queries: Queries,
    pub mutations: Mutations,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let transport: Arc<dyn Transport> = if config.api.offline {
            Arc::new(OfflineTransport::default())
        } else {
            Arc::new(ReqwestTransport::new(config.timeout())?)
        };
        let client = ApiClient::new(config.api.base_url.clone(), transport);
        let cache = QueryCache::new(config.cache.max_entries);
        let queries = Queries::new(client.clone(), cache.clone(), config.policies());
        let mutations = Mutations::new(client, cache);
        Ok(Self { config, queries, mutations })
    }
}

// ── Health ──────────────────────────────────────────────────────────────────

pub async fn health(app: &App, watch: bool) -> anyhow::Result<()> {
    if !watch {
        let h = app
            .queries
            .health()
            .await
            .with_context(|| format!("Backend at {} is unreachable", app.queries.client().base_url()))?;
        println!("{}", render::health_line(&h));
        return Ok(());
    }

    let monitor = HealthMonitor::spawn(app.queries.clone());
    let mut rx = monitor.subscribe();
    println!("Watching {} (Ctrl-C to stop)", app.queries.client().base_url());
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match &*rx.borrow_and_update() {
                    QueryState::Success(h) => println!("{}", render::health_line(h)),
                    QueryState::Error(e) => println!("○ unreachable · {}", e),
                    QueryState::Loading => println!("… checking"),
                    QueryState::Idle => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

// ── Search ──────────────────────────────────────────────────────────────────

fn print_results(session: &SearchSession) {
    let Some(resp) = session.response() else {
        if let Some(e) = session.error() {
            println!("Search failed: {}", e);
        }
        return;
    };
    if resp.publications.is_empty() {
        println!("No publications match.");
        return;
    }
    let first = session.offset() as u64 + 1;
    let last = session.offset() as u64 + resp.publications.len() as u64;
    println!("Showing {}–{} of {}", first, last, resp.total);
    for p in &resp.publications {
        println!("  {}", render::publication_row(p));
    }
    if session.total_pages() > 1 {
        println!("{}", render::page_bar(&session.page_numbers(), session.current_page()));
    }
}

pub async fn search(app: &App, args: SearchArgs) -> anyhow::Result<()> {
    let mut session = SearchSession::new(PAGE_SIZE, app.config.debounce());
    let default_filters = session.filters().clone();
    session.set_sort(
        args.sort.map(Into::into).unwrap_or(default_filters.sort_by),
        args.order.map(Into::into).unwrap_or(default_filters.sort_order),
    );
    session.set_year_range(args.from, args.to);
    session.set_tags(args.tags);
    if let Some(q) = args.query {
        session.type_query(q, Instant::now());
        session.settle().await;
    }

    session.run(&app.queries).await?;
    if args.page > 1 {
        session.go_to_page(args.page);
        session.run(&app.queries).await?;
    }
    print_results(&session);

    if args.interactive {
        browse(app, &mut session).await?;
    }
    Ok(())
}

const BROWSE_HELP: &str = "\
  n / p            next / previous page
  g <page>         go to page
  s <field> [dir]  sort by relevance|title|year, asc|desc
  y <from> <to>    year range (use - for open)
  t <tag>          toggle a tag filter
  c                clear filters
  q                quit
  anything else    new search query";

async fn browse(app: &App, session: &mut SearchSession) -> anyhow::Result<()> {
    println!("\n{}", BROWSE_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("search> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        let mut words = line.split_whitespace();

        match (words.next(), words.next(), words.next()) {
            (Some("q"), None, _) => break,
            (Some("n"), None, _) => {
                session.next_page();
            }
            (Some("p"), None, _) => {
                session.prev_page();
            }
            (Some("g"), Some(n), None) => match n.parse() {
                Ok(n) => {
                    session.go_to_page(n);
                }
                Err(_) => {
                    println!("Not a page number: {}", n);
                    continue;
                }
            },
            (Some("s"), Some(field), dir) => {
                let Some(sort_by) = SortBy::parse(field) else {
                    println!("Unknown sort field: {}", field);
                    continue;
                };
                let order = dir.and_then(SortOrder::parse).unwrap_or(session.filters().sort_order);
                session.set_sort(sort_by, order);
            }
            (Some("y"), Some(from), Some(to)) => {
                session.set_year_range(from.parse().ok(), to.parse().ok());
            }
            (Some("t"), Some(_), _) => {
                session.toggle_tag(line[1..].trim());
            }
            (Some("c"), None, _) => session.clear_filters(),
            (None, _, _) => continue,
            _ => {
                session.type_query(line, Instant::now());
                session.settle().await;
            }
        }

        if let Err(e) = session.run(&app.queries).await {
            warn!(error = %e, "Search request failed");
        }
        print_results(session);
    }
    Ok(())
}

// ── Publication detail ──────────────────────────────────────────────────────

async fn type_out(text: &str, animate: bool) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    if animate {
        let anim = TypingAnimation::new(text, DEFAULT_SPEED);
        let mut shown = 0;
        anim.play(|frame| {
            let _ = write!(out, "{}", &frame[shown..]);
            let _ = out.flush();
            shown = frame.len();
        })
        .await;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", text)?;
    }
    Ok(())
}

pub async fn show(app: &App, id: &str, summary: bool, animate: bool) -> anyhow::Result<()> {
    let id = PublicationId::from(id);
    let publication = app
        .queries
        .publication(&id)
        .await
        .with_context(|| format!("Failed to load publication {}", id))?;
    println!("{}", render::publication_detail(&publication));

    if !summary {
        return Ok(());
    }

    println!("AI summary\n----------");
    let summarize = app.mutations.publication_summary();
    match summarize.mutate(PublicationSummaryRequest::from(&publication)).await {
        Ok(ai) => {
            print!("Objective: ");
            type_out(&ai.objective, animate).await?;
            println!("Key findings:");
            for (i, finding) in ai.findings.iter().enumerate() {
                if animate && i > 0 {
                    tokio::time::sleep(FINDING_STAGGER).await;
                }
                println!("  • {}", finding);
            }
            print!("Implications: ");
            type_out(&ai.implications, animate).await?;
        }
        // The publication itself is still shown.
        Err(e) => println!("AI summary unavailable: {}", e),
    }
    Ok(())
}

// ── Dashboard ───────────────────────────────────────────────────────────────

pub async fn stats(app: &App) -> anyhow::Result<()> {
    let stats = match app.queries.publication_stats().await {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "Statistics unavailable, showing defaults");
            None
        }
    };

    println!("{}", render::stat_cards(&DashboardStats::from_stats(stats.as_ref())));
    let Some(stats) = stats else { return Ok(()) };

    println!("\nPublications per year");
    println!("{}", render::bar_chart(&dashboard::year_series(&stats)));
    println!("\nTop research areas");
    println!("{}", render::bar_chart(&dashboard::top_tags(&stats, 8)));
    println!("\nRecent publications");
    for p in dashboard::recent(&stats, 5) {
        println!("  {}", render::publication_row(p));
    }
    Ok(())
}

// ── AI ──────────────────────────────────────────────────────────────────────

pub async fn ask(app: &App, question: String, context: Option<String>) -> anyhow::Result<()> {
    let resp = app.mutations.ask().mutate(AskRequest { question, context }).await?;
    println!("{}\n\n— {}", resp.answer, resp.model);
    Ok(())
}

pub async fn chat(app: &App) -> anyhow::Result<()> {
    let chat = app.mutations.chat();
    let mut convo = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Research assistant. Type 'exit' to leave.");
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }
        match convo.send(&chat, &line).await {
            Ok(Some(reply)) => println!("assistant> {}\n", reply.content),
            Ok(None) => {}
            Err(e) => println!("(request failed: {})\n", e),
        }
    }
    Ok(())
}

pub async fn summarize(app: &App, topic: String, style: Option<SummaryStyle>) -> anyhow::Result<()> {
    let resp = app.mutations.summarize().mutate(SummarizeRequest { topic, style }).await?;
    println!("{} ({})\n\n{}", resp.topic, resp.style, resp.summary);
    Ok(())
}

pub async fn extract(app: &App, text: String, extract_type: Option<ExtractType>) -> anyhow::Result<()> {
    let resp = app.mutations.extract().mutate(ExtractRequest { text, extract_type }).await?;
    println!("{}\n\n{}", resp.extract_type, resp.extracted);
    Ok(())
}

pub async fn gaps(app: &App, area: Option<String>) -> anyhow::Result<()> {
    let resp = app.mutations.find_gaps().mutate(GapsRequest { area }).await?;
    println!("Research gaps: {}\n\n{}", resp.area, resp.gaps);
    Ok(())
}

pub async fn compare(app: &App, topic1: String, topic2: String) -> anyhow::Result<()> {
    let resp = app.mutations.compare().mutate(CompareRequest { topic1, topic2 }).await?;
    println!("{} vs {}\n\n{}", resp.topic1, resp.topic2, resp.comparison);
    Ok(())
}
