//! Command-line host for sora.
//!
//! `ask` runs one request cycle against the configured backend, `serve`
//! runs the embedded suggestion service, `history` and `stats` read the
//! local search history. Tracing goes to stderr (or a rolling log file
//! for `serve`) so stdout stays clean command output.

use sora::history::{self, HistoryStore, SqliteHistoryStore};
use sora::session::Controller;
use sora::{Config, Language, Persona, SuggestApi, SuggestServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// History owner for everything recorded from this host.
const LOCAL_USER: &str = "local";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map_or("help", String::as_str);

    // `serve` logs to a rolling file; the guard must outlive the command
    // so buffered lines are flushed on exit.
    let _guard = init_tracing(command == "serve")?;

    match command {
        "ask" => run_ask(&args[2..]).await,
        "serve" => run_serve().await,
        "history" => run_history(&args[2..]).await,
        "stats" => run_stats().await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => anyhow::bail!("unknown subcommand `{other}` (use ask|serve|history|stats)"),
    }
}

fn init_tracing(
    log_to_file: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sora=info"));
    if log_to_file {
        let logs_dir = sora::sora_dirs::logs_dir();
        std::fs::create_dir_all(&logs_dir)?;
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "sora.log"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}

async fn run_ask(args: &[String]) -> anyhow::Result<()> {
    let mut place: Option<String> = None;
    let mut query: Option<String> = None;
    let mut persona: Option<Persona> = None;
    let mut language: Option<Language> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--place" => place = Some(required_value(&mut iter, "--place")?),
            "--query" => query = Some(required_value(&mut iter, "--query")?),
            "--persona" => {
                let value = required_value(&mut iter, "--persona")?;
                persona = Some(Persona::parse(&value).ok_or_else(|| {
                    anyhow::anyhow!("invalid persona `{value}` (use outings|travel|fashion)")
                })?);
            }
            "--lang" => {
                let value = required_value(&mut iter, "--lang")?;
                language = Some(Language::parse(&value).ok_or_else(|| {
                    anyhow::anyhow!("invalid language `{value}` (use en|ja)")
                })?);
            }
            other => anyhow::bail!("unknown option `{other}` for ask"),
        }
    }
    let query = query.ok_or_else(|| anyhow::anyhow!("ask requires --query <text>"))?;

    let config = Config::load()?;
    let api = SuggestApi::new(&config.backend)?;
    let store = Arc::new(SqliteHistoryStore::open(&config.history.resolved_db_path())?);
    let mut controller = Controller::new(api)
        .with_session_defaults(&config.session)
        .with_history(store, LOCAL_USER)
        .with_read_aloud_rate(config.speech.read_aloud_rate);

    if let Some(place) = place {
        controller.set_place(place);
    }
    controller.set_query(query);
    if let Some(persona) = persona {
        controller.set_persona(persona);
    }
    if let Some(language) = language {
        controller.set_language(language);
    }

    controller.submit().await?;
    controller.flush_history().await;

    let state = controller.state();
    if let Some(weather) = &state.weather {
        println!("{}", weather.place_label);
        println!("{}", weather.summary);
    }
    match &state.suggestions {
        Some(suggestions) => {
            println!();
            println!("{}", suggestions.text);
            Ok(())
        }
        None => {
            let message = state
                .error
                .clone()
                .unwrap_or_else(|| "request failed".to_owned());
            anyhow::bail!(message)
        }
    }
}

async fn run_serve() -> anyhow::Result<()> {
    let config = Config::load()?;
    let server = SuggestServer::start(&config.server).await?;
    println!("sora suggestion service listening on http://{}", server.addr());
    println!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, shutting down");
    server.shutdown();
    Ok(())
}

async fn run_history(args: &[String]) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = Arc::new(SqliteHistoryStore::open(&config.history.resolved_db_path())?);

    let mut limit: Option<usize> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--limit" => {
                let value = required_value(&mut iter, "--limit")?;
                limit = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("--limit requires a number"))?,
                );
            }
            "--delete" => {
                let id = required_value(&mut iter, "--delete")?;
                store.delete(&id).await?;
                println!("deleted {id}");
                return print_history(store.as_ref(), None).await;
            }
            "--clear" => {
                let removed = store.clear(LOCAL_USER).await?;
                println!("cleared {removed} searches");
                return print_history(store.as_ref(), None).await;
            }
            other => anyhow::bail!("unknown option `{other}` for history"),
        }
    }

    print_history(store.as_ref(), limit).await
}

async fn print_history(store: &dyn HistoryStore, limit: Option<usize>) -> anyhow::Result<()> {
    let records = store.list_recent(LOCAL_USER, limit).await?;
    if records.is_empty() {
        println!("no searches recorded");
        return Ok(());
    }
    for record in records {
        let when = chrono::DateTime::from_timestamp(record.created_at, 0)
            .map_or_else(|| record.created_at.to_string(), |t| {
                t.format("%Y-%m-%d %H:%M").to_string()
            });
        println!(
            "{}  {}  [{}/{}]  {}: {}",
            record.id,
            when,
            record.persona.as_str(),
            record.language.as_str(),
            record.place,
            record.query
        );
    }
    Ok(())
}

async fn run_stats() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = SqliteHistoryStore::open(&config.history.resolved_db_path())?;
    let records = store.list_recent(LOCAL_USER, None).await?;
    let stats = history::aggregate(&records);

    println!("total searches:     {}", stats.total_searches);
    println!("favorite persona:   {}", stats.favorite_persona.as_str());
    println!("preferred language: {}", stats.preferred_language.as_str());
    Ok(())
}

fn required_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> anyhow::Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
}

fn print_usage() {
    println!("sora {}", env!("CARGO_PKG_VERSION"));
    println!("usage: sora <ask|serve|history|stats>");
    println!();
    println!("  ask --query <text> [--place <name>] [--persona <outings|travel|fashion>] [--lang <en|ja>]");
    println!("  serve");
    println!("  history [--limit <n> | --delete <id> | --clear]");
    println!("  stats");
}
