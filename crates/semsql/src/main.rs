mod cli;
mod context;

use clap::Parser;
use cli::{Cli, Command, DialectArg, RagAction};
use context::CoreContext;
use semsql_agent::AskOptions;
use semsql_core::{DbKind, QueryResult};
use semsql_llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run() {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("semsql: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli))
}

fn build_llm_provider() -> anyhow::Result<Arc<dyn LlmProvider>> {
    let api_key = std::env::var("SEMSQL_LLM_API_KEY")
        .map_err(|_| anyhow::anyhow!("SEMSQL_LLM_API_KEY must be set"))?;
    let model = std::env::var("SEMSQL_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let mut config = OpenAiConfig::new(api_key, model);
    if let Ok(base_url) = std::env::var("SEMSQL_LLM_BASE_URL") {
        config.base_url = base_url;
    }
    Ok(Arc::new(OpenAiProvider::new(config)))
}

async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Command::Connect(conn) => {
            let ctx = CoreContext::new(build_llm_provider()?, false)?;
            let password = conn.password.clone();
            let profile = conn.into_profile()?;
            let outcome = ctx.connect(profile, password).await?;
            println!("connected: {} (dialect {:?}, session {})", outcome.info, outcome.dialect, outcome.session_id);
            ctx.disconnect(outcome.session_id)?;
            Ok(true)
        }
        Command::ListSchemas(conn) => {
            let ctx = CoreContext::new(build_llm_provider()?, false)?;
            let password = conn.password.clone();
            let profile = conn.into_profile()?;
            let outcome = ctx.connect(profile, password).await?;
            let schemas = ctx.list_schemas(outcome.session_id).await?;
            for schema in &schemas {
                println!(
                    "{:<24} tables={:<6} views={}",
                    schema.schema_name.as_deref().unwrap_or("(default)"),
                    schema.table_count,
                    schema.view_count
                );
            }
            ctx.disconnect(outcome.session_id)?;
            Ok(true)
        }
        Command::Snapshot { conn, schema } => {
            let ctx = CoreContext::new(build_llm_provider()?, false)?;
            let password = conn.password.clone();
            let profile = conn.into_profile()?;
            let outcome = ctx.connect(profile, password).await?;
            let snapshot = ctx.snapshot(outcome.session_id, schema).await?;
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
            ctx.disconnect(outcome.session_id)?;
            Ok(true)
        }
        Command::Ask {
            conn,
            question,
            tables,
            schema,
            max_retries,
            row_limit,
            timeout_s,
            allow_write,
            no_execute,
        } => {
            let ctx = CoreContext::new(build_llm_provider()?, true)?;
            let password = conn.password.clone();
            let profile = conn.into_profile()?;
            let outcome = ctx.connect(profile, password).await?;
            if !tables.is_empty() {
                ctx.select_tables(outcome.session_id, tables)?;
            }
            let options = AskOptions {
                max_retries,
                row_limit,
                timeout_s,
                schema_name: schema,
                allow_write,
                return_rows: !no_execute,
                conversation_context: Vec::new(),
            };
            let result = ctx.ask(outcome.session_id, &question, options).await?;
            print_ask_outcome(&result);
            let success = result.success;
            ctx.disconnect(outcome.session_id)?;
            Ok(success)
        }
        Command::BuildOntology(conn) => {
            let ctx = CoreContext::new(build_llm_provider()?, false)?;
            let password = conn.password.clone();
            let profile = conn.into_profile()?;
            let outcome = ctx.connect(profile, password).await?;
            let ontology = ctx.build_ontology(outcome.session_id).await?;
            println!("{}", serde_yaml::to_string(&ontology)?);
            ctx.disconnect(outcome.session_id)?;
            Ok(true)
        }
        Command::Rag { action } => dispatch_rag(action).await,
    }
}

async fn dispatch_rag(action: RagAction) -> anyhow::Result<bool> {
    match action {
        RagAction::Import { file } => {
            let ctx = CoreContext::new(build_llm_provider()?, true)?;
            let csv = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let imported = ctx.rag_import(&csv).await?;
            println!("imported {imported} example(s)");
            Ok(true)
        }
        RagAction::Search { question, dialect, schema } => {
            let ctx = CoreContext::new(build_llm_provider()?, true)?;
            let dialect: DbKind = dialect.into();
            let matches = ctx.rag_search(&question, dialect, schema.as_deref()).await?;
            if matches.is_empty() {
                println!("no similar examples found");
            }
            for entry in &matches {
                println!("[{:?}] {} -> {}", entry.dialect, entry.question, entry.sql);
            }
            Ok(true)
        }
        RagAction::Clear => {
            let ctx = CoreContext::new(build_llm_provider()?, true)?;
            ctx.rag_clear();
            println!("cleared RAG example store");
            Ok(true)
        }
    }
}

fn print_ask_outcome(outcome: &semsql_agent::AskOutcome) {
    println!("sql: {}", outcome.sql);
    if !outcome.explanation.is_empty() {
        println!("explanation: {}", outcome.explanation);
    }
    println!("attempts: {}", outcome.attempts.len());
    if let Some(result) = &outcome.result {
        print_query_result(result);
    }
    if let Some(diag) = &outcome.diagnostics {
        println!("diagnostics: {:?} - {}", diag.kind, diag.human_hint);
    }
    if !outcome.success {
        println!("status: failed");
    }
}

fn print_query_result(result: &QueryResult) {
    if result.columns.is_empty() && result.rows.is_empty() {
        if let Some(affected) = result.affected_rows {
            println!("{affected} row(s) affected");
        }
        return;
    }
    let header: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join(" | "));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|v| v.as_display_string()).collect();
        println!("{}", cells.join(" | "));
    }
    println!("({} row(s) in {:?})", result.rows.len(), result.execution_time);
}
