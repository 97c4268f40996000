//! The Agent's state machine (`spec.md` §4.10): `INIT -> GENERATE ->
//! VALIDATE -> EXECUTE -> {SUCCESS | ANALYZE} -> ... -> {SUCCESS | FAIL}`.

use crate::model::{AskOptions, AskOutcome, AttemptRecord, ConversationEntry};
use crate::retry::RetryMemory;
use crate::validate::{self, ValidationFailure};
use semsql_core::{CancelToken, Connection, ConnectionProfile, CoreConfig, CoreError, DbKind, ErrorClass, QueryRequest, QueryResult, SchemaSnapshot};
use semsql_diagnostics::ErrorReport;
use semsql_graph::GraphBackend;
use semsql_llm::LlmProvider;
use semsql_ontology::Ontology;
use semsql_prompt::{ConversationTurn, PromptRequest};
use semsql_rag::RagStore;
use semsql_session::ConnectionPool;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Bound on transient (network/deadlock/rate-limit) retries per attempt,
/// executed without involving the LLM.
const TRANSIENT_RETRY_LIMIT: u32 = 2;
const RAG_SEARCH_TOP_K: usize = 3;
const RAG_SEARCH_THRESHOLD: f64 = 0.75;
const RESOLVER_TOP_K_PER_TABLE: usize = 5;

/// Everything the Agent needs that outlives one `ask()` call: the
/// connection pool and profile to execute against, the LLM, and the C4-C6
/// read models a single connection's Resolver draws on.
pub struct AgentContext<'a> {
    pub pool: &'a ConnectionPool,
    pub profile: &'a ConnectionProfile,
    pub password: Option<&'a str>,
    pub dialect: DbKind,
    pub llm: &'a dyn LlmProvider,
    pub rag: &'a RagStore,
    pub graph: &'a dyn GraphBackend,
    pub ontology: &'a Ontology,
    pub config: &'a CoreConfig,
    pub cancel: CancelToken,
}

/// Runs the full `ask()` state machine for one question.
pub async fn ask(
    ctx: &AgentContext<'_>,
    question: &str,
    snapshot: &SchemaSnapshot,
    options: AskOptions,
) -> AskOutcome {
    let max_retries = options.normalized_max_retries();

    // INIT: retrieve RAG examples and fuse a resolver report.
    let rag_examples = ctx
        .rag
        .search(ctx.llm, question, ctx.dialect, options.schema_name.as_deref(), RAG_SEARCH_TOP_K, RAG_SEARCH_THRESHOLD)
        .await
        .unwrap_or_else(|e| {
            log::warn!("RAG search failed, proceeding without examples: {e}");
            Vec::new()
        });

    let resolver_report =
        semsql_resolver::resolve(question, snapshot, ctx.ontology, ctx.graph, rag_examples.clone(), RESOLVER_TOP_K_PER_TABLE);

    let conversation = conversation_turns_from(&options.conversation_context);

    let mut attempts: Vec<AttemptRecord> = Vec::new();
    let mut seen_sql: HashSet<String> = HashSet::new();
    let mut memory = RetryMemory::default();
    let mut consecutive_validation_failures: u32 = 0;
    let mut repair_attempted = false;

    let mut attempt_no: u32 = 1;
    while attempt_no <= max_retries {
        if ctx.cancel.is_cancelled() {
            return fail_outcome(attempts, None, "request cancelled");
        }

        let started = Instant::now();
        let retry_context = if memory.is_empty() { None } else { Some(memory.to_context()) };
        let enforce_containment = attempt_no > 1 || ctx.config.strict_containment_on_first_attempt;

        let request = PromptRequest {
            dialect: ctx.dialect,
            snapshot,
            resolver_report: Some(&resolver_report),
            rag_examples: &rag_examples,
            conversation: &conversation,
            question,
            attempt: attempt_no,
            retry_context: retry_context.as_ref(),
            token_budget: ctx.config.prompt_token_budget,
        };
        let prompt = semsql_prompt::compose(&request);

        let generation = match ctx.llm.generate_sql(&prompt).await {
            Ok(generation) => generation,
            Err(err) => {
                let core_err: CoreError = err.into();
                return fail_outcome(attempts, None, &format!("LLM generation failed: {core_err}"));
            }
        };

        // Learning property: identical SQL to a previous attempt is a
        // failure without executing again.
        if seen_sql.contains(&generation.sql) {
            memory.record_repeated_sql();
            attempts.push(AttemptRecord {
                attempt: attempt_no,
                sql: generation.sql.clone(),
                rationale: generation.rationale.clone(),
                error: None,
                duration: started.elapsed(),
            });
            attempt_no += 1;
            continue;
        }

        if let Err(failure) = validate::validate(&generation.sql, snapshot, options.allow_write, enforce_containment) {
            consecutive_validation_failures += 1;
            memory_from_validation_failure(&mut memory, &failure);
            attempts.push(AttemptRecord {
                attempt: attempt_no,
                sql: generation.sql.clone(),
                rationale: generation.rationale.clone(),
                error: None,
                duration: started.elapsed(),
            });

            if consecutive_validation_failures >= 2 && repair_attempted {
                return fail_outcome(attempts, None, &failure.human_hint());
            }
            attempt_no += 1;
            continue;
        }
        consecutive_validation_failures = 0;
        seen_sql.insert(generation.sql.clone());

        let execution = execute_with_transient_retries(ctx, &generation.sql, options.row_limit, options.timeout_s).await;

        match execution {
            Ok(result) => {
                attempts.push(AttemptRecord {
                    attempt: attempt_no,
                    sql: generation.sql.clone(),
                    rationale: generation.rationale.clone(),
                    error: None,
                    duration: started.elapsed(),
                });

                record_success(ctx, question, &generation.sql, options.schema_name.clone()).await;

                return AskOutcome {
                    success: true,
                    sql: generation.sql,
                    explanation: generation.rationale,
                    result: if options.return_rows { Some(result) } else { None },
                    attempts,
                    diagnostics: None,
                };
            }
            Err((_core_err, raw_message)) => {
                let report = semsql_diagnostics::analyze(&raw_message, &generation.sql, snapshot);
                attempts.push(AttemptRecord {
                    attempt: attempt_no,
                    sql: generation.sql.clone(),
                    rationale: generation.rationale.clone(),
                    error: Some(report.clone()),
                    duration: started.elapsed(),
                });

                memory.record(&report);
                repair_attempted = true;
                attempt_no += 1;
            }
        }
    }

    let diagnostics = attempts.iter().rev().find_map(|a| a.error.clone());
    let hint = diagnostics.as_ref().map(|d| d.human_hint.clone()).unwrap_or_else(|| "max retries exhausted".to_string());
    fail_outcome(attempts, diagnostics, &hint)
}

fn fail_outcome(attempts: Vec<AttemptRecord>, diagnostics: Option<ErrorReport>, explanation: &str) -> AskOutcome {
    let sql = attempts.last().map(|a| a.sql.clone()).unwrap_or_default();
    AskOutcome { success: false, sql, explanation: explanation.to_string(), result: None, attempts, diagnostics }
}

fn memory_from_validation_failure(memory: &mut RetryMemory, failure: &ValidationFailure) {
    if let ValidationFailure::UnknownIdentifier(ident) = failure {
        memory.record(&ErrorReport {
            kind: semsql_diagnostics::ErrorKind::UnknownColumn,
            offending_identifier: Some(ident.clone()),
            affected_table: None,
            candidates: Vec::new(),
            human_hint: failure.human_hint(),
        });
    } else {
        memory.record(&ErrorReport {
            kind: semsql_diagnostics::ErrorKind::Other,
            offending_identifier: None,
            affected_table: None,
            candidates: Vec::new(),
            human_hint: failure.human_hint(),
        });
    }
}

fn conversation_turns_from(entries: &[ConversationEntry]) -> Vec<ConversationTurn> {
    let mut turns = Vec::new();
    let mut pending_question: Option<String> = None;
    for entry in entries {
        match entry.role.as_str() {
            "user" => pending_question = Some(entry.content.clone()),
            "assistant" => {
                if let Some(question) = pending_question.take() {
                    turns.push(ConversationTurn { question, sql: entry.content.clone() });
                }
            }
            _ => {}
        }
    }
    turns
}

async fn record_success(ctx: &AgentContext<'_>, question: &str, sql: &str, schema_name: Option<String>) {
    if let Err(e) = ctx
        .rag
        .record(ctx.llm, question.to_string(), sql.to_string(), ctx.dialect, schema_name, true, std::collections::HashMap::new())
        .await
    {
        log::warn!("failed to record successful example in RAG store: {e}");
    }
}

/// Executes `sql`, retrying up to [`TRANSIENT_RETRY_LIMIT`] times without
/// LLM involvement on `ErrorClass::Transient` failures. Returns the raw
/// driver message alongside the classified error so the Analyzer can work
/// from the original text.
async fn execute_with_transient_retries(
    ctx: &AgentContext<'_>,
    sql: &str,
    row_limit: u32,
    timeout_s: f64,
) -> Result<QueryResult, (CoreError, String)> {
    let mut last_err = None;
    for _ in 0..=TRANSIENT_RETRY_LIMIT {
        match execute_once(ctx, sql, row_limit, timeout_s).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                let transient = err.0.classify() == ErrorClass::Transient;
                last_err = Some(err);
                if !transient {
                    break;
                }
            }
        }
    }
    Err(last_err.expect("at least one execution attempt runs"))
}

async fn execute_once(
    ctx: &AgentContext<'_>,
    sql: &str,
    row_limit: u32,
    timeout_s: f64,
) -> Result<QueryResult, (CoreError, String)> {
    let pool = ctx.pool.clone();
    let profile = ctx.profile.clone();
    let password = ctx.password.map(str::to_string);
    let sql = sql.to_string();

    let work = tokio::task::spawn_blocking(move || -> Result<QueryResult, (CoreError, String)> {
        let conn = pool.acquire(&profile, password.as_deref()).map_err(|e| {
            let message = e.to_string();
            (e, message)
        })?;
        let mut request = QueryRequest::new(sql).with_limit(row_limit);
        request.statement_timeout = Some(Duration::from_secs_f64(timeout_s));
        conn.as_connection().execute(&request).map_err(|e| {
            let raw = e.to_string();
            (CoreError::from(e), raw)
        })
    });

    match tokio::time::timeout(Duration::from_secs_f64(timeout_s.max(0.1)), work).await {
        Ok(join_result) => join_result.map_err(|e| (CoreError::Internal(e.to_string()), e.to_string()))?,
        Err(_) => Err((CoreError::Timeout, "statement did not complete before timeout".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_core::{ColumnMeta, DbConfig};
    use semsql_ontology::Ontology;
    use semsql_test_support::fixtures::{schema_with_table, table_result};
    use semsql_test_support::{FakeDriver, FakeLlmProvider};
    use std::collections::HashMap;

    fn pool_with(driver: FakeDriver) -> ConnectionPool {
        let mut drivers = HashMap::new();
        drivers.insert(DbKind::Postgres, driver.as_driver_arc());
        ConnectionPool::new(drivers, CoreConfig::default())
    }

    fn empty_ontology() -> Ontology {
        Ontology {
            concepts: std::collections::BTreeMap::new(),
            relationships: Vec::new(),
            generated_at: chrono::Utc::now(),
            source_hash: "none".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_attempt_returns_result_and_records_rag_entry() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let driver = FakeDriver::new(DbKind::Postgres)
            .with_schema(snapshot.clone())
            .with_query_result("SELECT id FROM vendors", table_result(vec![ColumnMeta { name: "id".into(), type_name: "integer".into(), nullable: false }], vec![]));
        let pool = pool_with(driver);
        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let llm = FakeLlmProvider::new().with_sql_response("SELECT id FROM vendors", "lists vendor ids");
        let rag = RagStore::new(true);
        let ontology = empty_ontology();
        let graph = semsql_graph::InMemoryGraphBackend::from_ontology(ontology.clone());
        let config = CoreConfig::default();

        let ctx = AgentContext {
            pool: &pool,
            profile: &profile,
            password: None,
            dialect: DbKind::Postgres,
            llm: &llm,
            rag: &rag,
            graph: &graph,
            ontology: &ontology,
            config: &config,
            cancel: CancelToken::new(),
        };

        let outcome = ask(&ctx, "list vendor ids", &snapshot, AskOptions::default()).await;
        assert!(outcome.success);
        assert_eq!(outcome.sql, "SELECT id FROM vendors");
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(rag.len(), 1);
    }

    #[tokio::test]
    async fn repeated_identical_sql_is_treated_as_failure_without_executing() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let driver = FakeDriver::new(DbKind::Postgres)
            .with_schema(snapshot.clone())
            .with_query_error("SELECT id FROM vendors", r#"column "id" does not exist"#);
        let pool = pool_with(driver.clone());
        let profile = ConnectionProfile::new("fake", DbConfig::default_postgres());
        let llm = FakeLlmProvider::new()
            .with_sql_response("SELECT id FROM vendors", "first")
            .with_sql_response("SELECT id FROM vendors", "repeated verbatim");
        let rag = RagStore::new(false);
        let ontology = empty_ontology();
        let graph = semsql_graph::InMemoryGraphBackend::from_ontology(ontology.clone());
        let config = CoreConfig::default();

        let ctx = AgentContext {
            pool: &pool,
            profile: &profile,
            password: None,
            dialect: DbKind::Postgres,
            llm: &llm,
            rag: &rag,
            graph: &graph,
            ontology: &ontology,
            config: &config,
            cancel: CancelToken::new(),
        };

        let mut options = AskOptions::default();
        options.max_retries = 2;
        let outcome = ask(&ctx, "list vendor ids", &snapshot, options).await;
        assert!(!outcome.success);
        assert_eq!(outcome.attempts.len(), 2);
        // The second, identical candidate is never sent to the Adapter.
        assert_eq!(driver.stats().executed_requests.len(), 1);
    }
}
