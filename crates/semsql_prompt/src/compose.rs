//! Prompt Composer (C8, `spec.md` §4.8): builds a token-budgeted prompt in
//! a fixed section order, reshaping itself under retry conditions.

use crate::format::{estimate_tokens, render_table_inline, render_table_ultra_compact};
use crate::request::{ConversationTurn, PromptRequest, RetryContext};
use semsql_core::TableInfo;

const MAX_INITIAL_TABLES: usize = 15;
const MAX_INITIAL_CONVERSATION_TURNS: usize = 2;
const MAX_RAG_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Initial,
    FocusedRetry,
    UltraCompact,
}

fn tier_for(attempt: u32) -> Tier {
    match attempt {
        1 => Tier::Initial,
        2 | 3 => Tier::FocusedRetry,
        _ => Tier::UltraCompact,
    }
}

/// Renders the full prompt for `request`, trimming optional sections (RAG
/// examples, then conversation history) if the result would exceed
/// `request.token_budget`. The schema subset itself is never trimmed past
/// what its tier already implies — a prompt that can't fit even the
/// ultra-compact schema is a configuration error, not something to repair
/// by silently dropping tables.
pub fn compose(request: &PromptRequest<'_>) -> String {
    let tier = tier_for(request.attempt);
    let tables = select_tables(request, tier);

    let mut include_rag = !request.rag_examples.is_empty();
    let mut include_conversation = !request.conversation.is_empty();

    loop {
        let rendered = render(request, tier, &tables, include_rag, include_conversation);
        if estimate_tokens(&rendered) <= request.token_budget || (!include_rag && !include_conversation) {
            return rendered;
        }
        if include_rag {
            include_rag = false;
        } else {
            include_conversation = false;
        }
    }
}

fn select_tables<'a>(request: &'a PromptRequest<'a>, tier: Tier) -> Vec<&'a TableInfo> {
    match tier {
        Tier::Initial => {
            let mut tables: Vec<&TableInfo> = match request.resolver_report {
                Some(report) => report
                    .suggested_tables
                    .iter()
                    .filter_map(|name| request.snapshot.table(name))
                    .collect(),
                None => request.snapshot.tables.iter().collect(),
            };
            tables.truncate(MAX_INITIAL_TABLES);
            tables
        }
        Tier::FocusedRetry | Tier::UltraCompact => {
            let focus_tables = request
                .retry_context
                .map(|r| r.focus_tables.as_slice())
                .unwrap_or(&[]);
            if focus_tables.is_empty() {
                request.snapshot.tables.iter().collect()
            } else {
                request
                    .snapshot
                    .focused(focus_tables)
                    .tables
                    .iter()
                    .map(|t| request.snapshot.table(&t.name).unwrap())
                    .collect()
            }
        }
    }
}

fn render(
    request: &PromptRequest<'_>,
    tier: Tier,
    tables: &[&TableInfo],
    include_rag: bool,
    include_conversation: bool,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Dialect: {}. Write syntactically valid {} SQL only.\n\n",
        request.dialect.dialect_name(),
        request.dialect.dialect_name()
    ));

    out.push_str("Schema:\n");
    match tier {
        Tier::Initial | Tier::FocusedRetry => {
            for table in tables {
                out.push_str(&render_table_inline(table));
                out.push('\n');
            }
        }
        Tier::UltraCompact => {
            let must_include = request
                .retry_context
                .map(|r| r.offending_identifiers.clone())
                .unwrap_or_default();
            for table in tables {
                out.push_str(&render_table_ultra_compact(table, &must_include));
                out.push('\n');
            }
        }
    }
    out.push('\n');

    if let Some(report) = request.resolver_report {
        if !report.column_recommendations.is_empty() {
            out.push_str("Likely relevant columns:\n");
            for rec in &report.column_recommendations {
                out.push_str(&format!(
                    "  {}.{} (confidence {:.2})\n",
                    rec.table, rec.column, rec.confidence
                ));
            }
            out.push('\n');
        }
        if !report.join_hints.is_empty() {
            out.push_str("Join hints:\n");
            for hint in &report.join_hints {
                out.push_str(&format!("  {} ({} hop)\n", hint.tables.join(" -> "), hint.hop_count));
            }
            out.push('\n');
        }
    }

    if include_rag {
        let examples: Vec<_> = request.rag_examples.iter().take(MAX_RAG_EXAMPLES).collect();
        if !examples.is_empty() {
            out.push_str("Examples:\n");
            for example in examples {
                out.push_str(&format!("  Q: {}\n  SQL: {}\n", example.question, example.sql));
            }
            out.push('\n');
        }
    }

    if include_conversation {
        let turns = last_turns(request.conversation, tier);
        if !turns.is_empty() {
            out.push_str("Conversation:\n");
            for turn in turns {
                out.push_str(&format!("  Q: {}\n  SQL: {}\n", turn.question, turn.sql));
            }
            out.push('\n');
        }
    }

    if let Some(retry) = request.retry_context {
        out.push_str("Critical instructions:\n");
        if !retry.offending_identifiers.is_empty() {
            out.push_str(&format!(
                "  Do not reuse the identifier(s) that failed last attempt: {}.\n",
                retry.offending_identifiers.join(", ")
            ));
        }
        if !retry.human_hint.is_empty() {
            out.push_str(&format!("  {}\n", retry.human_hint));
        }
        out.push_str("  Select only tables and columns listed above.\n\n");
    }

    out.push_str(&format!("Question: {}\n", request.question));
    out
}

fn last_turns<'a>(conversation: &'a [ConversationTurn], tier: Tier) -> &'a [ConversationTurn] {
    let max = if tier == Tier::Initial { MAX_INITIAL_CONVERSATION_TURNS } else { 0 };
    if max == 0 || conversation.is_empty() {
        return &[];
    }
    let start = conversation.len().saturating_sub(max);
    &conversation[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_test_support::fixtures::schema_with_table;

    #[test]
    fn initial_prompt_includes_dialect_and_question() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let request = PromptRequest {
            dialect: semsql_core::DbKind::Postgres,
            snapshot: &snapshot,
            resolver_report: None,
            rag_examples: &[],
            conversation: &[],
            question: "how many vendors are there",
            attempt: 1,
            retry_context: None,
            token_budget: 4000,
        };
        let prompt = compose(&request);
        assert!(prompt.contains("Dialect: postgresql"));
        assert!(prompt.contains("vendors(id:integer)"));
        assert!(prompt.contains("Question: how many vendors are there"));
    }

    #[test]
    fn retry_prompt_forbids_reusing_offending_identifier() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let retry = RetryContext {
            offending_identifiers: vec!["vendor_name".to_string()],
            focus_tables: vec!["vendors".to_string()],
            human_hint: "column vendor_name does not exist".to_string(),
        };
        let request = PromptRequest {
            dialect: semsql_core::DbKind::Postgres,
            snapshot: &snapshot,
            resolver_report: None,
            rag_examples: &[],
            conversation: &[],
            question: "how many vendors are there",
            attempt: 2,
            retry_context: Some(&retry),
            token_budget: 4000,
        };
        let prompt = compose(&request);
        assert!(prompt.contains("vendor_name"));
        assert!(prompt.contains("Do not reuse"));
    }

    #[test]
    fn ultra_compact_tier_drops_non_key_columns() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let retry = RetryContext {
            offending_identifiers: vec![],
            focus_tables: vec!["vendors".to_string()],
            human_hint: String::new(),
        };
        let request = PromptRequest {
            dialect: semsql_core::DbKind::Postgres,
            snapshot: &snapshot,
            resolver_report: None,
            rag_examples: &[],
            conversation: &[],
            question: "q",
            attempt: 4,
            retry_context: Some(&retry),
            token_budget: 4000,
        };
        let prompt = compose(&request);
        assert!(prompt.contains("vendors(id)"));
    }

    #[test]
    fn oversized_optional_sections_are_dropped_to_fit_budget() {
        let snapshot = schema_with_table("db", "public", "vendors");
        let turns = vec![ConversationTurn {
            question: "a".repeat(500),
            sql: "b".repeat(500),
        }];
        let request = PromptRequest {
            dialect: semsql_core::DbKind::Postgres,
            snapshot: &snapshot,
            resolver_report: None,
            rag_examples: &[],
            conversation: &turns,
            question: "q",
            attempt: 1,
            retry_context: None,
            token_budget: 20,
        };
        let prompt = compose(&request);
        assert!(!prompt.contains("Conversation:"));
    }
}
