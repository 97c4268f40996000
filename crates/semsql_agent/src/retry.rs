//! Builds the next attempt's `RetryContext` from everything learned so far
//! (`spec.md` §4.10 "Learning property"): attempt N's prompt must cite
//! every distinct identifier error from attempts `1..N-1` and forbid their
//! reuse, not just the most recent one.

use semsql_diagnostics::ErrorReport;
use semsql_prompt::RetryContext;
use std::collections::BTreeSet;

#[derive(Default)]
pub struct RetryMemory {
    offending_identifiers: BTreeSet<String>,
    focus_tables: BTreeSet<String>,
    last_hint: String,
}

impl RetryMemory {
    pub fn record(&mut self, report: &ErrorReport) {
        if let Some(ident) = &report.offending_identifier {
            self.offending_identifiers.insert(ident.clone());
        }
        if let Some(table) = &report.affected_table {
            self.focus_tables.insert(table.clone());
        }
        self.last_hint = report.human_hint.clone();
    }

    pub fn record_repeated_sql(&mut self) {
        self.last_hint = "The previous response repeated an earlier rejected statement verbatim; it must differ.".to_string();
    }

    pub fn to_context(&self) -> RetryContext {
        RetryContext {
            offending_identifiers: self.offending_identifiers.iter().cloned().collect(),
            focus_tables: self.focus_tables.iter().cloned().collect(),
            human_hint: self.last_hint.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offending_identifiers.is_empty() && self.focus_tables.is_empty() && self.last_hint.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsql_diagnostics::ErrorKind;

    #[test]
    fn accumulates_distinct_identifiers_across_attempts() {
        let mut memory = RetryMemory::default();
        memory.record(&ErrorReport {
            kind: ErrorKind::UnknownColumn,
            offending_identifier: Some("vendor_nme".to_string()),
            affected_table: Some("vendors".to_string()),
            candidates: vec!["vendor_name".to_string()],
            human_hint: "typo".to_string(),
        });
        memory.record(&ErrorReport {
            kind: ErrorKind::UnknownColumn,
            offending_identifier: Some("ordr_id".to_string()),
            affected_table: Some("orders".to_string()),
            candidates: vec!["order_id".to_string()],
            human_hint: "another typo".to_string(),
        });

        let context = memory.to_context();
        assert_eq!(context.offending_identifiers, vec!["ordr_id".to_string(), "vendor_nme".to_string()]);
        assert_eq!(context.focus_tables, vec!["orders".to_string(), "vendors".to_string()]);
    }
}
