#![forbid(unsafe_code)]

//! JSONL output formatter for machine-readable output
//!
//! Outputs one JSON object per line:
//! 1. One record per push, in input order (`plan`, `disposal` or `error`)
//! 2. One status record

use crate::engine::{DisposalPlan, ExecutionResult, Verdict};
use crate::error::PushRulesError;
use crate::machine::PushPlan;
use serde::Serialize;
use std::path::Path;

/// JSONL output formatter
///
/// Formats execution results as JSON Lines (one JSON object per line).
pub struct JsonlFormatter;

impl JsonlFormatter {
    /// Creates a new JsonlFormatter
    pub fn new() -> Self {
        JsonlFormatter
    }

    /// Format the execution result as JSONL
    pub fn format(&self, result: &ExecutionResult) -> String {
        let mut output = String::new();

        for report in &result.reports {
            let line = match &report.result {
                Ok(Verdict::Plan(plan)) => serde_json::to_string(&PlanRecord {
                    record_type: "plan",
                    source: &report.source,
                    plan,
                }),
                Ok(Verdict::Disposal(plan)) => serde_json::to_string(&DisposalRecord {
                    record_type: "disposal",
                    source: &report.source,
                    plan,
                }),
                Err(error) => serde_json::to_string(&ErrorRecord::new(&report.source, error)),
            };
            if let Ok(json) = line {
                output.push_str(&json);
                output.push('\n');
            }
        }

        let status = StatusRecord {
            record_type: "status",
            pushes: result.reports.len() as u64,
            matched: result.matched() as u64,
            unmatched: result.unmatched() as u64,
            failed: result.failed() as u64,
        };
        if let Ok(json) = serde_json::to_string(&status) {
            output.push_str(&json);
            output.push('\n');
        }

        output
    }

    /// Write the formatted output to stdout
    pub fn write_to_stdout(&self, result: &ExecutionResult) {
        print!("{}", self.format(result));
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Plan record for JSONL output
#[derive(Debug, Serialize)]
struct PlanRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    source: &'a Path,
    #[serde(flatten)]
    plan: &'a PushPlan,
}

/// Disposal record for JSONL output
#[derive(Debug, Serialize)]
struct DisposalRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    source: &'a Path,
    #[serde(flatten)]
    plan: &'a DisposalPlan,
}

/// Error record for JSONL output
///
/// Evaluation errors carry the failing rule's coordinates.
#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    source: &'a Path,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<&'a str>,
}

impl<'a> ErrorRecord<'a> {
    fn new(source: &'a Path, error: &'a PushRulesError) -> Self {
        let mut record = ErrorRecord {
            record_type: "error",
            source,
            message: error.to_string(),
            table: None,
            index: None,
            label: None,
            predicate: None,
        };
        if let PushRulesError::Evaluation(e) = error {
            record.table = Some(&e.table);
            record.index = Some(e.index);
            record.label = Some(&e.label);
            record.predicate = Some(&e.predicate);
        }
        record
    }
}

/// Status record for JSONL output
#[derive(Debug, Serialize)]
struct StatusRecord {
    #[serde(rename = "type")]
    record_type: &'static str,
    pushes: u64,
    matched: u64,
    unmatched: u64,
    failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PushReport;
    use crate::error::{EvaluationError, PredicateError};
    use crate::goals::{GoalOutcome, GoalSet};
    use crate::rules::{EvaluationResult, Match};
    use std::path::PathBuf;

    fn plan(goals: EvaluationResult<GoalOutcome>) -> Verdict {
        Verdict::Plan(PushPlan {
            repo: "acme/web".to_string(),
            branch: "master".to_string(),
            goals,
            builder: None,
            deployers: Vec::new(),
            unfulfilled: Vec::new(),
        })
    }

    fn result(reports: Vec<PushReport>) -> ExecutionResult {
        let pushes_evaluated = reports.iter().filter(|r| r.result.is_ok()).count();
        ExecutionResult {
            reports,
            pushes_evaluated,
        }
    }

    #[test]
    fn test_format_empty_result() {
        let output = JsonlFormatter::new().format(&result(vec![]));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let status: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(status["type"], "status");
        assert_eq!(status["pushes"], 0);
        assert_eq!(status["failed"], 0);
    }

    #[test]
    fn test_format_plan_records() {
        let matched = plan(EvaluationResult::Matched(Match {
            index: 6,
            label: "Build Java".to_string(),
            outcome: GoalOutcome::Goals(GoalSet::library()),
        }));
        let output = JsonlFormatter::new().format(&result(vec![
            PushReport {
                source: PathBuf::from("a.json"),
                result: Ok(matched),
            },
            PushReport {
                source: PathBuf::from("b.json"),
                result: Ok(plan(EvaluationResult::Unmatched)),
            },
        ]));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "plan");
        assert_eq!(first["source"], "a.json");
        assert_eq!(first["repo"], "acme/web");
        assert_eq!(first["goals"]["status"], "matched");
        assert_eq!(first["goals"]["index"], 6);
        assert_eq!(first["goals"]["outcome"]["kind"], "goals");
        assert_eq!(first["goals"]["outcome"]["name"], "library");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["goals"]["status"], "unmatched");

        let status: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(status["matched"], 1);
        assert_eq!(status["unmatched"], 1);
    }

    #[test]
    fn test_format_evaluation_error() {
        let error = PushRulesError::Evaluation(EvaluationError {
            table: "goals".to_string(),
            index: 3,
            label: "X".to_string(),
            predicate: "has-spring-boot-application-class".to_string(),
            source: PredicateError::ContentUnavailable("src/main/java/App.java".to_string()),
        });
        let output = JsonlFormatter::new().format(&result(vec![PushReport {
            source: PathBuf::from("broken.json"),
            result: Err(error),
        }]));

        let record: serde_json::Value =
            serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["type"], "error");
        assert_eq!(record["label"], "X");
        assert_eq!(record["index"], 3);
        assert_eq!(record["predicate"], "has-spring-boot-application-class");
    }

    #[test]
    fn test_format_load_error_has_no_rule() {
        let error = PushRulesError::Push {
            file: PathBuf::from("bad.json"),
            message: "expected value".to_string(),
        };
        let output = JsonlFormatter::new().format(&result(vec![PushReport {
            source: PathBuf::from("bad.json"),
            result: Err(error),
        }]));

        let record: serde_json::Value =
            serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["type"], "error");
        assert!(record.get("label").is_none());
        assert!(record["message"].as_str().unwrap().contains("expected value"));
    }

    #[test]
    fn test_format_disposal_record() {
        let disposal = Verdict::Disposal(DisposalPlan {
            repo: "acme/web".to_string(),
            branch: "master".to_string(),
            goals: EvaluationResult::Matched(Match {
                index: 2,
                label: "We can always delete the repo".to_string(),
                outcome: GoalOutcome::Goals(GoalSet::repository_deletion()),
            }),
        });
        let output = JsonlFormatter::new().format(&result(vec![PushReport {
            source: PathBuf::from("a.json"),
            result: Ok(disposal),
        }]));

        let record: serde_json::Value =
            serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(record["type"], "disposal");
        assert_eq!(record["goals"]["label"], "We can always delete the repo");
    }

    #[test]
    fn test_output_is_valid_jsonl() {
        let output = JsonlFormatter::default().format(&result(vec![PushReport {
            source: PathBuf::from("a.json"),
            result: Ok(plan(EvaluationResult::Unmatched)),
        }]));
        for line in output.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }
}
