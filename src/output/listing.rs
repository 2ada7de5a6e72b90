#![forbid(unsafe_code)]

//! Rule table listing formatters
//!
//! This module provides formatters for the `pushrules list` command. Tables
//! are listed in the order the machine consults them and rules in evaluation
//! order, so the listing reads the way evaluation proceeds.

use crate::machine::SoftwareDeliveryMachine;
use crate::rules::{Outcome, RuleTable};
use serde::Serialize;

/// One rule of a listed table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleListing {
    pub index: usize,
    pub label: String,
    pub push_tests: Vec<String>,
    pub outcome: String,
}

/// One listed table
#[derive(Debug, Clone, PartialEq)]
pub struct TableListing {
    pub table: String,
    pub rules: Vec<RuleListing>,
    /// What applies when no rule matches, if anything
    pub fallback: Option<String>,
}

impl TableListing {
    fn from_table<O: Outcome>(table: &RuleTable<O>) -> Self {
        let rules = table
            .rules()
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleListing {
                index,
                label: rule.label().to_string(),
                push_tests: rule
                    .predicate_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                outcome: rule.outcome().describe(),
            })
            .collect();
        Self {
            table: table.name().to_string(),
            rules,
            fallback: None,
        }
    }
}

/// Lists every table of `machine`: goals, build, deploy tables, disposal
pub fn machine_listing(machine: &SoftwareDeliveryMachine) -> Vec<TableListing> {
    let mut tables = vec![TableListing::from_table(machine.goal_rules())];

    let mut build = TableListing::from_table(machine.build_rules());
    build.fallback = machine.default_builder().map(|b| b.describe());
    tables.push(build);

    tables.extend(
        machine
            .deploy_rules()
            .map(|(_, table)| TableListing::from_table(table)),
    );
    tables.push(TableListing::from_table(machine.disposal_rules()));
    tables
}

/// Human-readable formatter for table listings
pub struct ListingHumanFormatter;

impl ListingHumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        ListingHumanFormatter
    }

    /// Format the listing for human consumption
    pub fn format(&self, machine_name: &str, tables: &[TableListing]) -> String {
        let mut output = String::new();

        output.push_str(&format!("Machine: {}\n", machine_name));

        for table in tables {
            output.push('\n');
            let noun = if table.rules.len() == 1 { "rule" } else { "rules" };
            output.push_str(&format!("{} ({} {}):\n", table.table, table.rules.len(), noun));

            for rule in &table.rules {
                output.push_str(&format!("  #{} {}\n", rule.index, rule.label));
                let when = if rule.push_tests.is_empty() {
                    "any push".to_string()
                } else {
                    rule.push_tests.join(" && ")
                };
                output.push_str(&format!("     when: {}\n", when));
                output.push_str(&format!("     then: {}\n", rule.outcome));
            }

            if let Some(fallback) = &table.fallback {
                output.push_str(&format!("  otherwise: {}\n", fallback));
            }
        }

        output
    }

    /// Write the formatted output to stdout
    pub fn write_to_stdout(&self, machine_name: &str, tables: &[TableListing]) {
        print!("{}", self.format(machine_name, tables));
    }
}

impl Default for ListingHumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// JSONL output structure for a listed table
#[derive(Debug, Serialize)]
struct JsonlTable<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    table: &'a str,
    rules: &'a [RuleListing],
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<&'a str>,
}

/// JSONL formatter for table listings
pub struct ListingJsonlFormatter;

impl ListingJsonlFormatter {
    /// Create a new JSONL formatter
    pub fn new() -> Self {
        ListingJsonlFormatter
    }

    /// Format the listing as JSONL, one record per table
    ///
    /// # Errors
    ///
    /// Returns the serialization error of the first record that fails.
    pub fn format(&self, tables: &[TableListing]) -> Result<String, serde_json::Error> {
        let mut output = String::new();

        for table in tables {
            let record = JsonlTable {
                record_type: "table",
                table: &table.table,
                rules: &table.rules,
                fallback: table.fallback.as_deref(),
            };
            output.push_str(&serde_json::to_string(&record)?);
            output.push('\n');
        }

        Ok(output)
    }

    /// Write the formatted output to stdout
    pub fn write_to_stdout(&self, tables: &[TableListing]) -> Result<(), serde_json::Error> {
        print!("{}", self.format(tables)?);
        Ok(())
    }
}

impl Default for ListingJsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}
