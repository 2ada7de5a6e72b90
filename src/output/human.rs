#![forbid(unsafe_code)]

//! Human-readable output formatter
//!
//! Prints one block per push, in input order, followed by a summary line.
//! Colour is applied through `termcolor` so it can be switched off for pipes
//! and tests.

use crate::engine::{ExecutionResult, Verdict};
use crate::goals::GoalOutcome;
use crate::machine::PushPlan;
use crate::rules::EvaluationResult;
use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Human-readable formatter for execution results
pub struct HumanFormatter {
    color: ColorChoice,
}

impl HumanFormatter {
    /// Creates a formatter writing with the given colour choice
    pub fn new(color: ColorChoice) -> Self {
        Self { color }
    }

    /// Format the result without colour
    ///
    /// # Errors
    ///
    /// Returns any error raised while writing into the buffer.
    pub fn format(&self, result: &ExecutionResult) -> io::Result<String> {
        let mut buffer = Buffer::no_color();
        self.write(&mut buffer, result)?;
        Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }

    /// Write the result to stdout
    pub fn write_to_stdout(&self, result: &ExecutionResult) -> io::Result<()> {
        let mut stdout = StandardStream::stdout(self.color);
        self.write(&mut stdout, result)
    }

    /// Write the result to any colour-capable writer
    pub fn write<W: WriteColor>(&self, out: &mut W, result: &ExecutionResult) -> io::Result<()> {
        for report in &result.reports {
            out.set_color(ColorSpec::new().set_bold(true))?;
            write!(out, "{}", report.source.display())?;
            out.reset()?;

            match &report.result {
                Ok(verdict) => {
                    let (repo, branch) = match verdict {
                        Verdict::Plan(plan) => (&plan.repo, &plan.branch),
                        Verdict::Disposal(plan) => (&plan.repo, &plan.branch),
                    };
                    writeln!(out, "  {}@{}", repo, branch)?;
                    write_goals(out, verdict.goals())?;
                    if let Verdict::Plan(plan) = verdict {
                        write_plan_details(out, plan)?;
                    }
                }
                Err(error) => {
                    writeln!(out)?;
                    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                    writeln!(out, "  error: {}", error)?;
                    out.reset()?;
                }
            }
            writeln!(out)?;
        }

        let summary_color = if result.failed() > 0 {
            Color::Red
        } else {
            Color::Green
        };
        out.set_color(ColorSpec::new().set_fg(Some(summary_color)).set_bold(true))?;
        writeln!(
            out,
            "{} {}: {} matched, {} unmatched, {} failed",
            result.reports.len(),
            if result.reports.len() == 1 { "push" } else { "pushes" },
            result.matched(),
            result.unmatched(),
            result.failed()
        )?;
        out.reset()
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

fn write_goals<W: WriteColor>(
    out: &mut W,
    goals: &EvaluationResult<GoalOutcome>,
) -> io::Result<()> {
    match goals {
        EvaluationResult::Matched(m) => {
            let color = match &m.outcome {
                GoalOutcome::Goals(_) => Color::Green,
                GoalOutcome::NoGoals | GoalOutcome::DoNotSetAnyGoals => Color::Cyan,
            };
            write!(out, "  goals: ")?;
            out.set_color(ColorSpec::new().set_fg(Some(color)))?;
            write!(out, "{}", m.outcome)?;
            out.reset()?;
            writeln!(out, " (rule #{} '{}')", m.index, m.label)
        }
        EvaluationResult::Unmatched => {
            write!(out, "  goals: ")?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "no rule matched")?;
            out.reset()
        }
    }
}

fn write_plan_details<W: WriteColor>(out: &mut W, plan: &PushPlan) -> io::Result<()> {
    if let Some(selection) = &plan.builder {
        let rule = match selection.rule {
            Some(index) => format!("rule #{} '{}'", index, selection.label),
            None => selection.label.clone(),
        };
        writeln!(out, "  builder: {} ({})", selection.builder.name, rule)?;
    }
    for selection in &plan.deployers {
        writeln!(
            out,
            "  {}: {} -> {} (rule #{} '{}')",
            selection.goal,
            selection.deployer.name,
            selection.deployer.environment,
            selection.rule,
            selection.label
        )?;
    }
    if !plan.unfulfilled.is_empty() {
        let keys: Vec<&str> = plan.unfulfilled.iter().map(|g| g.key()).collect();
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(out, "  unfulfilled: {}", keys.join(", "))?;
        out.reset()?;
    }
    Ok(())
}
