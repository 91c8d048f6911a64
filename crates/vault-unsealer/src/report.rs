//! Run report rendering.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use unsealer_common::{UnsealOutcome, UnsealProgress};

/// Output format of the final report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Outcomes of one unseal run, in discovery order
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<UnsealOutcome>,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Members that reached their threshold
    pub unsealed: usize,
    /// Members that accepted the share but need more
    pub in_progress: usize,
    /// Members that could not be resolved or reached
    pub failed: usize,
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    member: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<UnsealProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ReportView<'a> {
    started_at: DateTime<Utc>,
    summary: Summary,
    outcomes: Vec<OutcomeView<'a>>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, outcomes: Vec<UnsealOutcome>) -> Self {
        Self {
            started_at,
            outcomes,
        }
    }

    /// Discovery succeeded but found no sealed member
    pub fn nothing_to_do(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self) -> Summary {
        self.outcomes
            .iter()
            .fold(Summary::default(), |mut summary, outcome| {
                match outcome.result {
                    Ok(progress) if progress.is_complete() => summary.unsealed += 1,
                    Ok(_) => summary.in_progress += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.render_text(),
            OutputFormat::Json => self.render_json(),
        }
    }

    fn render_text(&self) -> String {
        if self.nothing_to_do() {
            return "no sealed vault servers were discovered".to_string();
        }

        let mut lines: Vec<String> = self.outcomes.iter().map(outcome_line).collect();
        let summary = self.summary();
        lines.push(format!(
            "{} unsealed, {} in progress, {} failed",
            summary.unsealed, summary.in_progress, summary.failed
        ));
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        let view = ReportView {
            started_at: self.started_at,
            summary: self.summary(),
            outcomes: self
                .outcomes
                .iter()
                .map(|outcome| match &outcome.result {
                    Ok(progress) => OutcomeView {
                        member: &outcome.member_address,
                        status: if progress.is_complete() { "unsealed" } else { "in_progress" },
                        progress: Some(*progress),
                        error: None,
                    },
                    Err(failure) => OutcomeView {
                        member: &outcome.member_address,
                        status: "failed",
                        progress: None,
                        error: Some(failure.to_string()),
                    },
                })
                .collect(),
        };

        // Only plain strings and integers in the view, so this cannot fail
        serde_json::to_string_pretty(&view).unwrap_or_default()
    }
}

fn outcome_line(outcome: &UnsealOutcome) -> String {
    match &outcome.result {
        Ok(progress) if progress.is_complete() => {
            format!("{}: {} (unsealed)", outcome.member_address, progress)
        }
        Ok(progress) => format!("{}: {}", outcome.member_address, progress),
        Err(failure) => format!("{}: {}", outcome.member_address, failure),
    }
}
