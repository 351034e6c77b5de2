//! Console Report Sink
//!
//! Renders each tick as the classic text report or as one JSON document.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

use crate::domain::{Chain, PollResult, TickReport};
use crate::ports::ReportSink;
use super::format::{format_amount, short_address};

/// Output format for tick reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    format: ReportFormat,
    window: Duration,
}

impl ConsoleReporter {
    /// `window` is the transfer look-back, named in empty-chain lines
    pub fn new(format: ReportFormat, window: Duration) -> Self {
        Self { format, window }
    }

    pub fn render(&self, report: &TickReport) -> io::Result<String> {
        match self.format {
            ReportFormat::Text => Ok(render_text(report, self.window)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        }
    }
}

impl ReportSink for ConsoleReporter {
    fn publish(&self, report: &TickReport) -> io::Result<()> {
        let rendered = self.render(report)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
        stdout.flush()
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}

pub fn render_text(report: &TickReport, window: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n=== Stablecoin Metrics Report - {} ===",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for result in &report.results {
        render_token(&mut out, result, window);
    }

    out
}

fn render_token(out: &mut String, result: &PollResult, window: Duration) {
    let _ = writeln!(out, "\n{}:", result.token.symbol);
    if result.supply.failed {
        let _ = writeln!(out, "Total Supply: unavailable");
    } else {
        let _ = writeln!(out, "Total Supply: {}", format_amount(result.supply.total_supply));
    }

    for chain in Chain::ALL {
        let _ = writeln!(out, "\n{} Large Transactions:", chain);
        let txs = result.large_txs_on(chain);

        if result.chain_failed(chain) && txs.is_empty() {
            let reason = result
                .chain_errors(chain)
                .find(|e| e.is_failure())
                .or_else(|| result.failures().last())
                .map(|e| e.to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "No data ({})", reason);
            continue;
        }

        if txs.is_empty() {
            let _ = writeln!(out, "No large transactions found in the last {}", describe_window(window));
            continue;
        }

        for tx in txs {
            let _ = writeln!(
                out,
                "From: {} | To: {} | Value: {} | {}",
                short_address(&tx.raw.from_address),
                short_address(&tx.raw.to_address),
                format_amount(tx.value),
                chain.tx_url(&tx.raw.hash)
            );
        }
    }
}
