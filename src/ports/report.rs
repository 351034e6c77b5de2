//! Report sink port
//!
//! Completed ticks leave the core through a `ReportSink`. Rendering is the
//! adapter's business.

use tokio::sync::mpsc;

use crate::domain::TickReport;

pub trait ReportSink: Send + Sync {
    fn publish(&self, report: &TickReport) -> std::io::Result<()>;
}

/// Forward reports to another task
impl ReportSink for mpsc::UnboundedSender<TickReport> {
    fn publish(&self, report: &TickReport) -> std::io::Result<()> {
        self.send(report.clone())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "report receiver dropped"))
    }
}
