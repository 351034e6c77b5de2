//! Console Adapter
//!
//! ReportSink that prints tick reports to stdout.

mod format;
mod reporter;

pub use format::{format_amount, short_address};
pub use reporter::{render_text, ConsoleReporter, ReportFormat};
