// src/report/sink.rs
// =============================================================================
// Drains a record channel into a writer (a file, stdout, a Vec in tests).
//
// Writing happens on a blocking thread so slow disks never stall the
// crawl workers. A failed write is logged and the sink keeps going with the
// next record.
// =============================================================================

use std::io::Write;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::warn;

use super::BrokenLinkRecord;

/// How each record is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line
    JsonLines,
    /// One human-readable line per record
    Text,
}

/// Spawns the writer task. The handle resolves to the number of records
/// written successfully once the channel closes.
pub fn spawn_writer<W>(
    mut rx: UnboundedReceiver<BrokenLinkRecord>,
    mut writer: W,
    format: OutputFormat,
) -> JoinHandle<usize>
where
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut written = 0;

        while let Some(record) = rx.blocking_recv() {
            match write_record(&mut writer, &record, format) {
                Ok(()) => written += 1,
                Err(e) => warn!(url = %record.url, error = %e, "failed to write broken link record"),
            }
        }

        if let Err(e) = writer.flush() {
            warn!(error = %e, "failed to flush report output");
        }

        written
    })
}

fn write_record<W: Write>(
    writer: &mut W,
    record: &BrokenLinkRecord,
    format: OutputFormat,
) -> std::io::Result<()> {
    match format {
        OutputFormat::JsonLines => {
            serde_json::to_writer(&mut *writer, record)?;
            writeln!(writer)
        }
        OutputFormat::Text => writeln!(writer, "{}", format_text(record)),
    }
}

pub(crate) fn format_text(record: &BrokenLinkRecord) -> String {
    let referrer = if record.referrer_page.is_empty() {
        "(seed)".to_string()
    } else {
        format!(
            "{} [href=\"{}\" text=\"{}\"]",
            record.referrer_page, record.referrer_href, record.referrer_text
        )
    };
    format!("{:<12} {} <- {}", record.status.to_string(), record.url, referrer)
}
