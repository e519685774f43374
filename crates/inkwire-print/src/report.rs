// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing report sink: one line per IPP operation attempt, in a fixed
// machine-greppable format.  Kept separate from tracing so the report
// survives whatever filtering the embedder configures for diagnostics.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Line prefix for every report entry.
pub const PROCESSING_REPORT_MARKER: &str = "PROCESSING REPORT:";

// Operation names as they appear in report lines.
pub const OP_CREATE_JOB: &str = "create-job";
pub const OP_SEND_DOCUMENT: &str = "send-document";
pub const OP_PRINT_JOB: &str = "print-job";
pub const OP_CANCEL_JOB: &str = "cancel-job";
pub const OP_GET_PRINTER_ATTRIBUTES: &str = "get-printer-attributes";
pub const OP_GET_JOB_ATTRIBUTES: &str = "get-job-attributes";

/// Append-only sink for per-attempt records.
///
/// Implementations must be safe for concurrent callers and must not block
/// beyond the write itself; failures are swallowed, never surfaced.
pub trait ProcessingLog: Send + Sync {
    fn log(&self, operation: &str, attempt: u32, note: &str, duration: Duration);
}

/// Writes report lines to an arbitrary writer under a mutex.
pub struct WriterProcessingLog {
    output: Mutex<Box<dyn Write + Send>>,
}

impl WriterProcessingLog {
    pub fn new(output: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(output),
        }
    }
}

impl ProcessingLog for WriterProcessingLog {
    fn log(&self, operation: &str, attempt: u32, note: &str, duration: Duration) {
        let line = format!(
            "{PROCESSING_REPORT_MARKER}{operation}: attempt {attempt} - {note}, time - {duration:?}\n"
        );
        if let Ok(mut output) = self.output.lock() {
            let _ = output.write_all(line.as_bytes());
        }
    }
}

/// The default sink: report lines on stderr.
pub struct StderrProcessingLog;

impl ProcessingLog for StderrProcessingLog {
    fn log(&self, operation: &str, attempt: u32, note: &str, duration: Duration) {
        let line = format!(
            "{PROCESSING_REPORT_MARKER}{operation}: attempt {attempt} - {note}, time - {duration:?}\n"
        );
        let _ = std::io::stderr().write_all(line.as_bytes());
    }
}

/// Discards every record.  For embedders that do not want the report.
pub struct NullProcessingLog;

impl ProcessingLog for NullProcessingLog {
    fn log(&self, _operation: &str, _attempt: u32, _note: &str, _duration: Duration) {}
}
