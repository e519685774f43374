// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tunables for the print and check-printer operations, with the defaults the
// binary exposes as flags.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a print-job run.
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// How long to wait for the printer to become ready.
    pub printer_ready_timeout: Duration,
    /// Sleep between readiness probes.
    pub printer_ready_delay: Duration,
    /// Requested overall deadline.  The orchestrator floors this to one hour.
    pub print_deadline: Duration,
    /// Attempt cap shared by Send-Document and Print-Job.
    pub max_send_attempts: u32,
    /// Attempt cap for Create-Job when the printer returns invalid job-ids.
    pub max_create_job_attempts: u32,
    /// How many HTTP 401 responses to tolerate before giving up.
    pub max_unauthorised_attempts: u32,
    /// Base backoff between retries; jitter adds up to the same again.
    pub retry_backoff: Duration,
    /// Force the one-phase Print-Job operation even when the printer
    /// supports Create-Job + Send-Document.
    pub force_print_job: bool,
    /// Directory the document rewinder spools into.
    pub spool_dir: PathBuf,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            printer_ready_timeout: Duration::from_secs(600),
            printer_ready_delay: Duration::from_secs(2),
            print_deadline: Duration::from_secs(30),
            max_send_attempts: 5,
            max_create_job_attempts: 3,
            max_unauthorised_attempts: 4,
            retry_backoff: Duration::from_secs(5),
            force_print_job: false,
            spool_dir: std::env::temp_dir(),
        }
    }
}

/// Configuration for a check-printer run.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Attempt cap for Get-Printer-Attributes.  Values below one are
    /// clamped up by the accessor.
    pub get_attribute_retries: u32,
    /// Fixed sleep between failed attempts.
    pub retry_delay: Duration,
    /// Expected printer-device-id raw value, when the caller wants it
    /// verified.
    pub device_id: Option<String>,
    /// Regex whose capture group 2 extracts the serial number from a raw
    /// device id.
    pub device_id_sn_regex: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            get_attribute_retries: 5,
            retry_delay: Duration::from_millis(500),
            device_id: None,
            device_id_sn_regex: None,
        }
    }
}

impl CheckConfig {
    /// The retry cap, never below one attempt.
    pub fn attempts(&self) -> u32 {
        self.get_attribute_retries.max(1)
    }
}
