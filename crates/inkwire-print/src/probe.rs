// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer readiness prober: polls Get-Printer-Attributes until the printer
// can take a job, the printer-ready timeout lapses, or the run's deadline
// fires.

use std::sync::Arc;
use std::time::Duration;

use ipp::prelude::Uri;
use tracing::{debug, error};

use inkwire_core::{ErrorKind, OperationError, PrintConfig, PrinterAttributes};

use crate::attrs::{fetch_printer_attributes, PRINTER_READY_ATTRIBUTES};
use crate::context::PrintContext;
use crate::report::{ProcessingLog, OP_GET_PRINTER_ATTRIBUTES};
use crate::transport::{IppCredentials, IppTransport, TransportError};

/// Poll the printer until it reports ready, returning its full attribute
/// set.
///
/// Failed probes and not-ready answers sleep `printer_ready_delay` and try
/// again; a response whose attributes cannot be parsed is fatal.  HTTP
/// error statuses are logged and retried like any other failure.
pub async fn wait_for_printer_ready(
    ctx: &PrintContext,
    transport: &Arc<dyn IppTransport>,
    report: &Arc<dyn ProcessingLog>,
    printer_uri: &Uri,
    credentials: Option<&IppCredentials>,
    config: &PrintConfig,
) -> Result<PrinterAttributes, OperationError> {
    let ready_deadline = tokio::time::Instant::now() + config.printer_ready_timeout;
    let delay = config.printer_ready_delay;
    let mut attempts: u32 = 0;

    loop {
        if tokio::time::Instant::now() >= ready_deadline {
            debug!(timeout = ?config.printer_ready_timeout, "printer ready wait timed out");
            return Err(OperationError::new(
                ErrorKind::PrinterReadyTimeout,
                format!(
                    "printer ready timeout: waited {} seconds",
                    config.printer_ready_timeout.as_secs()
                ),
            ));
        }
        if ctx.is_cancelled() {
            debug!("context cancelled while waiting for printer ready");
            return Err(ctx.operation_error("while waiting for printer ready"));
        }

        attempts += 1;
        let started = std::time::Instant::now();
        let result =
            fetch_printer_attributes(transport.as_ref(), printer_uri, PRINTER_READY_ATTRIBUTES, credentials)
                .await;
        let duration = started.elapsed();

        match result {
            Err(TransportError::Malformed(detail)) => {
                error!(%detail, "printer returned malformed attributes");
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    attempts,
                    &format!("failed to get printer attributes, malformed response: {detail}"),
                    duration,
                );
                return Err(OperationError::new(
                    ErrorKind::PrintDefault,
                    format!("malformed printer attributes: {detail}"),
                ));
            }
            Err(err) => {
                let note = match err.http_status() {
                    Some(status) => {
                        format!("failed to get printer attributes, err: http status code {status}")
                    }
                    None => format!(
                        "failed to get printer attributes, err: {err}, retry in {} sec",
                        delay.as_secs()
                    ),
                };
                error!(error = %err, "failed to get printer attributes");
                report.log(OP_GET_PRINTER_ATTRIBUTES, attempts, &note, duration);
                sleep_delay(ctx, delay).await;
            }
            Ok((_status, attrs)) => match attrs.not_ready_reason() {
                Some(reason) => {
                    let note = format!(
                        "printer is not ready to accept job: printer state reason: {reason}, retry in {} sec",
                        delay.as_secs()
                    );
                    error!(reason, "printer not ready");
                    report.log(OP_GET_PRINTER_ATTRIBUTES, attempts, &note, duration);
                    sleep_delay(ctx, delay).await;
                }
                None => {
                    report.log(
                        OP_GET_PRINTER_ATTRIBUTES,
                        attempts,
                        "received supported printer attributes",
                        duration,
                    );
                    return Ok(attrs);
                }
            },
        }
    }
}

/// Sleep between probes; cancellation cuts the sleep short and is observed
/// at the top of the loop.
async fn sleep_delay(ctx: &PrintContext, delay: Duration) {
    tokio::select! {
        _ = ctx.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}
