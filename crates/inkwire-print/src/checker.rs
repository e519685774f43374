// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// check-printer: a degenerate orchestration that only verifies the printer
// answers Get-Printer-Attributes, optionally matches its device id, and
// refreshes the attribute cache for an imminent print.

use std::sync::Arc;
use std::time::Instant;

use ipp::prelude::Uri;
use regex::Regex;
use tracing::{debug, error, warn};

use inkwire_core::{CheckConfig, ErrorKind, OperationError, PrinterAttributes};

use crate::attrs::{fetch_printer_attributes, PRINTER_READY_ATTRIBUTES};
use crate::cache::PrinterAttributeCache;
use crate::report::{ProcessingLog, OP_GET_PRINTER_ATTRIBUTES};
use crate::transport::{IppTransport, TransportError};

/// Verify the printer at `printer_uri` is reachable and ready.
///
/// The cache fast-path answers without touching the printer when a fresh
/// entry exists and the device id (if any) matches.  Otherwise the printer
/// is probed up to the configured retry count with a fixed sleep between
/// failures; a ready answer is written back to the cache.
pub async fn check_printer(
    transport: &Arc<dyn IppTransport>,
    report: &Arc<dyn ProcessingLog>,
    cache: Option<&PrinterAttributeCache>,
    printer_uri: &str,
    config: &CheckConfig,
) -> Result<(), OperationError> {
    let started = Instant::now();

    if printer_uri.is_empty() {
        return Err(OperationError::new(
            ErrorKind::CheckPrinter,
            "printerURI empty",
        ));
    }
    let uri: Uri = printer_uri.parse().map_err(|e| {
        OperationError::new(
            ErrorKind::CheckPrinter,
            format!("invalid printer uri {printer_uri:?}: {e}"),
        )
    })?;

    debug!(printer_uri, "get-printer-attributes starting");

    // Cache fast-path, best effort only.
    if let Some(cache) = cache {
        match cache.get(printer_uri) {
            Ok(cached) => {
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    1,
                    "ipp-printer-attribute-cache: Found",
                    started.elapsed(),
                );
                match &config.device_id {
                    Some(device_id)
                        if device_id_matches(
                            device_id,
                            config.device_id_sn_regex.as_deref(),
                            &cached,
                        ) =>
                    {
                        return Ok(());
                    }
                    Some(_) => debug!(
                        "cached printer-device-id does not match, fetching fresh attributes"
                    ),
                    None => {}
                }
            }
            Err(err) => {
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    1,
                    "ipp-printer-attribute-cache: Not Found",
                    started.elapsed(),
                );
                debug!(printer_uri, error = %err, "attribute cache miss");
            }
        }
    }

    let max_attempts = config.attempts();
    let mut attempt: u32 = 0;
    let mut attributes: Option<PrinterAttributes> = None;
    let mut last_error: Option<TransportError> = None;

    while attempt < max_attempts {
        attempt += 1;
        match fetch_printer_attributes(transport.as_ref(), &uri, PRINTER_READY_ATTRIBUTES, None)
            .await
        {
            Err(TransportError::Malformed(detail)) => {
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    attempt,
                    "failed-malformed-attributes",
                    started.elapsed(),
                );
                return Err(OperationError::new(
                    ErrorKind::ErrorResponse,
                    format!(
                        "get-printer-attributes:[{printer_uri}] failed err: malformed attributes: {detail}, elapsed: {:?}",
                        started.elapsed()
                    ),
                ));
            }
            Err(err) => {
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    attempt,
                    &format!("failed err: {err}, retrying"),
                    started.elapsed(),
                );
                error!(printer_uri, attempt, error = %err, "get-printer-attributes failed");
                last_error = Some(err);
                tokio::time::sleep(config.retry_delay).await;
            }
            Ok((status, attrs)) => {
                if !status.is_success() {
                    report.log(
                        OP_GET_PRINTER_ATTRIBUTES,
                        attempt,
                        "failed-printer not ready",
                        started.elapsed(),
                    );
                    return Err(OperationError::new(
                        ErrorKind::PrinterNotReady,
                        format!("get-printer-attributes:[{printer_uri}] done, printer is not ready"),
                    ));
                }
                report.log(
                    OP_GET_PRINTER_ATTRIBUTES,
                    attempt,
                    &format!("Done:status code - {status:?}"),
                    started.elapsed(),
                );
                attributes = Some(attrs);
                break;
            }
        }
    }

    let Some(attributes) = attributes else {
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no response".into());
        return Err(OperationError::new(
            ErrorKind::Network,
            format!(
                "get-printer-attributes:[{printer_uri}] failed err: {detail}, attempt: {attempt}, elapsed: {:?}",
                started.elapsed()
            ),
        ));
    };

    debug!(printer_uri, elapsed = ?started.elapsed(), "get-printer-attributes success");

    if let Some(device_id) = &config.device_id {
        if !device_id_matches(device_id, config.device_id_sn_regex.as_deref(), &attributes) {
            return Err(OperationError::new(
                ErrorKind::DeviceIdMismatch,
                "printer device Id does not match the criteria",
            ));
        }
    }

    // Refresh the cache only for a ready printer: an imminent print against
    // the same URI can then skip the probe entirely.
    if let Some(cache) = cache {
        if attributes.is_ready() {
            debug!(printer_uri, "caching printer attributes");
            if let Err(err) = cache.set(printer_uri, &attributes) {
                debug!(error = %err, "failed to cache printer attributes");
            }
        }
    }

    Ok(())
}

/// Device-id verification.
///
/// Raw equality passes.  Failing that, when a serial-number regex is
/// supplied and matches both raw strings, capture group 2 of each is
/// compared; both groups must be non-empty and equal.  An empty expected id
/// passes, keeping the check best-effort.
pub fn device_id_matches(
    expected_raw: &str,
    sn_regex: Option<&str>,
    attributes: &PrinterAttributes,
) -> bool {
    if expected_raw.is_empty() {
        return true;
    }
    if attributes.printer_device_id == expected_raw {
        return true;
    }

    let Some(pattern) = sn_regex.filter(|p| !p.is_empty()) else {
        return false;
    };
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            warn!(pattern, error = %err, "invalid device-id serial regex, treating as mismatch");
            return false;
        }
    };

    let expected_sn = serial_number(&regex, expected_raw);
    let reported_sn = serial_number(&regex, &attributes.printer_device_id);
    match (expected_sn, reported_sn) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

fn serial_number<'a>(regex: &Regex, raw: &'a str) -> Option<&'a str> {
    regex
        .captures(raw)
        .and_then(|captures| captures.get(2))
        .map(|m| m.as_str())
}
