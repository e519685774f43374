// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer attributes as reported by Get-Printer-Attributes.
//
// The serde names are kebab-case so the struct round-trips through the
// on-disk attribute cache in the same shape the IPP attributes use.

use serde::{Deserialize, Serialize};

/// A printer's capabilities and current state, flattened from the Printer
/// Attributes group of a Get-Printer-Attributes response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PrinterAttributes {
    /// IPP operation identifiers the printer implements.
    pub operations_supported: Vec<i32>,
    /// Supported document MIME types, in the printer's preference order.
    pub document_format_supported: Vec<String>,
    pub document_format_default: String,
    /// Supported finishings enum values.
    pub finishings_supported: Vec<i32>,
    /// Non-empty when the printer accepts media-col collections.
    pub media_col_supported: Vec<String>,
    pub media_supported: Vec<String>,
    pub sides_supported: Vec<String>,
    pub print_color_mode_supported: Vec<String>,
    pub printer_is_accepting_jobs: bool,
    pub printer_state: i32,
    pub printer_state_reasons: Vec<String>,
    pub printer_state_message: String,
    pub printer_device_id: String,
    pub printer_make_and_model: String,
    pub printer_name: String,
    pub printer_uri_supported: Vec<String>,
}

impl PrinterAttributes {
    /// Reason the printer cannot take a job right now, or `None` when ready.
    ///
    /// A printer is ready when it is accepting jobs and no state reason
    /// mentions a full spool area.  The spool check is a substring match:
    /// printers commonly report suffixed keywords such as
    /// "spool-area-full-warning".
    pub fn not_ready_reason(&self) -> Option<&'static str> {
        if !self.printer_is_accepting_jobs {
            return Some("printer-not-accepting-jobs");
        }
        if self
            .printer_state_reasons
            .iter()
            .any(|reason| reason.contains("spool-area-full"))
        {
            return Some("spool-area-full");
        }
        None
    }

    pub fn is_ready(&self) -> bool {
        self.not_ready_reason().is_none()
    }

    /// Whether every one of `required` appears in operations-supported.
    /// An empty requirement list is rejected.
    pub fn supports_operations(&self, required: &[i32]) -> bool {
        if required.is_empty() {
            return false;
        }
        required
            .iter()
            .all(|op| self.operations_supported.contains(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepting_printer_with_clear_reasons_is_ready() {
        let attrs = PrinterAttributes {
            printer_is_accepting_jobs: true,
            printer_state_reasons: vec!["none".into()],
            ..PrinterAttributes::default()
        };
        assert!(attrs.is_ready());
    }

    #[test]
    fn not_accepting_jobs_is_not_ready() {
        let attrs = PrinterAttributes {
            printer_is_accepting_jobs: false,
            ..PrinterAttributes::default()
        };
        assert_eq!(attrs.not_ready_reason(), Some("printer-not-accepting-jobs"));
    }

    #[test]
    fn spool_area_full_matches_as_substring() {
        let attrs = PrinterAttributes {
            printer_is_accepting_jobs: true,
            printer_state_reasons: vec!["spool-area-full-warning".into()],
            ..PrinterAttributes::default()
        };
        assert_eq!(attrs.not_ready_reason(), Some("spool-area-full"));
    }

    #[test]
    fn operations_supported_requires_every_operation() {
        let attrs = PrinterAttributes {
            operations_supported: vec![0x0002, 0x0005],
            ..PrinterAttributes::default()
        };
        assert!(attrs.supports_operations(&[0x0005]));
        assert!(!attrs.supports_operations(&[0x0005, 0x0006]));
        assert!(!attrs.supports_operations(&[]));
    }

    #[test]
    fn serde_round_trip_is_lossless() {
        let attrs = PrinterAttributes {
            operations_supported: vec![2, 5, 6],
            document_format_supported: vec!["application/pdf".into()],
            printer_is_accepting_jobs: true,
            printer_state: 3,
            printer_state_reasons: vec!["none".into()],
            printer_device_id: "MFG:ACME;MDL:Laser;SN:X1;".into(),
            ..PrinterAttributes::default()
        };
        let json = serde_json::to_string(&attrs).unwrap();
        // On-disk names follow the IPP attribute spelling.
        assert!(json.contains("\"printer-is-accepting-jobs\":true"));
        let back: PrinterAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
    }
}
