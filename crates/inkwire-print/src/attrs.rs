// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extracting typed attribute models from parsed IPP responses.

use ipp::prelude::*;

use inkwire_core::PrinterAttributes;

use crate::transport::{IppCredentials, IppTransport, TransportError};

/// Attribute set requested when probing readiness and capabilities.
pub(crate) const PRINTER_READY_ATTRIBUTES: &[&str] = &[
    "printer-is-accepting-jobs",
    "printer-state",
    "printer-state-reasons",
    "printer-state-message",
    "operations-supported",
    "document-format-supported",
    "document-format-default",
    "finishings-supported",
    "media-col-supported",
    "media-supported",
    "sides-supported",
    "print-color-mode-supported",
    "printer-device-id",
    "printer-make-and-model",
    "printer-name",
    "printer-uri-supported",
];

/// Attribute set the monitor polls for printer-state logging.
pub(crate) const PRINTER_STATE_ATTRIBUTES: &[&str] = &[
    "printer-state",
    "printer-state-reasons",
    "printer-state-message",
];

/// Attribute set the monitor polls per job.
pub(crate) const JOB_STATUS_ATTRIBUTES: &[&str] =
    &["job-state", "job-state-message", "job-state-reasons", "job-id"];

/// Job status fields pulled from a Job Attributes group.
#[derive(Debug, Clone, Default)]
pub(crate) struct JobStatusInfo {
    pub job_id: i32,
    pub job_uri: String,
    pub state: i32,
    pub state_message: String,
    pub state_reasons: Vec<String>,
}

/// Issue Get-Printer-Attributes and return the IPP status plus the parsed
/// printer attributes.
pub(crate) async fn fetch_printer_attributes(
    transport: &dyn IppTransport,
    uri: &Uri,
    requested: &[&str],
    credentials: Option<&IppCredentials>,
) -> Result<(StatusCode, PrinterAttributes), TransportError> {
    let request = crate::requests::get_printer_attributes(uri, requested);
    let response = transport.send(uri, request, credentials).await?;
    let status = response.header().status_code();
    let attrs = printer_attributes_from_ipp(response.attributes());
    Ok((status, attrs))
}

/// Flatten the Printer Attributes group into the typed model.
pub(crate) fn printer_attributes_from_ipp(attrs: &IppAttributes) -> PrinterAttributes {
    let mut out = PrinterAttributes::default();

    for group in attrs.groups_of(DelimiterTag::PrinterAttributes) {
        for (name, attr) in group.attributes() {
            let value = attr.value();
            match name.as_str() {
                "operations-supported" => out.operations_supported = ints(value),
                "document-format-supported" => out.document_format_supported = strings(value),
                "document-format-default" => {
                    out.document_format_default = string(value).unwrap_or_default()
                }
                "finishings-supported" => out.finishings_supported = ints(value),
                "media-col-supported" => out.media_col_supported = strings(value),
                "media-supported" => out.media_supported = strings(value),
                "sides-supported" => out.sides_supported = strings(value),
                "print-color-mode-supported" => out.print_color_mode_supported = strings(value),
                "printer-is-accepting-jobs" => {
                    out.printer_is_accepting_jobs = boolean(value).unwrap_or(false)
                }
                "printer-state" => out.printer_state = int(value).unwrap_or_default(),
                "printer-state-reasons" => out.printer_state_reasons = strings(value),
                "printer-state-message" => {
                    out.printer_state_message = string(value).unwrap_or_default()
                }
                "printer-device-id" => out.printer_device_id = string(value).unwrap_or_default(),
                "printer-make-and-model" => {
                    out.printer_make_and_model = string(value).unwrap_or_default()
                }
                "printer-name" => out.printer_name = string(value).unwrap_or_default(),
                "printer-uri-supported" => out.printer_uri_supported = strings(value),
                _ => {}
            }
        }
    }

    out
}

/// Pull the job status out of the first Job Attributes group, or `None`
/// when the response carries no such group at all.
pub(crate) fn job_status_from_ipp(attrs: &IppAttributes) -> Option<JobStatusInfo> {
    let group = attrs.groups_of(DelimiterTag::JobAttributes).next()?;
    let mut info = JobStatusInfo::default();

    for (name, attr) in group.attributes() {
        let value = attr.value();
        match name.as_str() {
            "job-id" => info.job_id = int(value).unwrap_or_default(),
            "job-uri" => info.job_uri = string(value).unwrap_or_default(),
            "job-state" => info.state = int(value).unwrap_or_default(),
            "job-state-message" => info.state_message = string(value).unwrap_or_default(),
            "job-state-reasons" => info.state_reasons = strings(value),
            _ => {}
        }
    }

    Some(info)
}

fn int(value: &IppValue) -> Option<i32> {
    match value {
        IppValue::Integer(v) | IppValue::Enum(v) => Some(*v),
        IppValue::Array(values) => values.first().and_then(int),
        _ => None,
    }
}

fn ints(value: &IppValue) -> Vec<i32> {
    match value {
        IppValue::Array(values) => values.iter().filter_map(int).collect(),
        other => int(other).into_iter().collect(),
    }
}

fn string(value: &IppValue) -> Option<String> {
    match value {
        IppValue::Keyword(s)
        | IppValue::MimeMediaType(s)
        | IppValue::TextWithoutLanguage(s)
        | IppValue::NameWithoutLanguage(s)
        | IppValue::Uri(s)
        | IppValue::Charset(s)
        | IppValue::NaturalLanguage(s) => Some(s.clone()),
        IppValue::Array(values) => values.first().and_then(string),
        _ => None,
    }
}

fn strings(value: &IppValue) -> Vec<String> {
    match value {
        IppValue::Array(values) => values.iter().filter_map(string).collect(),
        other => string(other).into_iter().collect(),
    }
}

fn boolean(value: &IppValue) -> Option<bool> {
    match value {
        IppValue::Boolean(b) => Some(*b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_printer_group() -> IppRequestResponse {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        let attrs = response.attributes_mut();
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new(
                "operations-supported",
                IppValue::Array(vec![IppValue::Enum(0x0005), IppValue::Enum(0x0006)]),
            ),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new("printer-is-accepting-jobs", IppValue::Boolean(true)),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new(
                "document-format-supported",
                IppValue::Array(vec![
                    IppValue::MimeMediaType("application/pdf".into()),
                    IppValue::MimeMediaType("application/postscript".into()),
                ]),
            ),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new(
                "printer-state-reasons",
                IppValue::Keyword("none".into()),
            ),
        );
        response
    }

    #[test]
    fn printer_group_is_flattened() {
        let response = response_with_printer_group();
        let attrs = printer_attributes_from_ipp(response.attributes());
        assert_eq!(attrs.operations_supported, vec![0x0005, 0x0006]);
        assert!(attrs.printer_is_accepting_jobs);
        assert_eq!(
            attrs.document_format_supported,
            vec!["application/pdf".to_string(), "application/postscript".to_string()]
        );
        // Single-valued 1setOf still lands in the vec.
        assert_eq!(attrs.printer_state_reasons, vec!["none".to_string()]);
    }

    #[test]
    fn missing_job_group_yields_none() {
        let response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        assert!(job_status_from_ipp(response.attributes()).is_none());
    }

    #[test]
    fn job_group_is_extracted() {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        let attrs = response.attributes_mut();
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-id", IppValue::Integer(42)),
        );
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-state", IppValue::Enum(9)),
        );
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new(
                "job-state-reasons",
                IppValue::Keyword("job-completed-successfully".into()),
            ),
        );

        let info = job_status_from_ipp(response.attributes()).unwrap();
        assert_eq!(info.job_id, 42);
        assert_eq!(info.state, 9);
        assert_eq!(
            info.state_reasons,
            vec!["job-completed-successfully".to_string()]
        );
    }
}
