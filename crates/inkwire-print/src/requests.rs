// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Builders for the IPP requests this client issues.

use std::collections::BTreeMap;

use ipp::prelude::*;

use inkwire_core::template::{JobTemplate, MediaSelection, MULTI_DOCUMENT_HANDLING};

/// Get-Printer-Attributes limited to `requested` attribute names.
pub(crate) fn get_printer_attributes(uri: &Uri, requested: &[&str]) -> IppRequestResponse {
    let mut request = IppRequestResponse::new(
        IppVersion::v1_1(),
        Operation::GetPrinterAttributes,
        Some(uri.clone()),
    );
    add_requested_attributes(&mut request, requested);
    request
}

/// Get-Job-Attributes for one job, identified by printer-uri + job-id.
pub(crate) fn get_job_attributes(uri: &Uri, job_id: i32, requested: &[&str]) -> IppRequestResponse {
    let mut request = IppRequestResponse::new(
        IppVersion::v1_1(),
        Operation::GetJobAttributes,
        Some(uri.clone()),
    );
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new("job-id", IppValue::Integer(job_id)),
    );
    add_requested_attributes(&mut request, requested);
    request
}

/// Create-Job carrying the job-template attributes.
pub(crate) fn create_job(uri: &Uri, template: &JobTemplate) -> IppRequestResponse {
    let mut request = IppRequestResponse::new(
        IppVersion::v1_1(),
        Operation::CreateJob,
        Some(uri.clone()),
    );
    add_job_template(&mut request, template);
    request
}

/// Send-Document with the spooled document as payload.
pub(crate) fn send_document(
    uri: &Uri,
    job_id: i32,
    payload: IppPayload,
    document_format: &str,
    last_document: bool,
) -> IppRequestResponse {
    let mut request = IppRequestResponse::new(
        IppVersion::v1_1(),
        Operation::SendDocument,
        Some(uri.clone()),
    );
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new("job-id", IppValue::Integer(job_id)),
    );
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new(
            "document-format",
            IppValue::MimeMediaType(document_format.to_string()),
        ),
    );
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new("last-document", IppValue::Boolean(last_document)),
    );
    *request.payload_mut() = payload;
    request
}

/// One-phase Print-Job: job template and document in a single request.
pub(crate) fn print_job(
    uri: &Uri,
    template: &JobTemplate,
    payload: IppPayload,
    document_format: &str,
) -> IppRequestResponse {
    let mut request =
        IppRequestResponse::new(IppVersion::v1_1(), Operation::PrintJob, Some(uri.clone()));
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new(
            "document-format",
            IppValue::MimeMediaType(document_format.to_string()),
        ),
    );
    add_job_template(&mut request, template);
    *request.payload_mut() = payload;
    request
}

pub(crate) fn cancel_job(uri: &Uri, job_id: i32) -> IppRequestResponse {
    let mut request =
        IppRequestResponse::new(IppVersion::v1_1(), Operation::CancelJob, Some(uri.clone()));
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new("job-id", IppValue::Integer(job_id)),
    );
    request
}

fn add_requested_attributes(request: &mut IppRequestResponse, requested: &[&str]) {
    if requested.is_empty() {
        return;
    }
    let values = requested
        .iter()
        .map(|name| IppValue::Keyword(name.to_string()))
        .collect();
    request.attributes_mut().add(
        DelimiterTag::OperationAttributes,
        IppAttribute::new("requested-attributes", IppValue::Array(values)),
    );
}

/// Attach the job-template attribute group.
fn add_job_template(request: &mut IppRequestResponse, template: &JobTemplate) {
    let attributes = request.attributes_mut();

    attributes.add(
        DelimiterTag::JobAttributes,
        IppAttribute::new("copies", IppValue::Integer(template.copies)),
    );
    attributes.add(
        DelimiterTag::JobAttributes,
        IppAttribute::new(
            "print-color-mode",
            IppValue::Keyword(template.color_mode.clone()),
        ),
    );
    attributes.add(
        DelimiterTag::JobAttributes,
        IppAttribute::new("sides", IppValue::Keyword(template.sides.clone())),
    );
    attributes.add(
        DelimiterTag::JobAttributes,
        IppAttribute::new(
            "multiple-document-handling",
            IppValue::Keyword(MULTI_DOCUMENT_HANDLING.to_string()),
        ),
    );

    if !template.finishings.is_empty() {
        let values = template
            .finishings
            .iter()
            .map(|v| IppValue::Enum(*v))
            .collect();
        attributes.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("finishings", IppValue::Array(values)),
        );
    }

    match &template.media {
        MediaSelection::Keyword(keyword) => {
            attributes.add(
                DelimiterTag::JobAttributes,
                IppAttribute::new("media", IppValue::Keyword(keyword.clone())),
            );
        }
        MediaSelection::Collection {
            x_dimension,
            y_dimension,
        } => {
            let media_size = IppValue::Collection(BTreeMap::from([
                ("x-dimension".to_string(), IppValue::Integer(*x_dimension)),
                ("y-dimension".to_string(), IppValue::Integer(*y_dimension)),
            ]));
            let media_col = IppValue::Collection(BTreeMap::from([(
                "media-size".to_string(),
                media_size,
            )]));
            attributes.add(
                DelimiterTag::JobAttributes,
                IppAttribute::new("media-col", media_col),
            );
        }
    }

    if let Some(orientation) = template.orientation {
        attributes.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new(
                "orientation-requested",
                IppValue::Enum(orientation.ipp_enum_value()),
            ),
        );
    }
}
