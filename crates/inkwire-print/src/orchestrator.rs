// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print orchestrator: drives a single job from readiness check through
// document upload to a terminal outcome.
//
// Sequence: resolve printer attributes (cache, else readiness probe with
// write-back), derive the job template and document format, start the
// monitor, then run the uploader and the monitor wait concurrently under
// one deadline.  The first of deadline, uploader error, or job
// finalisation decides the outcome.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use ipp::prelude::{Operation, Uri};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use inkwire_core::{
    CheckConfig, ErrorKind, FinishingsCatalog, JobTicket, JobTemplate, MediaCatalog,
    OperationError, PrintConfig, PrinterAttributes,
};

use crate::cache::PrinterAttributeCache;
use crate::checker;
use crate::context::PrintContext;
use crate::document::RewindableDocument;
use crate::engine::IppEngine;
use crate::monitor::JobMonitor;
use crate::probe;
use crate::report::{ProcessingLog, OP_PRINT_JOB};
use crate::transport::{IppCredentials, IppTransport};

/// Two-phase submission needs both of these from operations-supported.
const PREFERRED_JOB_OPERATIONS: [i32; 2] =
    [Operation::CreateJob as i32, Operation::SendDocument as i32];

/// Deadlines shorter than this are raised to it.  An hour was the fielded
/// hard-coded bound for years; shortening it would regress slow printers.
const MIN_PRINT_DEADLINE: Duration = Duration::from_secs(3600);

/// The embedder-facing client for submitting and checking print work.
pub struct PrintClient {
    transport: Arc<dyn IppTransport>,
    report: Arc<dyn ProcessingLog>,
    cache: Option<Arc<PrinterAttributeCache>>,
    media: MediaCatalog,
    finishings: FinishingsCatalog,
}

impl PrintClient {
    pub fn new(
        transport: Arc<dyn IppTransport>,
        report: Arc<dyn ProcessingLog>,
        cache: Option<Arc<PrinterAttributeCache>>,
    ) -> Self {
        Self {
            transport,
            report,
            cache,
            media: MediaCatalog::default(),
            finishings: FinishingsCatalog::default(),
        }
    }

    /// Replace the default media and finishings mapping tables.
    pub fn with_catalogs(mut self, media: MediaCatalog, finishings: FinishingsCatalog) -> Self {
        self.media = media;
        self.finishings = finishings;
        self
    }

    /// Submit `document` to the printer and wait for the job to finish.
    #[instrument(skip_all, fields(printer_uri))]
    pub async fn print_job(
        &self,
        ticket: &JobTicket,
        printer_uri: &str,
        document: Box<dyn Read + Send>,
        config: &PrintConfig,
    ) -> Result<(), OperationError> {
        if printer_uri.is_empty() {
            return Err(OperationError::new(
                ErrorKind::PrintDefault,
                "printerURI empty",
            ));
        }
        let uri: Uri = printer_uri.parse().map_err(|e| {
            OperationError::new(
                ErrorKind::PrintDefault,
                format!("invalid printer uri {printer_uri:?}: {e}"),
            )
        })?;

        let credentials = ticket_credentials(ticket);
        debug!(?ticket, "requesting print job");

        let deadline = config.print_deadline.max(MIN_PRINT_DEADLINE);
        let ctx = PrintContext::with_deadline(deadline);

        let printer_attributes = self
            .resolve_printer_attributes(&ctx, &uri, printer_uri, credentials.as_ref(), config)
            .await?;

        let template = JobTemplate::build(ticket, &printer_attributes, &self.media, &self.finishings);
        debug!(?template, "job template derived");

        let Some(document_format) = map_document_format(ticket, &printer_attributes) else {
            error!(
                requested = %ticket.document_format,
                supported = ?printer_attributes.document_format_supported,
                "document format not supported"
            );
            return Err(OperationError::new(
                ErrorKind::DocFormatMismatch,
                format!(
                    "document format not supported: printing={} supported={:?}",
                    ticket.document_format, printer_attributes.document_format_supported
                ),
            ));
        };

        let document = RewindableDocument::new(document, &config.spool_dir).map_err(|err| {
            OperationError::new(
                ErrorKind::PrintDefault,
                format!("failed to create temporary file: {err}"),
            )
        })?;

        let monitor = JobMonitor::start(
            ctx.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.report),
            uri.clone(),
            credentials.clone(),
        );

        let mut engine = IppEngine::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.report),
            monitor.handle(),
            credentials,
            config,
        );

        let two_phase = !config.force_print_job
            && printer_attributes.supports_operations(&PREFERRED_JOB_OPERATIONS);

        let (upload_err_tx, mut upload_err_rx) = mpsc::channel::<OperationError>(1);
        let uploader_ctx = ctx.clone();
        let uploader_format = document_format.clone();
        tokio::spawn(async move {
            let result = if two_phase {
                debug!(document_format = %uploader_format, "printing via Create-Job + Send-Document");
                engine
                    .create_and_send(&uploader_ctx, &uri, &template, &document, &uploader_format)
                    .await
            } else {
                debug!(document_format = %uploader_format, "printing via Print-Job");
                engine
                    .print_job(&uploader_ctx, &uri, &template, &document, &uploader_format)
                    .await
            };
            if let Err(err) = result {
                error!(error = %err, "failed to print job");
                let _ = upload_err_tx.send(err).await;
            }
        });

        let wait = monitor.wait();
        tokio::pin!(wait);

        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.operation_error("print operation")),
            Some(err) = upload_err_rx.recv() => {
                ctx.cancel();
                Err(err)
            }
            result = &mut wait => {
                ctx.cancel();
                match result {
                    Ok(()) => {
                        info!("job completed");
                        Ok(())
                    }
                    Err(err) => {
                        error!(error = %err, "job did not complete successfully");
                        Err(err)
                    }
                }
            }
        }
    }

    /// Verify the printer is reachable, ready, and (optionally) the device
    /// the caller thinks it is.
    pub async fn check_printer(
        &self,
        printer_uri: &str,
        config: &CheckConfig,
    ) -> Result<(), OperationError> {
        checker::check_printer(
            &self.transport,
            &self.report,
            self.cache.as_deref(),
            printer_uri,
            config,
        )
        .await
    }

    /// Cached attributes when fresh, otherwise probe the printer and write
    /// the answer back (best effort).
    async fn resolve_printer_attributes(
        &self,
        ctx: &PrintContext,
        uri: &Uri,
        printer_uri: &str,
        credentials: Option<&IppCredentials>,
        config: &PrintConfig,
    ) -> Result<PrinterAttributes, OperationError> {
        if let Some(cache) = &self.cache {
            match cache.get(printer_uri) {
                Ok(attributes) => {
                    self.report.log(
                        OP_PRINT_JOB,
                        1,
                        "ipp-printer-attribute-cache: Found",
                        Duration::ZERO,
                    );
                    debug!(printer_uri, "printer attributes served from cache");
                    return Ok(attributes);
                }
                Err(err) => {
                    self.report.log(
                        OP_PRINT_JOB,
                        1,
                        "ipp-printer-attribute-cache: Not Found",
                        Duration::ZERO,
                    );
                    debug!(printer_uri, error = %err, "attribute cache miss, reaching the printer");
                }
            }
        }

        let attributes = probe::wait_for_printer_ready(
            ctx,
            &self.transport,
            &self.report,
            uri,
            credentials,
            config,
        )
        .await
        .map_err(|err| {
            error!(printer_uri, error = %err, "wait for printer ready failed");
            err
        })?;

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.set(printer_uri, &attributes) {
                debug!(error = %err, "failed to cache printer attributes");
            }
        }

        Ok(attributes)
    }
}

/// Credentials travel only as a complete pair.
fn ticket_credentials(ticket: &JobTicket) -> Option<IppCredentials> {
    ticket
        .credentials
        .is_complete()
        .then(|| IppCredentials {
            username: ticket.credentials.username.clone(),
            password: ticket.credentials.password.clone(),
        })
}

/// Choose the document format to print with.
///
/// The spooled format wins when the printer lists it; otherwise the first
/// printer-supported format that appears among the ticket's alternates is
/// taken (printer preference order).  PDF passes through as a last resort
/// even when unlisted, since PDF printers commonly omit it.
pub fn map_document_format(ticket: &JobTicket, printer: &PrinterAttributes) -> Option<String> {
    let spooled = ticket.document_format.trim();

    for supported in &printer.document_format_supported {
        if spooled == supported.trim() {
            return Some(supported.clone());
        }
    }

    if !ticket.alt_document_formats.is_empty() {
        for supported in &printer.document_format_supported {
            for alternate in &ticket.alt_document_formats {
                if alternate.trim() == supported.trim() {
                    debug!(
                        alternate = %alternate,
                        spooled = %spooled,
                        "using alternate document format"
                    );
                    return Some(supported.clone());
                }
            }
        }
    }

    if spooled == "application/pdf" {
        return Some(spooled.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullProcessingLog;
    use crate::transport::testing::ScriptedTransport;
    use ipp::prelude::*;

    const PRINTER_URI: &str = "ipp://10.0.0.1/ipp/print";

    fn ticket() -> JobTicket {
        JobTicket {
            copies: 1,
            print_color_mode: "color".into(),
            sides: "one-sided".into(),
            document_format: "application/pdf".into(),
            paper_name: "A4".into(),
            paper_width_mm: 210,
            paper_height_mm: 297,
            ..JobTicket::default()
        }
    }

    fn config(spool_dir: &std::path::Path) -> PrintConfig {
        PrintConfig {
            spool_dir: spool_dir.to_path_buf(),
            ..PrintConfig::default()
        }
    }

    fn ready_printer_response(operations: &[i32], formats: &[&str]) -> IppRequestResponse {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        let attrs = response.attributes_mut();
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new("printer-is-accepting-jobs", IppValue::Boolean(true)),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new(
                "operations-supported",
                IppValue::Array(operations.iter().map(|op| IppValue::Enum(*op)).collect()),
            ),
        );
        attrs.add(
            DelimiterTag::PrinterAttributes,
            IppAttribute::new(
                "document-format-supported",
                IppValue::Array(
                    formats
                        .iter()
                        .map(|f| IppValue::MimeMediaType(f.to_string()))
                        .collect(),
                ),
            ),
        );
        response
    }

    fn job_response(job_id: i32, state: i32) -> IppRequestResponse {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        let attrs = response.attributes_mut();
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-id", IppValue::Integer(job_id)),
        );
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-state", IppValue::Enum(state)),
        );
        response
    }

    fn client(transport: &Arc<ScriptedTransport>) -> PrintClient {
        PrintClient::new(
            Arc::clone(transport) as Arc<dyn IppTransport>,
            Arc::new(NullProcessingLog),
            None,
        )
    }

    fn pdf_document() -> Box<dyn Read + Send> {
        Box::new(std::io::Cursor::new(b"%PDF-1.7 body".to_vec()))
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_two_phase() {
        let transport = Arc::new(ScriptedTransport::default());
        // Readiness probe; monitor printer-state polls fall back to default.
        transport.script(Operation::GetPrinterAttributes, || {
            Ok(ready_printer_response(
                &[0x0002, 0x0005, 0x0006],
                &["application/pdf"],
            ))
        });
        transport.script(Operation::CreateJob, || Ok(job_response(42, 3)));
        transport.script(Operation::SendDocument, || Ok(job_response(42, 5)));
        transport.script(Operation::GetJobAttributes, || Ok(job_response(42, 9)));

        let dir = tempfile::tempdir().unwrap();
        let result = client(&transport)
            .print_job(&ticket(), PRINTER_URI, pdf_document(), &config(dir.path()))
            .await;

        assert!(result.is_ok(), "print failed: {result:?}");
        assert_eq!(transport.calls(Operation::CreateJob), 1);
        assert_eq!(transport.calls(Operation::SendDocument), 1);
        assert_eq!(transport.calls(Operation::PrintJob), 0);
        // Spool file cleaned up with the run.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn printer_without_two_phase_uses_print_job() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::GetPrinterAttributes, || {
            Ok(ready_printer_response(&[0x0002], &["application/pdf"]))
        });
        transport.script(Operation::PrintJob, || Ok(job_response(7, 5)));
        transport.script(Operation::GetJobAttributes, || Ok(job_response(7, 9)));

        let dir = tempfile::tempdir().unwrap();
        let result = client(&transport)
            .print_job(&ticket(), PRINTER_URI, pdf_document(), &config(dir.path()))
            .await;

        assert!(result.is_ok(), "print failed: {result:?}");
        assert_eq!(transport.calls(Operation::PrintJob), 1);
        assert_eq!(transport.calls(Operation::CreateJob), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn forcing_print_job_skips_two_phase() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::GetPrinterAttributes, || {
            Ok(ready_printer_response(
                &[0x0002, 0x0005, 0x0006],
                &["application/pdf"],
            ))
        });
        transport.script(Operation::PrintJob, || Ok(job_response(8, 5)));
        transport.script(Operation::GetJobAttributes, || Ok(job_response(8, 9)));

        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.force_print_job = true;

        let result = client(&transport)
            .print_job(&ticket(), PRINTER_URI, pdf_document(), &cfg)
            .await;

        assert!(result.is_ok(), "print failed: {result:?}");
        assert_eq!(transport.calls(Operation::PrintJob), 1);
        assert_eq!(transport.calls(Operation::CreateJob), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn format_mismatch_fails_before_any_submission() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::GetPrinterAttributes, || {
            Ok(ready_printer_response(
                &[0x0002, 0x0005, 0x0006],
                &["application/postscript"],
            ))
        });

        let mut mismatched = ticket();
        mismatched.document_format = "application/vnd.hp-PCLXL".into();
        mismatched.alt_document_formats = vec!["application/pcl6".into()];

        let dir = tempfile::tempdir().unwrap();
        let err = client(&transport)
            .print_job(&mismatched, PRINTER_URI, pdf_document(), &config(dir.path()))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::DocFormatMismatch);
        assert_eq!(transport.calls(Operation::CreateJob), 0);
        assert_eq!(transport.calls(Operation::SendDocument), 0);
        assert_eq!(transport.calls(Operation::PrintJob), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn uploader_failure_cancels_the_run() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::GetPrinterAttributes, || {
            Ok(ready_printer_response(
                &[0x0002, 0x0005, 0x0006],
                &["application/pdf"],
            ))
        });
        transport.script(Operation::CreateJob, || {
            Ok(IppRequestResponse::new_response(
                IppVersion::v1_1(),
                StatusCode::ClientErrorNotPossible,
                1,
            ))
        });
        // The monitor never sees a job; keep it polling forever.
        transport.script_forever(Operation::GetJobAttributes, || {
            Ok(IppRequestResponse::new_response(
                IppVersion::v1_1(),
                StatusCode::SuccessfulOk,
                1,
            ))
        });

        let dir = tempfile::tempdir().unwrap();
        let err = client(&transport)
            .print_job(&ticket(), PRINTER_URI, pdf_document(), &config(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobCreation);
    }

    #[tokio::test(start_paused = true)]
    async fn cached_attributes_skip_the_probe() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || Ok(job_response(5, 3)));
        transport.script(Operation::SendDocument, || Ok(job_response(5, 5)));
        transport.script(Operation::GetJobAttributes, || Ok(job_response(5, 9)));

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            PrinterAttributeCache::new(Duration::from_secs(60), cache_dir.path()).unwrap(),
        );
        cache
            .set(
                PRINTER_URI,
                &PrinterAttributes {
                    printer_is_accepting_jobs: true,
                    operations_supported: vec![0x0002, 0x0005, 0x0006],
                    document_format_supported: vec!["application/pdf".into()],
                    ..PrinterAttributes::default()
                },
            )
            .unwrap();

        let client = PrintClient::new(
            Arc::clone(&transport) as Arc<dyn IppTransport>,
            Arc::new(NullProcessingLog),
            Some(cache),
        );

        let dir = tempfile::tempdir().unwrap();
        let result = client
            .print_job(&ticket(), PRINTER_URI, pdf_document(), &config(dir.path()))
            .await;
        assert!(result.is_ok(), "print failed: {result:?}");
        assert_eq!(transport.calls(Operation::CreateJob), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_printer_uri_is_rejected() {
        let transport = Arc::new(ScriptedTransport::default());
        let dir = tempfile::tempdir().unwrap();
        let err = client(&transport)
            .print_job(&ticket(), "", pdf_document(), &config(dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PrintDefault);
    }

    // -- document format mapping ------------------------------------------

    fn printer_with_formats(formats: &[&str]) -> PrinterAttributes {
        PrinterAttributes {
            document_format_supported: formats.iter().map(|f| f.to_string()).collect(),
            ..PrinterAttributes::default()
        }
    }

    #[test]
    fn alternate_format_mapped_in_printer_preference_order() {
        let mut t = ticket();
        t.document_format = "application/vnd.hp-PCLXL".into();
        t.alt_document_formats = vec![
            "application/pcl6".into(),
            "application/pcl".into(),
            "application/vnd.hp-PCL".into(),
            "application/octet-stream".into(),
        ];
        let printer = printer_with_formats(&[
            "application/pcl6",
            "application/octet-stream",
            "application/postscript",
        ]);
        assert_eq!(
            map_document_format(&t, &printer),
            Some("application/pcl6".to_string())
        );
    }

    #[test]
    fn spooled_pdf_wins_over_alternates() {
        let mut t = ticket();
        t.document_format = "application/pdf".into();
        t.alt_document_formats = vec!["application/alt-doc-fmt".into()];
        let printer = printer_with_formats(&["application/octet-stream", "application/pdf"]);
        assert_eq!(
            map_document_format(&t, &printer),
            Some("application/pdf".to_string())
        );
    }

    #[test]
    fn octet_stream_alternate_is_used_when_spooled_unsupported() {
        let mut t = ticket();
        t.document_format = "application/postscript".into();
        t.alt_document_formats = vec!["application/octet-stream".into()];
        let printer = printer_with_formats(&["application/octet-stream", "image/urf"]);
        assert_eq!(
            map_document_format(&t, &printer),
            Some("application/octet-stream".to_string())
        );
    }

    #[test]
    fn spooled_format_beats_alternates_when_supported() {
        let mut t = ticket();
        t.document_format = "application/vnd.hp-PCL".into();
        t.alt_document_formats = vec!["application/octet-stream".into()];
        let printer = printer_with_formats(&[
            "application/vnd.hp-PCL",
            "application/octet-stream",
            "application/pcl",
        ]);
        assert_eq!(
            map_document_format(&t, &printer),
            Some("application/vnd.hp-PCL".to_string())
        );
    }

    #[test]
    fn pdf_passes_through_when_nothing_matches() {
        let mut t = ticket();
        t.document_format = "application/pdf".into();
        t.alt_document_formats = vec![];
        let printer = printer_with_formats(&["image/urf"]);
        assert_eq!(
            map_document_format(&t, &printer),
            Some("application/pdf".to_string())
        );
    }

    #[test]
    fn unmappable_format_yields_none() {
        let mut t = ticket();
        t.document_format = "application/vnd.hp-PCLXL".into();
        t.alt_document_formats = vec!["application/pcl6".into()];
        let printer = printer_with_formats(&["application/postscript"]);
        assert_eq!(map_document_format(&t, &printer), None);
    }
}
