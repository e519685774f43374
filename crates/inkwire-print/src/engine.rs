// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The IPP operation engine: Create-Job, Send-Document, Print-Job and
// Cancel-Job, each wrapped in the shared retry loop.
//
// Retry shape, common to all three submit operations: re-entry rewinds the
// document where one is involved, sleeps a jittered backoff (skipped on the
// iteration right after a credential escalation), bumps and bounds the
// attempt counter, then classifies the outcome.  HTTP 401 escalates to the
// default credential pair once; temporary transport failures and
// recoverable IPP statuses retry; anything else fails with the operation's
// error kind, cancelling a created job best-effort on the way out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ipp::prelude::*;
use rand::Rng;
use tracing::{debug, error, warn};

use inkwire_core::{ErrorKind, JobTemplate, OperationError, PrintConfig};

use crate::attrs;
use crate::context::PrintContext;
use crate::document::RewindableDocument;
use crate::monitor::MonitorHandle;
use crate::report::{
    ProcessingLog, OP_CANCEL_JOB, OP_CREATE_JOB, OP_PRINT_JOB, OP_SEND_DOCUMENT,
};
use crate::requests;
use crate::transport::{
    default_credentials, recoverable_status, IppCredentials, IppTransport, TransportError,
};

// Exactly one document per job, so every Send-Document is the last.
const LAST_DOCUMENT: bool = true;

/// A job created on the printer.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub job_id: i32,
    pub job_uri: String,
    pub job_state: i32,
}

/// Engine for one print run.  Owned by the uploader task; shares only the
/// transport and the monitor handle with the rest of the system.
pub struct IppEngine {
    transport: Arc<dyn IppTransport>,
    report: Arc<dyn ProcessingLog>,
    monitor: MonitorHandle,
    credentials: Option<IppCredentials>,
    max_send_attempts: u32,
    max_create_job_attempts: u32,
    max_unauthorised_attempts: u32,
    retry_backoff: Duration,
}

impl IppEngine {
    pub fn new(
        transport: Arc<dyn IppTransport>,
        report: Arc<dyn ProcessingLog>,
        monitor: MonitorHandle,
        credentials: Option<IppCredentials>,
        config: &PrintConfig,
    ) -> Self {
        Self {
            transport,
            report,
            monitor,
            credentials,
            max_send_attempts: config.max_send_attempts,
            max_create_job_attempts: config.max_create_job_attempts,
            max_unauthorised_attempts: config.max_unauthorised_attempts,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Two-phase submission: Create-Job, publish the job-id to the monitor,
    /// then Send-Document.
    pub async fn create_and_send(
        &mut self,
        ctx: &PrintContext,
        uri: &Uri,
        template: &JobTemplate,
        document: &RewindableDocument,
        document_format: &str,
    ) -> Result<JobHandle, OperationError> {
        let handle = self.create_job(ctx, uri, template).await?;
        self.monitor.set_job_id(handle.job_id);
        self.send_document(ctx, uri, &handle, document, document_format)
            .await?;
        Ok(handle)
    }

    /// Create-Job with retry.  The returned job-id must sit in
    /// `1..=i32::MAX`; anything else is retried up to the create-job cap.
    pub async fn create_job(
        &mut self,
        ctx: &PrintContext,
        uri: &Uri,
        template: &JobTemplate,
    ) -> Result<JobHandle, OperationError> {
        let mut attempts: u32 = 0;
        let mut skip_backoff = false;

        loop {
            if ctx.is_cancelled() {
                self.report.log(
                    OP_CREATE_JOB,
                    attempts,
                    "failed: context cancelled",
                    Duration::ZERO,
                );
                return Err(ctx.operation_error("create-job"));
            }

            if attempts > 0 && !skip_backoff {
                self.backoff(ctx, OP_CREATE_JOB).await?;
            } else {
                skip_backoff = false;
            }

            attempts += 1;

            let started = Instant::now();
            let result = self
                .transport
                .send(uri, requests::create_job(uri, template), self.credentials.as_ref())
                .await;
            let duration = started.elapsed();

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "failed to create the job");

                    if err.http_status() == Some(401) {
                        if self.credentials.is_none() {
                            let note = "retry with default ipp credentials";
                            self.report.log(OP_CREATE_JOB, attempts, note, duration);
                            self.credentials = Some(default_credentials());
                            skip_backoff = true;
                            continue;
                        }
                        // CUPS retries a fixed number of times on HTTP 401,
                        // most likely to get around printer quirks; mimic it.
                        if attempts <= self.max_unauthorised_attempts {
                            let note = format!(
                                "Create-Job received HTTP 401; trying again - attempt {attempts}/{}",
                                self.max_unauthorised_attempts
                            );
                            self.report.log(OP_CREATE_JOB, attempts, &note, duration);
                            continue;
                        }
                        self.report
                            .log(OP_CREATE_JOB, attempts, &err.to_string(), duration);
                        return Err(OperationError::new(
                            ErrorKind::JobCreation,
                            format!("ipp Create-Job failed: {err}"),
                        ));
                    }

                    if let Some(status) = err.http_status() {
                        let note = format!("failed to create job, err: http status code {status}");
                        self.report.log(OP_CREATE_JOB, attempts, &note, duration);
                    }

                    if err.is_temporary() {
                        let note = format!("encountered temporary network error: {err}");
                        self.report.log(OP_CREATE_JOB, attempts, &note, duration);
                        continue;
                    }

                    self.report
                        .log(OP_CREATE_JOB, attempts, &err.to_string(), duration);
                    return Err(OperationError::new(
                        ErrorKind::JobCreation,
                        format!("Create-Job failed with unrecoverable error: {err}"),
                    ));
                }
            };

            let status = response.header().status_code();
            if !status.is_success() {
                let note = format!("create job request failed with status {status:?}");
                self.report.log(OP_CREATE_JOB, attempts, &note, duration);

                if recoverable_status(status) {
                    debug!(?status, "received recoverable IPP status");
                    continue;
                }
                return Err(OperationError::new(ErrorKind::JobCreation, note));
            }

            let job = attrs::job_status_from_ipp(response.attributes()).unwrap_or_default();

            // job-id must be within integer(1:MAX), MAX = 2^31 - 1
            // (RFC 8011 section 5.3).  The codec's i32 covers the upper
            // bound; zero and negatives are retried.
            if job.job_id < 1 {
                if attempts < self.max_create_job_attempts {
                    warn!(job_id = job.job_id, "failed to validate job-id; retrying");
                    continue;
                }
                warn!(job_id = job.job_id, "failed to validate job-id; retries exhausted");
                return Err(OperationError::new(
                    ErrorKind::JobCreation,
                    format!("failed to create job: invalid job-id {}", job.job_id),
                ));
            }

            let note = format!(
                "create-job response status code: {status:?}, jobId: {}",
                job.job_id
            );
            self.report.log(OP_CREATE_JOB, attempts, &note, duration);

            return Ok(JobHandle {
                job_id: job.job_id,
                job_uri: job.job_uri,
                job_state: job.state,
            });
        }
    }

    /// Send-Document with retry.  Unrecoverable failures cancel the created
    /// job best-effort before surfacing.
    pub async fn send_document(
        &mut self,
        ctx: &PrintContext,
        uri: &Uri,
        job: &JobHandle,
        document: &RewindableDocument,
        document_format: &str,
    ) -> Result<(), OperationError> {
        let mut attempts: u32 = 0;
        let mut skip_backoff = false;

        loop {
            if ctx.is_cancelled() {
                return Err(ctx.operation_error("send-document"));
            }

            if attempts > 0 {
                document.reset().map_err(|err| {
                    OperationError::new(
                        ErrorKind::JobSendDocument,
                        format!("failed to read document: {err}"),
                    )
                })?;
                if !skip_backoff {
                    self.backoff(ctx, OP_SEND_DOCUMENT).await?;
                } else {
                    skip_backoff = false;
                }
            }

            attempts += 1;

            if attempts > self.max_send_attempts {
                let note = format!(
                    "failed to send document, err: max operation retry attempts {} exceeded",
                    self.max_send_attempts
                );
                self.report
                    .log(OP_SEND_DOCUMENT, attempts, &note, Duration::ZERO);
                self.cancel_job(uri, job.job_id).await;
                return Err(OperationError::new(ErrorKind::JobSendDocument, note));
            }

            let started = Instant::now();
            let payload = IppPayload::new(document.current_reader());
            let request = requests::send_document(
                uri,
                job.job_id,
                payload,
                document_format,
                LAST_DOCUMENT,
            );
            let result = self
                .transport
                .send(uri, request, self.credentials.as_ref())
                .await;
            let duration = started.elapsed();
            debug!(elapsed = ?duration, "send-document responded");

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    error!(job_id = job.job_id, error = %err, "failed to send document");

                    if err.http_status() == Some(401) {
                        if self.credentials.is_none() {
                            let note = "retry with default ipp credentials";
                            self.report.log(OP_SEND_DOCUMENT, attempts, note, duration);
                            self.credentials = Some(default_credentials());
                            skip_backoff = true;
                            continue;
                        }
                        if attempts <= self.max_unauthorised_attempts {
                            let note = format!(
                                "Send-Document received HTTP 401; trying again - attempt {attempts}/{}",
                                self.max_unauthorised_attempts
                            );
                            self.report.log(OP_SEND_DOCUMENT, attempts, &note, duration);
                            continue;
                        }
                        self.cancel_job(uri, job.job_id).await;
                        self.report
                            .log(OP_SEND_DOCUMENT, attempts, &err.to_string(), duration);
                        return Err(OperationError::new(
                            ErrorKind::JobSendDocument,
                            format!("failed to send document: {err}"),
                        ));
                    }

                    if let Some(status) = err.http_status() {
                        let note =
                            format!("failed to send document, http status code {status}, err: {err}");
                        self.report.log(OP_SEND_DOCUMENT, attempts, &note, duration);
                    }

                    if err.is_temporary() {
                        let note = format!("encountered temporary network error: {err}");
                        self.report.log(OP_SEND_DOCUMENT, attempts, &note, duration);
                        continue;
                    }

                    self.report
                        .log(OP_SEND_DOCUMENT, attempts, &err.to_string(), duration);
                    self.cancel_job(uri, job.job_id).await;
                    return Err(OperationError::new(
                        ErrorKind::JobSendDocument,
                        format!("ipp Send-Document failed: {err}"),
                    ));
                }
            };

            let status = response.header().status_code();
            if !status.is_success() {
                let note = format!("Send-Document operation failed with status {status:?}");
                self.report.log(OP_SEND_DOCUMENT, attempts, &note, duration);

                if recoverable_status(status) {
                    debug!(?status, "received recoverable status");
                    continue;
                }
                self.cancel_job(uri, job.job_id).await;
                return Err(OperationError::new(ErrorKind::JobSendDocument, note));
            }

            let note = format!("send-document response status code: {status:?}");
            self.report.log(OP_SEND_DOCUMENT, attempts, &note, duration);
            return Ok(());
        }
    }

    /// One-phase Print-Job with retry.
    ///
    /// One counter serves both the overall attempt cap and the unauthorised
    /// cap, matching the long-standing field behaviour.  No Cancel-Job on
    /// failure: nothing exists on the printer until the request succeeds.
    pub async fn print_job(
        &mut self,
        ctx: &PrintContext,
        uri: &Uri,
        template: &JobTemplate,
        document: &RewindableDocument,
        document_format: &str,
    ) -> Result<JobHandle, OperationError> {
        let mut attempts: u32 = 0;
        let mut skip_backoff = false;

        loop {
            if ctx.is_cancelled() {
                return Err(ctx.operation_error("print-job"));
            }

            if attempts > 0 {
                document.reset().map_err(|err| {
                    OperationError::new(
                        ErrorKind::PrintDefault,
                        format!("failed to read document: {err}"),
                    )
                })?;
                if !skip_backoff {
                    self.backoff(ctx, OP_PRINT_JOB).await?;
                } else {
                    skip_backoff = false;
                }
            }

            attempts += 1;

            if attempts > self.max_send_attempts {
                return Err(OperationError::new(
                    ErrorKind::IppPrintJob,
                    format!(
                        "ipp Print-Job failed, err: max operation retry attempts {} exceeded",
                        self.max_send_attempts
                    ),
                ));
            }

            let started = Instant::now();
            let payload = IppPayload::new(document.current_reader());
            let request = requests::print_job(uri, template, payload, document_format);
            let result = self
                .transport
                .send(uri, request, self.credentials.as_ref())
                .await;
            let duration = started.elapsed();
            debug!(elapsed = ?duration, "print-job responded");

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    error!(error = %err, "failed to print job");

                    if err.http_status() == Some(401) {
                        if self.credentials.is_none() {
                            let note = "retry with default ipp credentials";
                            self.report.log(OP_PRINT_JOB, attempts, note, duration);
                            self.credentials = Some(default_credentials());
                            skip_backoff = true;
                            continue;
                        }
                        if attempts <= self.max_unauthorised_attempts {
                            let note = format!(
                                "Print-Job: received HTTP 401; trying again - attempt {attempts}/{}",
                                self.max_unauthorised_attempts
                            );
                            self.report.log(OP_PRINT_JOB, attempts, &note, duration);
                            continue;
                        }
                        return Err(OperationError::new(
                            ErrorKind::IppPrintJob,
                            format!("ipp Print-Job failed: {err}"),
                        ));
                    }

                    if let Some(status) = err.http_status() {
                        let note = format!("failed to print job, http status code {status}, err: {err}");
                        self.report.log(OP_PRINT_JOB, attempts, &note, duration);
                    }

                    if err.is_temporary() {
                        let note = format!("encountered temporary network error: {err}");
                        self.report.log(OP_PRINT_JOB, attempts, &note, duration);
                        continue;
                    }

                    self.report
                        .log(OP_PRINT_JOB, attempts, &err.to_string(), duration);
                    return Err(OperationError::new(
                        ErrorKind::IppPrintJob,
                        format!("ipp Print-Job failed: {err}"),
                    ));
                }
            };

            let status = response.header().status_code();
            if !status.is_success() {
                let note = format!("Print-Job operation failed with status {status:?}");
                self.report.log(OP_PRINT_JOB, attempts, &note, duration);

                if recoverable_status(status) {
                    continue;
                }
                return Err(OperationError::new(ErrorKind::IppPrintJob, note));
            }

            let job = attrs::job_status_from_ipp(response.attributes()).unwrap_or_default();
            if job.job_id >= 1 {
                self.monitor.set_job_id(job.job_id);
            }

            let note = format!(
                "print-job response status code: {status:?}, jobId: {}",
                job.job_id
            );
            self.report.log(OP_PRINT_JOB, attempts, &note, duration);

            return Ok(JobHandle {
                job_id: job.job_id,
                job_uri: job.job_uri,
                job_state: job.state,
            });
        }
    }

    /// Best-effort Cancel-Job.  The monitor's job-id is cleared first so it
    /// stops reporting on a job we are abandoning; failures are logged and
    /// swallowed.
    pub async fn cancel_job(&self, uri: &Uri, job_id: i32) {
        debug!(job_id, "attempting to cancel job");
        let started = Instant::now();

        self.monitor.clear_job_id();

        let result = self
            .transport
            .send(uri, requests::cancel_job(uri, job_id), self.credentials.as_ref())
            .await;
        let duration = started.elapsed();

        match result {
            Err(err) => debug!(job_id, error = %err, "failed to cancel job"),
            Ok(response) => {
                let status = response.header().status_code();
                if !status.is_success() {
                    debug!(job_id, ?status, "failed to cancel job");
                    return;
                }
                let note = format!("response status code - {status:?}");
                self.report.log(OP_CANCEL_JOB, 1, &note, duration);
                debug!(job_id, "job cancelled");
            }
        }
    }

    /// Jittered backoff: base plus a uniform draw below base again.
    /// Cancellation interrupts the sleep.
    async fn backoff(&self, ctx: &PrintContext, operation: &str) -> Result<(), OperationError> {
        let base = self.retry_backoff.as_secs().max(1);
        let jitter = rand::thread_rng().gen_range(0..base);
        let delay = Duration::from_secs(base + jitter);
        debug!(operation, delay = ?delay, "backing off before retry");

        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.operation_error(operation)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullProcessingLog;
    use crate::transport::testing::ScriptedTransport;
    use inkwire_core::template::MediaSelection;

    fn template() -> JobTemplate {
        JobTemplate {
            copies: 1,
            color_mode: "color".into(),
            sides: "one-sided".into(),
            finishings: Vec::new(),
            media: MediaSelection::Keyword("iso_a4_210x297mm".into()),
            orientation: None,
        }
    }

    fn uri() -> Uri {
        "ipp://10.0.0.1/ipp/print".parse().unwrap()
    }

    fn engine(transport: Arc<ScriptedTransport>, credentials: Option<IppCredentials>) -> IppEngine {
        IppEngine::new(
            transport,
            Arc::new(NullProcessingLog),
            MonitorHandle::disconnected(),
            credentials,
            &PrintConfig::default(),
        )
    }

    fn document() -> (tempfile::TempDir, RewindableDocument) {
        let dir = tempfile::tempdir().unwrap();
        let doc = RewindableDocument::new(
            Box::new(std::io::Cursor::new(b"%PDF-1.7 test".to_vec())),
            dir.path(),
        )
        .unwrap();
        (dir, doc)
    }

    fn create_job_response(job_id: i32) -> IppRequestResponse {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1);
        let attrs = response.attributes_mut();
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-id", IppValue::Integer(job_id)),
        );
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new(
                "job-uri",
                IppValue::Uri(format!("ipp://10.0.0.1/jobs/{job_id}")),
            ),
        );
        attrs.add(
            DelimiterTag::JobAttributes,
            IppAttribute::new("job-state", IppValue::Enum(3)),
        );
        response
    }

    fn ok_response() -> IppRequestResponse {
        IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, 1)
    }

    fn error_response(status: StatusCode) -> IppRequestResponse {
        IppRequestResponse::new_response(IppVersion::v1_1(), status, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_returns_the_handle() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || Ok(create_job_response(42)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let handle = engine.create_job(&ctx, &uri(), &template()).await.unwrap();
        assert_eq!(handle.job_id, 42);
        assert_eq!(handle.job_uri, "ipp://10.0.0.1/jobs/42");
        assert_eq!(transport.calls(Operation::CreateJob), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_retries_invalid_job_ids_up_to_the_cap() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_forever(Operation::CreateJob, || Ok(create_job_response(0)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let err = engine
            .create_job(&ctx, &uri(), &template())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobCreation);
        assert!(err.message.contains("invalid job-id"));
        // Default create-job cap is three attempts.
        assert_eq!(transport.calls(Operation::CreateJob), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_escalates_credentials_on_401() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || Err(TransportError::HttpStatus(401)));
        transport.script(Operation::CreateJob, || Ok(create_job_response(7)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let before = tokio::time::Instant::now();
        let handle = engine.create_job(&ctx, &uri(), &template()).await.unwrap();
        assert_eq!(handle.job_id, 7);

        // The escalation retry must fire without any backoff sleep.
        assert_eq!(tokio::time::Instant::now(), before);
        let creds = transport.last_credentials(Operation::CreateJob).unwrap();
        assert_eq!(creds.username, "papercut-ipp-client");
        assert_eq!(creds.password, "papercut");
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_gives_up_after_unauthorised_cap() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_forever(Operation::CreateJob, || {
            Err(TransportError::HttpStatus(401))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(
            Arc::clone(&transport),
            Some(IppCredentials {
                username: "user".into(),
                password: "wrong".into(),
            }),
        );

        let err = engine
            .create_job(&ctx, &uri(), &template())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobCreation);
        // Attempts 1..=4 tolerated, the fifth fails out.
        assert_eq!(transport.calls(Operation::CreateJob), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_retries_temporary_errors_with_backoff() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )))
        });
        transport.script(Operation::CreateJob, || Ok(create_job_response(9)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let before = tokio::time::Instant::now();
        let handle = engine.create_job(&ctx, &uri(), &template()).await.unwrap();
        assert_eq!(handle.job_id, 9);

        // Backoff is base + jitter in [0, base), so 5..10 seconds.
        let slept = tokio::time::Instant::now() - before;
        assert!(slept >= Duration::from_secs(5));
        assert!(slept < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_fails_fast_on_client_error_status() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || {
            Ok(error_response(StatusCode::ClientErrorNotPossible))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let err = engine
            .create_job(&ctx, &uri(), &template())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobCreation);
        assert_eq!(transport.calls(Operation::CreateJob), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_job_retries_server_error_status() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CreateJob, || {
            Ok(error_response(StatusCode::ServerErrorBusy))
        });
        transport.script(Operation::CreateJob, || Ok(create_job_response(3)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);

        let handle = engine.create_job(&ctx, &uri(), &template()).await.unwrap();
        assert_eq!(handle.job_id, 3);
        assert_eq!(transport.calls(Operation::CreateJob), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn send_document_cancels_job_on_unrecoverable_status() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::SendDocument, || {
            Ok(error_response(StatusCode::ClientErrorDocumentFormatNotSupported))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);
        let (_dir, doc) = document();
        let job = JobHandle {
            job_id: 42,
            job_uri: "ipp://10.0.0.1/jobs/42".into(),
            job_state: 3,
        };

        let err = engine
            .send_document(&ctx, &uri(), &job, &doc, "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobSendDocument);
        assert_eq!(transport.calls(Operation::CancelJob), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_document_replays_the_document_after_a_temporary_failure() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::SendDocument, || {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "aborted",
            )))
        });
        transport.script(Operation::SendDocument, || Ok(ok_response()));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);
        let (_dir, doc) = document();
        let job = JobHandle {
            job_id: 42,
            job_uri: "ipp://10.0.0.1/jobs/42".into(),
            job_state: 3,
        };

        engine
            .send_document(&ctx, &uri(), &job, &doc, "application/pdf")
            .await
            .unwrap();
        assert_eq!(transport.calls(Operation::SendDocument), 2);
        // No cancel for a temporary blip.
        assert_eq!(transport.calls(Operation::CancelJob), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn send_document_exhausts_attempts_and_cancels() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_forever(Operation::SendDocument, || {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);
        let (_dir, doc) = document();
        let job = JobHandle {
            job_id: 42,
            job_uri: "ipp://10.0.0.1/jobs/42".into(),
            job_state: 3,
        };

        let err = engine
            .send_document(&ctx, &uri(), &job, &doc, "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::JobSendDocument);
        assert!(err.message.contains("max operation retry attempts"));
        assert_eq!(transport.calls(Operation::SendDocument), 5);
        assert_eq!(transport.calls(Operation::CancelJob), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn print_job_escalates_credentials_without_backoff() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::PrintJob, || Err(TransportError::HttpStatus(401)));
        transport.script(Operation::PrintJob, || Ok(create_job_response(11)));

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);
        let (_dir, doc) = document();

        let before = tokio::time::Instant::now();
        let handle = engine
            .print_job(&ctx, &uri(), &template(), &doc, "application/pdf")
            .await
            .unwrap();
        assert_eq!(handle.job_id, 11);
        assert_eq!(tokio::time::Instant::now(), before);

        let creds = transport.last_credentials(Operation::PrintJob).unwrap();
        assert_eq!(creds.username, "papercut-ipp-client");
    }

    #[tokio::test(start_paused = true)]
    async fn print_job_shares_one_counter_between_caps() {
        // With credentials already present, repeated 401s burn the shared
        // attempt counter: four tolerated, the fifth fails out.
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_forever(Operation::PrintJob, || {
            Err(TransportError::HttpStatus(401))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(
            Arc::clone(&transport),
            Some(IppCredentials {
                username: "user".into(),
                password: "wrong".into(),
            }),
        );
        let (_dir, doc) = document();

        let err = engine
            .print_job(&ctx, &uri(), &template(), &doc, "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IppPrintJob);
        assert_eq!(transport.calls(Operation::PrintJob), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn print_job_attempt_cap_counts_every_iteration() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script_forever(Operation::PrintJob, || {
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let mut engine = engine(Arc::clone(&transport), None);
        let (_dir, doc) = document();

        let err = engine
            .print_job(&ctx, &uri(), &template(), &doc, "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IppPrintJob);
        assert!(err.message.contains("max operation retry attempts 5 exceeded"));
        assert_eq!(transport.calls(Operation::PrintJob), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_job_swallows_failures() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(Operation::CancelJob, || {
            Err(TransportError::HttpStatus(500))
        });

        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        let _ = ctx;
        let engine = engine(Arc::clone(&transport), None);
        engine.cancel_job(&uri(), 42).await;
        assert_eq!(transport.calls(Operation::CancelJob), 1);
    }
}
