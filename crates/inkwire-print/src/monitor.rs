// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job monitor: polls the printer on a fibonacci-growing interval until the
// submitted job reaches a terminal state.
//
// A single background task owns all monitor state.  The uploader publishes
// the job-id through a command channel (applied between ticks, so a tick
// never sees a half-updated id), and callers observe the outcome through
// `wait()`.  Before a job-id arrives, ticks only log printer state; the
// delay sequence keeps growing regardless.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ipp::prelude::Uri;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use inkwire_core::{ErrorKind, OperationError};

use crate::attrs::{
    self, JobStatusInfo, JOB_STATUS_ATTRIBUTES, PRINTER_STATE_ATTRIBUTES,
};
use crate::context::PrintContext;
use crate::report::{ProcessingLog, OP_GET_JOB_ATTRIBUTES};
use crate::requests;
use crate::transport::{default_credentials, IppCredentials, IppTransport};

// IPP job-state values (RFC 8011 section 5.3.7).
const JOB_STATE_CANCELED: i32 = 7;
const JOB_STATE_ABORTED: i32 = 8;
const JOB_STATE_COMPLETED: i32 = 9;

/// Delay between monitor ticks: 1, 1, 2, 3, 5 seconds, then pinned at the
/// cap.  Once the cap is reached the internal pair stops advancing, so the
/// observable sequence never overshoots.
#[derive(Debug)]
pub struct FibonacciDelay {
    last: Vec<Duration>,
    max: Duration,
}

impl FibonacciDelay {
    pub fn new(max: Duration) -> Self {
        Self {
            last: Vec::with_capacity(2),
            max,
        }
    }

    pub fn next(&mut self) -> Duration {
        if self.last.len() < 2 {
            self.last.push(Duration::from_secs(1));
            return Duration::from_secs(1);
        }
        let sum = self.last[0] + self.last[1];
        if sum > self.max {
            return self.max;
        }
        self.last[0] = self.last[1];
        self.last[1] = sum;
        sum
    }
}

enum MonitorCommand {
    SetJobId(i32),
    ClearJobId,
}

/// Cheap handle for publishing the job-id into the monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<MonitorCommand>,
}

impl MonitorHandle {
    pub fn set_job_id(&self, job_id: i32) {
        let _ = self.commands.send(MonitorCommand::SetJobId(job_id));
    }

    /// Pause job polling until a new job-id is published.  Used before a
    /// best-effort Cancel-Job so the monitor never reports on a job the
    /// engine is abandoning.
    pub fn clear_job_id(&self) {
        let _ = self.commands.send(MonitorCommand::ClearJobId);
    }
}

#[cfg(test)]
impl MonitorHandle {
    /// A handle wired to nothing, for engine tests.
    pub(crate) fn disconnected() -> Self {
        let (commands, _rx) = mpsc::unbounded_channel();
        Self { commands }
    }
}

struct Shared {
    finalised: CancellationToken,
    terminated: CancellationToken,
    errors: Mutex<Vec<OperationError>>,
    ctx: PrintContext,
}

/// The monitor for one print job.
pub struct JobMonitor {
    handle: MonitorHandle,
    shared: Arc<Shared>,
}

impl JobMonitor {
    /// Spawn the monitor task.  It runs until the job finalises and the
    /// waiter acknowledges, or until the context is cancelled.
    pub fn start(
        ctx: PrintContext,
        transport: Arc<dyn IppTransport>,
        report: Arc<dyn ProcessingLog>,
        printer_uri: Uri,
        credentials: Option<IppCredentials>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            finalised: CancellationToken::new(),
            terminated: CancellationToken::new(),
            errors: Mutex::new(Vec::new()),
            ctx,
        });

        let task = MonitorTask {
            transport,
            report,
            printer_uri,
            credentials,
            job_id: 0,
            attempt: 0,
            delay: FibonacciDelay::new(Duration::from_secs(5)),
            commands: rx,
            shared: Arc::clone(&shared),
        };
        tokio::spawn(task.run());

        Self {
            handle: MonitorHandle { commands },
            shared,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Block until the job finalises, the monitor is torn down, or the
    /// context fires.
    pub async fn wait(&self) -> Result<(), OperationError> {
        tokio::select! {
            _ = self.shared.finalised.cancelled() => {
                self.shared.terminated.cancel();
                let errors = std::mem::take(
                    &mut *self.shared.errors.lock().expect("monitor error list poisoned"),
                );
                match OperationError::join(errors) {
                    None => Ok(()),
                    Some(err) => Err(err),
                }
            }
            _ = self.shared.terminated.cancelled() => Err(OperationError::new(
                ErrorKind::MonitorTerminatedBeforeJobFinalised,
                "monitor terminated before job finalised",
            )),
            _ = self.shared.ctx.cancelled() => {
                Err(self.shared.ctx.operation_error("job monitor aborted"))
            }
        }
    }
}

struct MonitorTask {
    transport: Arc<dyn IppTransport>,
    report: Arc<dyn ProcessingLog>,
    printer_uri: Uri,
    credentials: Option<IppCredentials>,
    job_id: i32,
    attempt: u32,
    delay: FibonacciDelay,
    commands: mpsc::UnboundedReceiver<MonitorCommand>,
    shared: Arc<Shared>,
}

impl MonitorTask {
    async fn run(mut self) {
        loop {
            let delay = self.delay.next();
            tokio::select! {
                _ = self.shared.ctx.cancelled() => return,
                _ = self.shared.terminated.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            // Apply pending job-id updates before the tick observes them.
            while let Ok(command) = self.commands.try_recv() {
                match command {
                    MonitorCommand::SetJobId(id) => self.job_id = id,
                    MonitorCommand::ClearJobId => self.job_id = 0,
                }
            }

            self.tick().await;
        }
    }

    async fn tick(&mut self) {
        if self.shared.finalised.is_cancelled() {
            return;
        }

        self.log_printer_state().await;

        if self.job_id != 0 {
            self.check_job_status().await;
        }
    }

    /// Best-effort printer state poll, purely for the diagnostic log.
    async fn log_printer_state(&self) {
        let request =
            requests::get_printer_attributes(&self.printer_uri, PRINTER_STATE_ATTRIBUTES);
        match self
            .transport
            .send(&self.printer_uri, request, self.credentials.as_ref())
            .await
        {
            Ok(response) => {
                let attrs = attrs::printer_attributes_from_ipp(response.attributes());
                debug!(
                    state = attrs.printer_state,
                    reasons = ?attrs.printer_state_reasons,
                    "printer state"
                );
            }
            Err(err) => debug!(error = %err, "failed to poll printer state"),
        }
    }

    async fn check_job_status(&mut self) {
        self.attempt += 1;
        let started = std::time::Instant::now();
        let request =
            requests::get_job_attributes(&self.printer_uri, self.job_id, JOB_STATUS_ATTRIBUTES);
        let result = self
            .transport
            .send(&self.printer_uri, request, self.credentials.as_ref())
            .await;
        let duration = started.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(err) if err.http_status() == Some(404) => {
                // The printer already dropped the job from its queue; like
                // queue printing, absence means printed.
                let note = "GetJobAttributes returned http-404, considering this as job completed";
                self.report
                    .log(OP_GET_JOB_ATTRIBUTES, self.attempt, note, duration);
                self.finalise(None);
                return;
            }
            Err(err) if err.http_status() == Some(401) => {
                if self.credentials.is_some() {
                    self.finalise(Some(OperationError::new(
                        ErrorKind::MonitorFailedToMonitor,
                        format!("failed to monitor job progress: {err}"),
                    )));
                    return;
                }
                let note = "received HTTP 401; retrying with dummy credentials";
                self.report
                    .log(OP_GET_JOB_ATTRIBUTES, self.attempt, note, duration);
                self.credentials = Some(default_credentials());
                return;
            }
            Err(err) if err.is_temporary() => {
                let note = format!("failed to monitor job with temp error, err={err}");
                self.report
                    .log(OP_GET_JOB_ATTRIBUTES, self.attempt, &note, duration);
                return;
            }
            Err(err) => {
                let note = format!("failed to monitor job progress: {err}");
                self.report
                    .log(OP_GET_JOB_ATTRIBUTES, self.attempt, &note, duration);
                self.finalise(Some(OperationError::new(
                    ErrorKind::MonitorFailedToMonitor,
                    note,
                )));
                return;
            }
        };

        let Some(job) = attrs::job_status_from_ipp(response.attributes()) else {
            let note =
                "GetJobAttributes: job-attributes-tag not found in response, considering this as job completed";
            self.report
                .log(OP_GET_JOB_ATTRIBUTES, self.attempt, note, duration);
            self.finalise(None);
            return;
        };

        let note = format!("job state: {}, reasons: {:?}", job.state, job.state_reasons);
        self.report
            .log(OP_GET_JOB_ATTRIBUTES, self.attempt, &note, duration);

        match job.state {
            JOB_STATE_COMPLETED => self.finalise(None),
            JOB_STATE_CANCELED => self.finalise(Some(OperationError::new(
                ErrorKind::JobCancelled,
                format!(
                    "jobID {} canceled; reasons: [{}]",
                    self.job_id,
                    job.state_reasons.join(", ")
                ),
            ))),
            JOB_STATE_ABORTED => self.finalise(Some(OperationError::new(
                ErrorKind::JobAborted,
                format!(
                    "jobID {} aborted; reasons: [{}]",
                    self.job_id,
                    job.state_reasons.join(", ")
                ),
            ))),
            _ => self.remember(job),
        }
    }

    fn remember(&mut self, job: JobStatusInfo) {
        debug!(job_id = job.job_id, state = job.state, "job still in progress");
    }

    /// Latch the terminal outcome.  Closing `finalised` wakes `wait()`,
    /// which in turn closes `terminated` and stops the tick loop.
    fn finalise(&self, error: Option<OperationError>) {
        if let Some(err) = error {
            self.shared
                .errors
                .lock()
                .expect("monitor error list poisoned")
                .push(err);
        }
        self.shared.finalised.cancel();
    }
}
