// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkwire-print -- submits a single document to an IPP printer and tracks
// the job to a terminal state.
//
// The pieces, leaves first: a rewindable document spool, the processing
// report sink, the printer-attribute cache, the readiness prober, the IPP
// operation engine (Create-Job / Send-Document / Print-Job / Cancel-Job
// with retry and credential escalation), the job monitor, and the
// orchestrator that wires them together under one deadline.  The IPP wire
// codec is the `ipp` crate; HTTP transport is behind the `IppTransport`
// trait so the embedder supplies the client.

pub mod cache;
pub mod checker;
pub mod context;
pub mod document;
pub mod engine;
pub mod monitor;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod transport;

mod attrs;
mod requests;

pub use cache::{CacheError, PrinterAttributeCache};
pub use checker::check_printer;
pub use context::PrintContext;
pub use document::RewindableDocument;
pub use engine::{IppEngine, JobHandle};
pub use monitor::JobMonitor;
pub use orchestrator::PrintClient;
pub use report::{ProcessingLog, StderrProcessingLog};
pub use transport::{HttpIppTransport, IppCredentials, IppTransport, TransportError};
