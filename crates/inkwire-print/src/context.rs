// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deadline-aware cancellation shared by every task of a print run.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use inkwire_core::{ErrorKind, OperationError};

/// Cancellation context for one print operation: a token every task selects
/// on, plus the absolute deadline so errors can distinguish "the deadline
/// elapsed" from "something else aborted the run".
#[derive(Debug, Clone)]
pub struct PrintContext {
    token: CancellationToken,
    deadline: Instant,
}

impl PrintContext {
    /// Create a context that cancels itself once `deadline` has elapsed.
    pub fn with_deadline(deadline: Duration) -> Self {
        let ctx = Self {
            token: CancellationToken::new(),
            deadline: Instant::now() + deadline,
        };

        let token = ctx.token.clone();
        let at = ctx.deadline;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(at) => token.cancel(),
            }
        });

        ctx
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the context is cancelled (deadline or abort).
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn deadline_exceeded(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// The error a cancelled operation should surface.
    pub fn operation_error(&self, what: &str) -> OperationError {
        if self.deadline_exceeded() {
            OperationError::new(
                ErrorKind::JobCtxTimeout,
                format!("context deadline exceeded: {what}"),
            )
        } else {
            OperationError::new(ErrorKind::PrintDefault, format!("operation aborted: {what}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_the_token() {
        let ctx = PrintContext::with_deadline(Duration::from_secs(5));
        assert!(!ctx.is_cancelled());

        tokio::time::sleep(Duration::from_secs(6)).await;
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
        assert!(ctx.deadline_exceeded());
        assert_eq!(
            ctx.operation_error("print").kind,
            ErrorKind::JobCtxTimeout
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_cancel_is_not_a_timeout() {
        let ctx = PrintContext::with_deadline(Duration::from_secs(3600));
        ctx.cancel();
        ctx.cancelled().await;
        assert_eq!(ctx.operation_error("print").kind, ErrorKind::PrintDefault);
    }
}
