use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressChannel, ProgressReport, ProgressReporter};
use crate::ticket::Ticket;

/// Boxed future a wrapped call resolves to.
pub type CallFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// The wrapped operation, fixed at construction time.
pub(crate) type CallFn<A, T, E> = Arc<dyn Fn(A, CallContext) -> CallFuture<T, E> + Send + Sync>;

/// Per-invocation capabilities handed to the wrapped call.
///
/// Carries the invocation's [`Ticket`], the cancellation token armed for it
/// and the progress reporters. A call is free to ignore all of it and still
/// participates fully in the lifecycle.
#[derive(Debug, Clone)]
pub struct CallContext {
    ticket: Ticket,
    token: CancellationToken,
    progress_tx: UnboundedSender<ProgressReport>,
}

impl CallContext {
    pub(crate) fn new(
        ticket: Ticket,
        token: CancellationToken,
        progress_tx: UnboundedSender<ProgressReport>,
    ) -> Self {
        CallContext {
            ticket,
            token,
            progress_tx,
        }
    }

    /// The identity of the invocation this context belongs to.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Token cancelled once this invocation is superseded or aborted.
    ///
    /// Cancellation is advisory: a call that keeps running anyway simply has
    /// its outcome discarded as stale.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// True once the controller no longer wants this invocation's outcome.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this invocation is superseded or aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// Records upload completion for this invocation.
    pub fn report_upload(&self, percentage: f64) {
        let _ = self.progress_tx.send(ProgressReport {
            ticket: self.ticket,
            channel: ProgressChannel::Upload,
            percentage,
        });
    }

    /// Records download completion for this invocation.
    pub fn report_download(&self, percentage: f64) {
        let _ = self.progress_tx.send(ProgressReport {
            ticket: self.ticket,
            channel: ProgressChannel::Download,
            percentage,
        });
    }

    /// A standalone upload reporter, for handing to a transport.
    pub fn upload_reporter(&self) -> ProgressReporter {
        ProgressReporter::new(self.ticket, ProgressChannel::Upload, self.progress_tx.clone())
    }

    /// A standalone download reporter, for handing to a transport.
    pub fn download_reporter(&self) -> ProgressReporter {
        ProgressReporter::new(
            self.ticket,
            ProgressChannel::Download,
            self.progress_tx.clone(),
        )
    }
}

/// Unifies the shapes a wrapped call may settle with.
///
/// A call returning a plain `T` is treated as infallible, while one
/// returning `Result<T, E>` reports its own failures. Both run through the
/// same lifecycle.
pub trait CallOutcome<T, E> {
    fn into_outcome(self) -> Result<T, E>;
}

impl<T, E> CallOutcome<T, E> for Result<T, E> {
    fn into_outcome(self) -> Result<T, E> {
        self
    }
}

impl<T, E> CallOutcome<T, E> for T {
    fn into_outcome(self) -> Result<T, E> {
        Ok(self)
    }
}

pub(crate) fn wrap_call<A, T, E, F, Fut, R>(call: F) -> CallFn<A, T, E>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: CallOutcome<T, E> + Send + 'static,
{
    Arc::new(move |args: A, _context: CallContext| -> CallFuture<T, E> {
        let future = call(args);
        Box::pin(async move { future.await.into_outcome() })
    })
}

pub(crate) fn wrap_call_with_context<A, T, E, F, Fut, R>(call: F) -> CallFn<A, T, E>
where
    F: Fn(A, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: CallOutcome<T, E> + Send + 'static,
{
    Arc::new(move |args: A, context: CallContext| -> CallFuture<T, E> {
        let future = call(args, context);
        Box::pin(async move { future.await.into_outcome() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values_settle_as_success() {
        let outcome: Result<u64, String> = 42u64.into_outcome();
        assert_eq!(outcome, Ok(42));
    }

    #[test]
    fn test_results_pass_through_unchanged() {
        let ok: Result<u64, String> = Ok(7u64).into_outcome();
        assert_eq!(ok, Ok(7));

        let err: Result<u64, String> = Err("boom".to_string()).into_outcome();
        assert_eq!(err, Err("boom".to_string()));
    }
}
