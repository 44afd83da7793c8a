use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::call::{wrap_call, wrap_call_with_context, CallContext, CallFn, CallOutcome};
use crate::progress::{Progress, ProgressChannel, ProgressReport};
use crate::request_error::{ConfigError, ErrorType, RequestError};
use crate::request_state::{RequestSnapshot, RequestState};
use crate::ticket::{Ticket, TicketCounter};

type TransformError<E> = Arc<dyn Fn(&RequestError<E>) -> Option<String> + Send + Sync>;

/// Snapshot transitions, applied strictly in order by the controller's
/// queue task.
enum Intent<T, E> {
    Begin {
        ticket: Ticket,
        token: CancellationToken,
    },
    Settle {
        ticket: Ticket,
        outcome: Result<T, RequestError<E>>,
        applied: oneshot::Sender<bool>,
    },
    SetResponse(T),
    ClearResponse,
    ClearError,
    ClearErrorAndResponse,
    ResetProgress(Option<ProgressChannel>),
    Inspect(oneshot::Sender<RequestSnapshot<T, E>>),
}

/// A race-safe controller around one asynchronous operation.
///
/// Wraps a single call fixed at construction and tracks its lifecycle,
/// latest applied response, normalized error and transfer progress as one
/// observable [`RequestSnapshot`]. Overlapping invocations are resolved by
/// invocation identity: only the most recently started invocation may write
/// its outcome back, everything older is discarded on arrival.
///
/// Construction spawns the queue task, so a controller must be created
/// inside a tokio runtime.
pub struct Requestor<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: ErrorType + Display + Clone + Send + Sync + 'static,
{
    snapshot: Mutable<RequestSnapshot<T, E>>,
    intent_tx: UnboundedSender<Intent<T, E>>,
    progress_tx: UnboundedSender<ProgressReport>,
    call: CallFn<A, T, E>,
    tickets: TicketCounter,
}

impl<A, T, E> Requestor<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: ErrorType + Display + Clone + Send + Sync + 'static,
{
    /// Creates a controller around `call` with the default configuration:
    /// auto-clear on, no default response, no error transform.
    pub fn new<F, Fut, R>(call: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: CallOutcome<T, E> + Send + 'static,
    {
        Self::from_parts(wrap_call(call), true, None, None)
    }

    /// Starts configuring a controller. Finish with
    /// [`RequestorBuilder::build`].
    pub fn builder() -> RequestorBuilder<A, T, E> {
        RequestorBuilder::new()
    }

    fn from_parts(
        call: CallFn<A, T, E>,
        auto_clear: bool,
        default_response: Option<T>,
        transform_error: Option<TransformError<E>>,
    ) -> Self {
        let snapshot = Mutable::new(RequestSnapshot::new(default_response));
        let (intent_tx, intent_rx) = tokio::sync::mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();

        let snapshot_clone = snapshot.clone();
        tokio::spawn(async move {
            Self::process_queue(snapshot_clone, intent_rx, progress_rx, auto_clear, transform_error)
                .await;
        });

        Requestor {
            snapshot,
            intent_tx,
            progress_tx,
            call,
            tickets: TicketCounter::new(),
        }
    }

    async fn process_queue(
        snapshot: Mutable<RequestSnapshot<T, E>>,
        mut intent_rx: UnboundedReceiver<Intent<T, E>>,
        mut progress_rx: UnboundedReceiver<ProgressReport>,
        auto_clear: bool,
        transform_error: Option<TransformError<E>>,
    ) {
        // Token of the invocation currently allowed to write. Replaced on
        // every begin so the superseded call can observe its cancellation.
        let mut armed_token: Option<CancellationToken> = None;

        loop {
            tokio::select! {
                biased;

                Some(intent) = intent_rx.recv() => {
                    Self::apply_intent(
                        &snapshot,
                        intent,
                        auto_clear,
                        &transform_error,
                        &mut armed_token,
                    );
                }
                Some(report) = progress_rx.recv() => {
                    Self::apply_progress(&snapshot, report);
                }
                else => break,
            }
        }
    }

    fn apply_intent(
        snapshot: &Mutable<RequestSnapshot<T, E>>,
        intent: Intent<T, E>,
        auto_clear: bool,
        transform_error: &Option<TransformError<E>>,
        armed_token: &mut Option<CancellationToken>,
    ) {
        let mut next = snapshot.get_cloned();
        match intent {
            Intent::Begin { ticket, token } => {
                if let Some(superseded) = armed_token.replace(token) {
                    superseded.cancel();
                }
                next.ticket = Some(ticket);
                next.state = RequestState::Fetching;
                next.error = None;
                next.raw_error = None;
                next.progress = Progress::default();
                if auto_clear {
                    next.response = None;
                }
            }
            Intent::Settle {
                ticket,
                outcome,
                applied,
            } => {
                if !next.is_current(ticket) {
                    debug!(%ticket, "discarding outcome of a superseded invocation");
                    let _ = applied.send(false);
                    return;
                }
                match outcome {
                    Ok(value) => {
                        next.state = RequestState::Success;
                        next.response = Some(value);
                    }
                    Err(raw) => {
                        error!(%ticket, error = %raw, "request failed");
                        next.state = RequestState::Error;
                        next.response = None;
                        next.error = Some(Self::normalize_error(&raw, transform_error));
                        next.raw_error = Some(raw);
                    }
                }
                // Publish before acking so a settled waiter reads its own
                // outcome.
                snapshot.set(next);
                let _ = applied.send(true);
                return;
            }
            Intent::SetResponse(value) => {
                next.state = RequestState::Success;
                next.response = Some(value);
            }
            Intent::ClearResponse => {
                next.state = RequestState::Initial;
                next.response = None;
            }
            Intent::ClearError => {
                next.error = None;
                next.raw_error = None;
            }
            Intent::ClearErrorAndResponse => {
                next.state = RequestState::Initial;
                next.response = None;
                next.error = None;
                next.raw_error = None;
            }
            Intent::ResetProgress(channel) => {
                next.progress.reset(channel);
            }
            Intent::Inspect(reply) => {
                let _ = reply.send(next);
                return;
            }
        }
        snapshot.set(next);
    }

    fn apply_progress(snapshot: &Mutable<RequestSnapshot<T, E>>, report: ProgressReport) {
        let mut next = snapshot.get_cloned();
        if !next.is_current(report.ticket) {
            debug!(ticket = %report.ticket, "discarding progress of a superseded invocation");
            return;
        }
        next.progress.set(report.channel, report.percentage);
        snapshot.set(next);
    }

    fn normalize_error(raw: &RequestError<E>, transform: &Option<TransformError<E>>) -> String {
        if let Some(transform) = transform {
            if let Some(text) = transform(raw).filter(|text| !text.is_empty()) {
                return text;
            }
        }
        raw.display_message()
    }

    /// Starts an invocation of the wrapped call with `args`.
    ///
    /// Never fails and never panics on behalf of the call: call errors and
    /// call panics both surface through the snapshot. The fetching
    /// transition is applied through the queue, so read it back with
    /// [`await_snapshot`](Self::await_snapshot) or an observer rather than
    /// immediately via [`snapshot`](Self::snapshot).
    ///
    /// The returned [`Invocation`] can be awaited for settlement or used to
    /// abort. Dropping it detaches the invocation, which keeps running.
    pub fn execute(&self, args: A) -> Invocation {
        let ticket = self.tickets.next();
        let token = CancellationToken::new();
        let _ = self.intent_tx.send(Intent::Begin {
            ticket,
            token: token.clone(),
        });

        let context = CallContext::new(ticket, token.clone(), self.progress_tx.clone());
        let call = self.call.clone();
        let intent_tx = self.intent_tx.clone();

        let handle = tokio::spawn(async move {
            // Yield to allow the fetching transition to be applied before
            // the call runs.
            tokio::task::yield_now().await;

            // The call runs in its own task so a panic inside it is caught
            // as a join error instead of killing this driver.
            let joined = tokio::spawn(async move { call(args, context).await }).await;
            let outcome = match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(RequestError::Call(error)),
                Err(join_error) => Err(RequestError::Task(join_error.to_string())),
            };

            let (applied_tx, applied_rx) = oneshot::channel();
            let _ = intent_tx.send(Intent::Settle {
                ticket,
                outcome,
                applied: applied_tx,
            });
            // Hold the driver open until the outcome was applied or
            // discarded.
            let _ = applied_rx.await;
        });

        Invocation {
            ticket,
            token,
            handle,
        }
    }

    /// The current snapshot, read directly from the shared cell.
    pub fn snapshot(&self) -> RequestSnapshot<T, E> {
        self.snapshot.get_cloned()
    }

    /// The snapshot after every transition enqueued so far has been
    /// applied.
    pub async fn await_snapshot(&self) -> Result<RequestSnapshot<T, E>, RecvError> {
        let (tx, rx) = oneshot::channel();
        let _ = self.intent_tx.send(Intent::Inspect(tx));
        rx.await
    }

    /// A signal tracking the snapshot.
    pub fn to_signal(&self) -> MutableSignalCloned<RequestSnapshot<T, E>> {
        self.snapshot.signal_cloned()
    }

    /// A stream of snapshots, starting from the current one.
    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<RequestSnapshot<T, E>>> {
        self.snapshot.signal_cloned().to_stream()
    }

    pub fn state(&self) -> RequestState {
        self.snapshot.lock_ref().state()
    }

    /// True while an invocation is in flight.
    pub fn loading(&self) -> bool {
        self.snapshot.lock_ref().loading()
    }

    /// True while no outcome has been applied yet.
    pub fn initial_or_loading(&self) -> bool {
        self.snapshot.lock_ref().initial_or_loading()
    }

    pub fn success(&self) -> bool {
        self.snapshot.lock_ref().success()
    }

    /// The stored response if one is present, else the configured default.
    pub fn response(&self) -> Option<T> {
        self.snapshot.lock_ref().response().cloned()
    }

    /// Normalized display text for the recorded error.
    pub fn error(&self) -> Option<String> {
        self.snapshot.lock_ref().error().map(String::from)
    }

    /// The recorded error without any display normalization.
    pub fn raw_error(&self) -> Option<RequestError<E>> {
        self.snapshot.lock_ref().raw_error().cloned()
    }

    pub fn upload_progress(&self) -> f64 {
        self.snapshot.lock_ref().progress().upload()
    }

    pub fn download_progress(&self) -> f64 {
        self.snapshot.lock_ref().progress().download()
    }

    pub fn upload_complete(&self) -> bool {
        self.snapshot.lock_ref().progress().upload_complete()
    }

    pub fn download_complete(&self) -> bool {
        self.snapshot.lock_ref().progress().download_complete()
    }

    /// Installs `value` as if it were a successful outcome.
    ///
    /// Applies unconditionally, without an invocation and without any
    /// identity check. The recorded error is left untouched.
    pub fn set_response(&self, value: T) {
        let _ = self.intent_tx.send(Intent::SetResponse(value));
    }

    /// Drops the stored response and returns the lifecycle to initial. The
    /// recorded error is left untouched.
    pub fn clear_response(&self) {
        let _ = self.intent_tx.send(Intent::ClearResponse);
    }

    /// Drops the recorded error. The lifecycle and response are left
    /// untouched.
    pub fn clear_error(&self) {
        let _ = self.intent_tx.send(Intent::ClearError);
    }

    /// Drops both the recorded error and the stored response and returns
    /// the lifecycle to initial.
    pub fn clear_error_and_response(&self) {
        let _ = self.intent_tx.send(Intent::ClearErrorAndResponse);
    }

    pub fn reset_upload_progress(&self) {
        let _ = self
            .intent_tx
            .send(Intent::ResetProgress(Some(ProgressChannel::Upload)));
    }

    pub fn reset_download_progress(&self) {
        let _ = self
            .intent_tx
            .send(Intent::ResetProgress(Some(ProgressChannel::Download)));
    }

    pub fn reset_progress(&self) {
        let _ = self.intent_tx.send(Intent::ResetProgress(None));
    }
}

/// Handle for one started invocation.
#[derive(Debug)]
pub struct Invocation {
    ticket: Ticket,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Invocation {
    /// The ticket issued to this invocation.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Requests cancellation of the wrapped call.
    ///
    /// Cancellation is advisory: the call decides whether to observe its
    /// token. An outcome the call still produces is applied or discarded by
    /// the ordinary identity rules.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// True once the outcome has been applied or discarded.
    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits until the outcome of this invocation has been applied or
    /// discarded.
    pub async fn settled(self) {
        let _ = self.handle.await;
    }
}

/// Configures a [`Requestor`].
///
/// The wrapped call is the only required ingredient; everything else has a
/// default. Validation happens at [`build`](Self::build) so a
/// misconfiguration fails loudly at construction instead of at the first
/// invocation.
pub struct RequestorBuilder<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: ErrorType + Display + Clone + Send + Sync + 'static,
{
    call: Option<CallFn<A, T, E>>,
    auto_clear: bool,
    default_response: Option<T>,
    transform_error: Option<TransformError<E>>,
}

impl<A, T, E> RequestorBuilder<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: ErrorType + Display + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        RequestorBuilder {
            call: None,
            auto_clear: true,
            default_response: None,
            transform_error: None,
        }
    }

    /// Sets the operation to wrap.
    pub fn call<F, Fut, R>(mut self, call: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: CallOutcome<T, E> + Send + 'static,
    {
        self.call = Some(wrap_call(call));
        self
    }

    /// Sets an operation that also receives the per-invocation
    /// [`CallContext`], for progress reporting and cancellation.
    pub fn call_with_context<F, Fut, R>(mut self, call: F) -> Self
    where
        F: Fn(A, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: CallOutcome<T, E> + Send + 'static,
    {
        self.call = Some(wrap_call_with_context(call));
        self
    }

    /// Whether starting an invocation drops the stored response. On by
    /// default; turn it off to keep showing the previous response while a
    /// refresh is in flight.
    pub fn auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = auto_clear;
        self
    }

    /// Response reported while no stored response is present.
    pub fn default_response(mut self, default_response: T) -> Self {
        self.default_response = Some(default_response);
        self
    }

    /// Maps raw errors to display text ahead of the built-in
    /// normalization. Returning `None` or an empty string falls back to the
    /// built-in chain.
    pub fn transform_error<F>(mut self, transform: F) -> Self
    where
        F: Fn(&RequestError<E>) -> Option<String> + Send + Sync + 'static,
    {
        self.transform_error = Some(Arc::new(transform));
        self
    }

    /// Builds the controller, spawning its queue task.
    ///
    /// Fails with [`ConfigError::MissingCall`] when no call was supplied.
    pub fn build(self) -> Result<Requestor<A, T, E>, ConfigError> {
        let call = self.call.ok_or(ConfigError::MissingCall)?;
        Ok(Requestor::from_parts(
            call,
            self.auto_clear,
            self.default_response,
            self.transform_error,
        ))
    }
}

impl<A, T, E> Default for RequestorBuilder<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: ErrorType + Display + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
