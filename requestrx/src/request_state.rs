use crate::progress::Progress;
use crate::request_error::RequestError;
use crate::ticket::Ticket;

/// Lifecycle phase of the wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestState {
    /// No invocation has run, or the response was cleared.
    Initial,
    /// An invocation is in flight.
    Fetching,
    /// The latest applied outcome was a success.
    Success,
    /// The latest applied outcome was a failure.
    Error,
}

impl RequestState {
    pub fn is_initial(&self) -> bool {
        matches!(self, RequestState::Initial)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Fetching)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestState::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RequestState::Error)
    }

    /// True while nothing has been applied yet: before the first invocation
    /// and while one is in flight.
    pub fn initial_or_loading(&self) -> bool {
        matches!(self, RequestState::Initial | RequestState::Fetching)
    }

    /// True once an outcome has been applied, successful or not.
    pub fn complete(&self) -> bool {
        matches!(self, RequestState::Success | RequestState::Error)
    }
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState::Initial
    }
}

/// One consistent view of a controller.
///
/// Every transition replaces the snapshot wholesale, so an observer never
/// sees a half-applied write: state, response, error and progress always
/// belong to the same moment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestSnapshot<T, E> {
    pub(crate) state: RequestState,
    pub(crate) response: Option<T>,
    pub(crate) default_response: Option<T>,
    pub(crate) error: Option<String>,
    pub(crate) raw_error: Option<RequestError<E>>,
    pub(crate) progress: Progress,
    pub(crate) ticket: Option<Ticket>,
}

impl<T, E> RequestSnapshot<T, E> {
    pub(crate) fn new(default_response: Option<T>) -> Self {
        RequestSnapshot {
            state: RequestState::Initial,
            response: None,
            default_response,
            error: None,
            raw_error: None,
            progress: Progress::default(),
            ticket: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// The stored response if one is present, else the configured default.
    pub fn response(&self) -> Option<&T> {
        self.response.as_ref().or(self.default_response.as_ref())
    }

    /// The stored response, ignoring the configured default.
    pub fn stored_response(&self) -> Option<&T> {
        self.response.as_ref()
    }

    pub fn default_response(&self) -> Option<&T> {
        self.default_response.as_ref()
    }

    /// Consumes the snapshot, returning the stored response if one is
    /// present, else the configured default.
    pub fn into_response(self) -> Option<T> {
        self.response.or(self.default_response)
    }

    /// Normalized display text for the recorded error.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The recorded error without any display normalization.
    pub fn raw_error(&self) -> Option<&RequestError<E>> {
        self.raw_error.as_ref()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Ticket of the most recently started invocation, if any.
    pub fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    /// Whether `ticket` identifies the invocation currently allowed to
    /// apply its outcome.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.ticket == Some(ticket)
    }

    pub fn loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn success(&self) -> bool {
        self.state.is_success()
    }

    pub fn initial_or_loading(&self) -> bool {
        self.state.initial_or_loading()
    }

    /// True once an outcome has been applied, successful or not.
    pub fn is_settled(&self) -> bool {
        self.state.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketCounter;

    #[test]
    fn test_state_defaults_to_initial() {
        assert_eq!(RequestState::default(), RequestState::Initial);
        assert!(RequestState::default().is_initial());
    }

    #[test]
    fn test_state_predicates() {
        assert!(RequestState::Fetching.is_loading());
        assert!(RequestState::Initial.initial_or_loading());
        assert!(RequestState::Fetching.initial_or_loading());
        assert!(!RequestState::Success.initial_or_loading());
        assert!(RequestState::Success.complete());
        assert!(RequestState::Error.complete());
        assert!(!RequestState::Fetching.complete());
    }

    #[test]
    fn test_new_snapshot_is_initial_and_empty() {
        let snapshot: RequestSnapshot<String, String> = RequestSnapshot::new(None);
        assert!(snapshot.state().is_initial());
        assert_eq!(snapshot.response(), None);
        assert_eq!(snapshot.error(), None);
        assert_eq!(snapshot.ticket(), None);
        assert!(!snapshot.is_settled());
    }

    #[test]
    fn test_response_falls_back_to_the_default() {
        let mut snapshot: RequestSnapshot<String, String> =
            RequestSnapshot::new(Some("default".to_string()));
        assert_eq!(snapshot.response(), Some(&"default".to_string()));
        assert_eq!(snapshot.stored_response(), None);

        snapshot.response = Some("stored".to_string());
        assert_eq!(snapshot.response(), Some(&"stored".to_string()));

        snapshot.response = None;
        assert_eq!(snapshot.response(), Some(&"default".to_string()));
        assert_eq!(snapshot.into_response(), Some("default".to_string()));
    }

    #[test]
    fn test_is_current_matches_only_the_latest_ticket() {
        let counter = TicketCounter::new();
        let first = counter.next();
        let second = counter.next();

        let mut snapshot: RequestSnapshot<String, String> = RequestSnapshot::new(None);
        assert!(!snapshot.is_current(first));

        snapshot.ticket = Some(second);
        assert!(!snapshot.is_current(first));
        assert!(snapshot.is_current(second));
    }
}
