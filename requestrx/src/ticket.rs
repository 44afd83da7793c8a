use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a single invocation.
///
/// Tickets issued by one controller are strictly increasing and compared by
/// equality only: the most recently issued ticket is the one allowed to
/// write results back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues tickets for one controller.
#[derive(Debug, Default)]
pub(crate) struct TicketCounter(AtomicU64);

impl TicketCounter {
    pub(crate) fn new() -> Self {
        TicketCounter(AtomicU64::new(0))
    }

    /// Returns a ticket strictly greater than every ticket issued before it.
    pub(crate) fn next(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
