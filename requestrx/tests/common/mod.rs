#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use requestrx::{ErrorType, RequestSnapshot, Requestor};
use tokio::sync::oneshot;

// A call error with an optional machine-readable discriminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestError {
    pub kind: Option<&'static str>,
    pub message: String,
}

impl TestError {
    pub fn new(kind: Option<&'static str>, message: &str) -> Self {
        TestError {
            kind,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ErrorType for TestError {
    fn error_type(&self) -> Option<&str> {
        self.kind
    }
}

pub type Release = oneshot::Sender<Result<String, TestError>>;

/// A controller whose invocations each wait on a prepared gate, released
/// from the test body. Gates are consumed in invocation order.
pub fn gated_requestor(count: usize) -> (Vec<Release>, Requestor<(), String, TestError>) {
    let mut releases = Vec::with_capacity(count);
    let mut gates = VecDeque::with_capacity(count);
    for _ in 0..count {
        let (release, gate) = oneshot::channel();
        releases.push(release);
        gates.push_back(gate);
    }

    let gates = Arc::new(Mutex::new(gates));
    let requestor = Requestor::new(move |_| {
        let gate = gates.lock().unwrap().pop_front();
        async move { gate.expect("one gate per invocation").await.unwrap() }
    });
    (releases, requestor)
}

/// Follows the snapshot stream until `pred` holds, returning the first
/// snapshot that satisfies it.
pub async fn wait_until<A, F>(
    requestor: &Requestor<A, String, TestError>,
    mut pred: F,
) -> RequestSnapshot<String, TestError>
where
    A: Send + 'static,
    F: FnMut(&RequestSnapshot<String, TestError>) -> bool,
{
    let mut stream = requestor.to_stream();
    while let Some(snapshot) = stream.next().await {
        if pred(&snapshot) {
            return snapshot;
        }
    }
    panic!("snapshot stream ended before the condition was met");
}
