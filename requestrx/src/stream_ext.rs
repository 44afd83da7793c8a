use std::pin::Pin;
use std::task::{Context, Poll};
use futures_core::stream::Stream;
use pin_project::pin_project;

use crate::request_state::RequestSnapshot;

/// Extension trait that provides additional utility methods for streams of
/// request snapshots.
///
/// This trait is implemented for all types that implement the `Stream`
/// trait, but its methods only apply to streams whose items are
/// [`RequestSnapshot`] values, such as the one returned by
/// `Requestor::to_stream`.
pub trait RequestStreamExt: Stream {
    /// Creates a stream that ends right after the first settled snapshot.
    ///
    /// Every snapshot is yielded, including the settled one, and then the
    /// stream terminates. Note that a snapshot stream starts from the
    /// current value: on a controller that has already settled, the first
    /// item is also the last.
    ///
    /// ## Examples
    ///
    /// ```
    /// use futures::StreamExt;
    /// use requestrx::{Requestor, RequestStreamExt};
    ///
    /// async fn refresh(requestor: &Requestor<(), String, String>) {
    ///     requestor.execute(());
    ///     let settled = requestor
    ///         .to_stream()
    ///         .until_settled()
    ///         .collect::<Vec<_>>()
    ///         .await
    ///         .pop();
    ///     if let Some(snapshot) = settled {
    ///         println!("settled as {:?}", snapshot.state());
    ///     }
    /// }
    /// ```
    fn until_settled<T, E>(self) -> UntilSettled<Self>
    where
        Self: Stream<Item = RequestSnapshot<T, E>> + Sized,
    {
        UntilSettled {
            stream: self,
            settled: false,
        }
    }
}
impl<T: ?Sized> RequestStreamExt for T where T: Stream {}

/// A stream that ends after yielding the first settled snapshot.
///
/// This stream is created by the `until_settled` method on
/// `RequestStreamExt`. It wraps an inner snapshot stream and yields its
/// items until one of them reports a settled lifecycle.
#[pin_project(project = UntilSettledProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct UntilSettled<A> {
    #[pin]
    stream: A,
    settled: bool,
}

impl<A, T, E> Stream for UntilSettled<A>
where A: Stream<Item = RequestSnapshot<T, E>> {
    type Item = RequestSnapshot<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let UntilSettledProj { stream, settled } = self.project();

        if *settled {
            Poll::Ready(None)

        } else {
            match stream.poll_next(cx) {
                Poll::Ready(Some(snapshot)) => {
                    if snapshot.is_settled() {
                        *settled = true;
                    }

                    Poll::Ready(Some(snapshot))
                },
                Poll::Ready(None) => {
                    *settled = true;
                    Poll::Ready(None)
                },
                Poll::Pending => Poll::Pending,
            }
        }
    }
}
