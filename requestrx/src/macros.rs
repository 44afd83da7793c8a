/// Combines the snapshot signals of several controllers into one signal of
/// tuples.
///
/// Expands to a [`futures_signals::map_ref`] invocation, so `map_ref` must
/// be in scope at the call site. Each item clones the latest snapshot of
/// every controller, which keeps the combined view consistent.
///
/// ## Examples
///
/// ```
/// use futures::StreamExt;
/// use futures_signals::map_ref;
/// use futures_signals::signal::SignalExt;
/// use requestrx::{combine_requestors, Requestor};
///
/// async fn watch(
///     user: &Requestor<u64, String, String>,
///     posts: &Requestor<u64, Vec<String>, String>,
/// ) {
///     let combined = combine_requestors!(user, posts);
///     let mut stream = combined.to_stream();
///     // Each item pairs one user snapshot with one posts snapshot.
///     let (user_snapshot, posts_snapshot) = stream.next().await.unwrap();
///     println!("{:?} / {:?}", user_snapshot.state(), posts_snapshot.state());
/// }
/// ```
#[macro_export]
macro_rules! combine_requestors {
    // A single controller combines to its own signal.
    ($a:expr $(,)?) => {
        $a.to_signal()
    };

    ($a:expr, $b:expr $(,)?) => {
        map_ref! {
            let a = $a.to_signal(),
            let b = $b.to_signal()
            =>
            (a.clone(), b.clone())
        }
    };

    ($a:expr, $b:expr, $c:expr $(,)?) => {
        map_ref! {
            let a = $a.to_signal(),
            let b = $b.to_signal(),
            let c = $c.to_signal()
            =>
            (a.clone(), b.clone(), c.clone())
        }
    };

    ($a:expr, $b:expr, $c:expr, $d:expr $(,)?) => {
        map_ref! {
            let a = $a.to_signal(),
            let b = $b.to_signal(),
            let c = $c.to_signal(),
            let d = $d.to_signal()
            =>
            (a.clone(), b.clone(), c.clone(), d.clone())
        }
    };
}
