use crate::tracing_setup::tracing_init;
use futures::StreamExt;
use futures_signals::map_ref;
use futures_signals::signal::SignalExt;
use requestrx::{combine_requestors, CallContext, RequestStreamExt, Requestor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

mod tracing_setup;

// Short queries take longer than long ones, so an older invocation can
// finish after a newer one started.
async fn search(query: String, context: CallContext) -> Result<Vec<String>, String> {
    let delay = Duration::from_millis(300_u64.saturating_sub(20 * query.len() as u64));
    tokio::select! {
        _ = context.aborted() => {
            debug!("Worker thread | search '{query}' noticed it was superseded");
            Err(format!("superseded: {query}"))
        }
        _ = sleep(delay) => {
            info!("Worker thread | search '{query}' finished");
            Ok(vec![format!("{query}-crates"), format!("{query}-docs")])
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    info!("  Main thread | build the search controller");
    let searches: Arc<Requestor<String, Vec<String>, String>> = Arc::new(
        Requestor::builder()
            .call_with_context(search)
            .auto_clear(false)
            .build()?,
    );

    info!("==========================================");
    warn!("demo: type-ahead, every keystroke supersedes the previous search");

    let typist = searches.clone();
    tokio::spawn(async move {
        for query in ["r", "ru", "rus", "rust"] {
            debug!("Worker thread | keystroke: {query}");
            typist.execute(query.to_string());
            sleep(Duration::from_millis(40)).await;
        }
    });

    searches
        .to_stream()
        .until_settled()
        .for_each(|snapshot| async move {
            info!(
                "  Main thread | {:?} for ticket {:?}, results: {:?}",
                snapshot.state(),
                snapshot.ticket(),
                snapshot.response()
            );
        })
        .await;
    info!("  Main thread | only the last keystroke settled: {:?}", searches.response());

    info!("==========================================");
    warn!("demo: a slow stale result cannot overwrite a fast fresh one");

    let slow = searches.execute("a".to_string());
    let fast = searches.execute("abcdefghij".to_string());
    info!(
        "  Main thread | slow ticket {}, fast ticket {}",
        slow.ticket(),
        fast.ticket()
    );

    fast.settled().await;
    info!("  Main thread | fast settled, response: {:?}", searches.response());

    slow.settled().await;
    let snapshot = searches.await_snapshot().await?;
    info!(
        "  Main thread | slow settled too, still: {:?} with no error: {:?}",
        snapshot.response(),
        snapshot.error()
    );

    info!("==========================================");
    warn!("demo: combine two controllers into one view");

    let profile: Arc<Requestor<(), String, String>> = Arc::new(Requestor::new(|_| async {
        sleep(Duration::from_millis(80)).await;
        Ok::<String, String>("rustacean_42".to_string())
    }));

    profile.execute(());
    searches.execute("tokio".to_string());

    let combined = combine_requestors!(profile, searches);
    let mut stream = combined.to_stream();
    while let Some((profile_snapshot, search_snapshot)) = stream.next().await {
        info!(
            "  Main thread | profile: {:?}, search: {:?}",
            profile_snapshot.state(),
            search_snapshot.state()
        );
        if profile_snapshot.success() && search_snapshot.success() {
            info!(
                "  Main thread | {:?} sees {:?}",
                profile_snapshot.response(),
                search_snapshot.response()
            );
            break;
        }
    }

    info!("  Main thread | Finish");
    Ok(())
}
