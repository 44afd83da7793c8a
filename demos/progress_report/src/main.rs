use crate::tracing_setup::tracing_init;
use futures::StreamExt;
use requestrx::{CallContext, RequestStreamExt, Requestor};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

mod tracing_setup;

// Simulates a round trip: ten upload chunks, then four download chunks.
// Progress is reported through the invocation's context and checked against
// the token between chunks.
async fn transfer(payload: String, context: CallContext) -> Result<String, String> {
    let uploader = context.upload_reporter();
    for chunk in 1..=10 {
        if context.is_aborted() {
            debug!("Worker thread | upload of '{payload}' stopped at chunk {chunk}");
            return Err("transfer aborted".to_string());
        }
        sleep(Duration::from_millis(30)).await;
        uploader.report(chunk as f64 * 10.0);
    }

    for chunk in 1..=4 {
        sleep(Duration::from_millis(30)).await;
        context.report_download(chunk as f64 * 25.0);
    }

    Ok(format!("'{payload}' round-tripped"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    info!("  Main thread | build the transfer controller");
    let transfers: Requestor<String, String, String> = Requestor::builder()
        .call_with_context(transfer)
        .build()?;

    info!("==========================================");
    warn!("demo: follow upload and download progress to settlement");

    transfers.execute("report.pdf".to_string());
    transfers
        .to_stream()
        .until_settled()
        .for_each(|snapshot| async move {
            info!(
                "  Main thread | {:?} upload {:>5.1}% download {:>5.1}%",
                snapshot.state(),
                snapshot.progress().upload(),
                snapshot.progress().download()
            );
        })
        .await;
    info!(
        "  Main thread | upload complete: {}, download complete: {}",
        transfers.upload_complete(),
        transfers.download_complete()
    );
    info!("  Main thread | response: {:?}", transfers.response());

    info!("==========================================");
    warn!("demo: abort a transfer midway");

    let invocation = transfers.execute("backup.tar".to_string());
    sleep(Duration::from_millis(100)).await;
    info!(
        "  Main thread | aborting at upload {:>5.1}%",
        transfers.upload_progress()
    );
    invocation.abort();
    invocation.settled().await;
    info!(
        "  Main thread | state: {:?}, error: {:?}",
        transfers.state(),
        transfers.error()
    );

    info!("==========================================");
    warn!("demo: a fresh invocation starts from zero");

    let invocation = transfers.execute("photo.jpg".to_string());
    let fetching = transfers.await_snapshot().await?;
    info!(
        "  Main thread | progress reset to upload {:>5.1}% download {:>5.1}%",
        fetching.progress().upload(),
        fetching.progress().download()
    );
    invocation.settled().await;
    info!("  Main thread | response: {:?}", transfers.response());

    info!("  Main thread | Finish");
    Ok(())
}
