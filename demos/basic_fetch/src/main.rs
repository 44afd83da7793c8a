use crate::tracing_setup::tracing_init;
use requestrx::{ErrorType, RequestError, Requestor};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

mod tracing_setup;

#[derive(Debug, Clone, PartialEq)]
struct UserProfile {
    id: u64,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
enum FetchError {
    NotFound(u64),
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound(id) => write!(f, "no user with id {id}"),
            FetchError::Transport(message) => write!(f, "transport failed: {message}"),
        }
    }
}

impl ErrorType for FetchError {
    fn error_type(&self) -> Option<&str> {
        match self {
            FetchError::NotFound(_) => Some("NOT_FOUND"),
            FetchError::Transport(_) => None,
        }
    }
}

async fn fetch_profile(id: u64) -> Result<UserProfile, FetchError> {
    sleep(Duration::from_millis(150)).await;
    match id {
        404 => Err(FetchError::NotFound(id)),
        500 => Err(FetchError::Transport("connection reset".to_string())),
        _ => Ok(UserProfile {
            id,
            name: format!("user-{id}"),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    info!("  Main thread | build the profile controller");
    let profiles: Requestor<u64, UserProfile, FetchError> = Requestor::builder()
        .call(fetch_profile)
        .default_response(UserProfile {
            id: 0,
            name: "guest".to_string(),
        })
        .transform_error(|raw| match raw {
            RequestError::Call(FetchError::NotFound(_)) => Some("profile.not_found".to_string()),
            _ => None,
        })
        .build()?;

    info!("==========================================");
    warn!("demo: the default response stands in before any fetch");
    info!("  Main thread | state: {:?}", profiles.state());
    info!("  Main thread | response: {:?}", profiles.response());

    info!("==========================================");
    warn!("demo: fetch a profile");

    profiles.execute(7).settled().await;
    info!("  Main thread | state: {:?}", profiles.state());
    info!("  Main thread | response: {:?}", profiles.response());

    info!("==========================================");
    warn!("demo: a missing profile surfaces the transformed error");

    profiles.execute(404).settled().await;
    info!("  Main thread | error: {:?}", profiles.error());
    info!("  Main thread | raw error: {:?}", profiles.raw_error());
    info!("  Main thread | response falls back: {:?}", profiles.response());

    info!("==========================================");
    warn!("demo: a transport failure uses its display text");

    profiles.execute(500).settled().await;
    info!("  Main thread | error: {:?}", profiles.error());

    info!("==========================================");
    warn!("demo: install and clear a response by hand");

    profiles.set_response(UserProfile {
        id: 1,
        name: "local draft".to_string(),
    });
    let snapshot = profiles.await_snapshot().await?;
    info!(
        "  Main thread | manual response: {:?}, error kept: {:?}",
        snapshot.response(),
        snapshot.error()
    );

    profiles.clear_error_and_response();
    let snapshot = profiles.await_snapshot().await?;
    info!(
        "  Main thread | back to {:?}, response: {:?}",
        snapshot.state(),
        snapshot.response()
    );

    info!("  Main thread | Finish");
    Ok(())
}
