//! HTTP surface of the relay.

use super::client::CompletionClient;
use super::prompt::{ReadmeRequest, build_prompt};
use super::ProxyError;
use crate::config::ProxyConfig;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub const GENERATE_README_PATH: &str = "generate-readme";

/// The only error text a caller ever sees.
const FAILURE_MESSAGE: &str = "Failed to generate README";

#[derive(Debug, Serialize)]
struct ReadmeReply {
    readme: String,
}

#[derive(Debug, Serialize)]
struct ErrorReply {
    error: &'static str,
}

/// `POST /generate-readme`, with permissive CORS.
pub fn routes(
    client: Arc<dyn CompletionClient>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    warp::path(GENERATE_README_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_body_bytes))
        .and(warp::body::json())
        .and(with_client(client))
        .and_then(handle_generate)
        .with(cors)
}

/// Inject the completion client
fn with_client(
    client: Arc<dyn CompletionClient>,
) -> impl Filter<Extract = (Arc<dyn CompletionClient>,), Error = Infallible> + Clone {
    warp::any().map(move || client.clone())
}

async fn handle_generate(
    request: ReadmeRequest,
    client: Arc<dyn CompletionClient>,
) -> Result<warp::reply::Response, Rejection> {
    let prompt = build_prompt(&request);
    match client.complete(&prompt).await {
        Ok(readme) => {
            info!(chars = readme.len(), "README generated");
            Ok(warp::reply::json(&ReadmeReply { readme }).into_response())
        }
        Err(e) => {
            error!("README generation failed: {}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorReply {
                    error: FAILURE_MESSAGE,
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}

/// Listen on all interfaces at `config.port` until Ctrl-C.
pub async fn serve(client: Arc<dyn CompletionClient>, config: &ProxyConfig) -> Result<(), ProxyError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(routes(client, config.max_body_bytes))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })?;
    info!("README relay running on port {}", bound.port());
    server.await;
    info!("README relay stopped");
    Ok(())
}
