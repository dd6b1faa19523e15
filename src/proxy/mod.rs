//! README generation relay.
//!
//! A single endpoint, `POST /generate-readme`, takes repository facts as JSON,
//! turns them into a prompt and forwards it to a chat-completion service:
//!
//! ```text
//! {repoName, repoDescription, languages, stars, topics}
//!     → prompt → upstream {messages: [{role: "user", content}]}
//!     → choices[0].message.content → {readme}
//! ```
//!
//! One best-effort forward per request: no retry, cache or rate limit. Any
//! upstream problem (transport, non-2xx status, a reply without content) is
//! logged in full and reported to the caller only as
//! `{"error": "Failed to generate README"}` with status 500.

mod client;
mod prompt;
mod server;

pub use client::{CompletionClient, HttpCompletionClient, extract_content};
pub use prompt::{PromptField, ReadmeRequest, build_prompt};
pub use server::{GENERATE_README_PATH, routes, serve};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("upstream reply has no content: {0}")]
    MalformedReply(String),
    #[error("failed to bind listener: {0}")]
    Bind(#[from] warp::Error),
}
