//! # Shrinkray
//!
//! Resize and re-encode images entirely in memory, and relay README
//! generation requests to a chat-completion service.
//!
//! # Architecture: One Run, Four Steps
//!
//! A compression run takes the current source and a snapshot of the
//! current settings through four steps:
//!
//! ```text
//! 1. Decode   bytes + media type  →  surface      (type and size checked first)
//! 2. Plan     natural size + max  →  target size  (aspect kept, never upscaled)
//! 3. Render   surface             →  target surface
//! 4. Encode   target + format + q →  bytes        (PNG quality scaled by 0.9)
//! ```
//!
//! Steps 2 and the quality mapping are pure functions in [`imaging`]; the
//! pixel work sits behind the [`imaging::ImageBackend`] trait so the
//! orchestration in [`session`] is tested against a recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Decode checks, dimension planning, quality mapping, `image`/`webp` backend |
//! | [`session`] | Session state, async runs with last-started-wins ordering, notifications, downloads |
//! | [`naming`] | Download file names and display labels (sizes, widths, quality, savings) |
//! | [`output`] | CLI output formatting |
//! | [`proxy`] | `POST /generate-readme` relay: prompt synthesis, upstream client, routes |
//! | [`config`] | `config.toml` loading, validation, merging, and environment overrides |
//!
//! # Design Decisions
//!
//! ## Last-Started-Wins
//!
//! Settings can change while a run is still encoding. Each run carries a
//! ticket; a completion whose ticket is no longer the latest is discarded,
//! so the displayed result always matches the most recently requested
//! settings regardless of which encode finishes first.
//!
//! ## Blocking Work Off the Runtime
//!
//! Decoding and encoding are CPU bound. They run on tokio's blocking pool and
//! are bounded by a timeout, so a pathological input surfaces as a failed
//! run instead of a hung session.
//!
//! ## Negative Savings Are Reported
//!
//! Re-encoding an already well-compressed file can make it larger. The
//! savings figure is reported as computed, negative values included.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod proxy;
pub mod session;
