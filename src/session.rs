//! Compression orchestration and session state.
//!
//! A [`Session`] owns everything the interactive workflow needs: the current
//! source image, the current settings, and the result that is currently
//! displayed and downloadable. Callers hold a reference to the session and
//! drive it through its methods; there is no ambient state.
//!
//! ## Run Ordering
//!
//! Runs are applied in last-started-wins order. Starting a run takes a
//! snapshot of the settings and a ticket from a monotonically increasing
//! counter. When the run completes, its result is applied only if no newer
//! run (or newer source) has been started in the meantime. Superseded runs
//! are dropped silently, whether they succeeded or failed.
//!
//! ```text
//! start A (S1) ─────────────────────────────▶ done: stale, dropped
//!        start B (S2) ──────────▶ done: applied
//! ```
//!
//! ## Failure
//!
//! Any failure inside a run surfaces as [`CompressionFailed`] carrying the
//! cause. The previously applied result stays in place; nothing is retried.
//!
//! ## Notifications
//!
//! When a notifier is attached, user-facing messages are sent over a
//! `std::sync::mpsc` channel as [`Notification`]s. Send errors (the UI went
//! away) are ignored.

use crate::imaging::operations::{compress_image, decode_source};
use crate::imaging::{
    DEFAULT_MAX_INPUT_BYTES, Dimensions, ImageBackend, ImagingError, OutputFormat, clamp_max_width,
    effective_quality, savings_percent,
};
use crate::naming::{download_file_name, format_file_size};
use chrono::Utc;
use std::future::Future;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_QUALITY: f32 = 0.8;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("worker stopped: {0}")]
    Interrupted(String),
    #[error("no image loaded")]
    NoSource,
    #[error("no compressed image available")]
    NoResult,
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

impl SessionError {
    /// Message suitable for the notification surface.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Imaging(ImagingError::UnsupportedInput { .. }) => {
                "Please select a valid image file".to_string()
            }
            SessionError::Imaging(ImagingError::OversizeInput { limit, .. }) => {
                format!("Please select an image smaller than {}", size_limit_label(*limit))
            }
            SessionError::Imaging(ImagingError::Decode(_)) => "Error loading image".to_string(),
            SessionError::Imaging(other) => other.to_string(),
            SessionError::TimedOut(_) => "Compression timed out".to_string(),
            SessionError::Interrupted(_) => "Compression was interrupted".to_string(),
            SessionError::NoSource => "No image loaded".to_string(),
            SessionError::NoResult => "No compressed image available".to_string(),
            SessionError::Read(_) => "Error reading file".to_string(),
        }
    }
}

/// `10485760` → `10MB`; limits that are not whole mebibytes fall back to
/// the regular size label.
fn size_limit_label(limit: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format_file_size(limit)
    }
}

/// The single error type of an orchestrated run.
#[derive(Error, Debug)]
#[error("Compression failed: {cause}")]
pub struct CompressionFailed {
    #[source]
    pub cause: SessionError,
}

impl From<SessionError> for CompressionFailed {
    fn from(cause: SessionError) -> Self {
        Self { cause }
    }
}

impl From<ImagingError> for CompressionFailed {
    fn from(e: ImagingError) -> Self {
        SessionError::Imaging(e).into()
    }
}

/// A user-uploaded original. Replaced wholesale on the next load.
#[derive(Debug, PartialEq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
}

impl SourceImage {
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The user's current choices. Copied into each run at start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSettings {
    pub format: OutputFormat,
    /// Slider value in `0.0..=1.0`.
    pub quality: f32,
    /// At the natural width this means "no downscale".
    pub max_width: u32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
            max_width: u32::MAX,
        }
    }
}

/// Output of one compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub original_bytes: u64,
    /// Ticket of the run that produced this result.
    pub run: u64,
}

impl CompressedResult {
    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `100 × (1 − output/original)`; negative when the output grew.
    pub fn savings_percent(&self) -> f64 {
        savings_percent(self.original_bytes, self.byte_size())
    }
}

/// Limits applied to every load and run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub max_input_bytes: u64,
    pub timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            ttl: NOTIFICATION_TTL,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            ttl: NOTIFICATION_TTL,
        }
    }
}

/// What happened to a run that completed without error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The result is now the session's current result.
    Applied(Arc<CompressedResult>),
    /// A newer run or source was started first; the output was discarded.
    Superseded { run: u64 },
}

/// What happened to a source load that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The image is now the session's source.
    Loaded(Arc<SourceImage>),
    /// A newer load (or a reset) was started first; the image was discarded.
    Superseded { load: u64 },
}

impl LoadOutcome {
    /// The installed source, if this load won.
    pub fn source(&self) -> Option<&Arc<SourceImage>> {
        match self {
            LoadOutcome::Loaded(source) => Some(source),
            LoadOutcome::Superseded { .. } => None,
        }
    }
}

/// A downloadable copy of the current result.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub result: Arc<CompressedResult>,
}

impl Download {
    pub fn media_type(&self) -> &'static str {
        self.result.media_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.result.bytes
    }
}

/// Run one compression: decode → plan → render → encode → measure.
///
/// The pixel work runs on the blocking pool and is bounded by `timeout`.
/// On expiry the run is reported as failed; the blocking task itself is
/// left to finish and its output is discarded.
pub async fn compress<B>(
    backend: Arc<B>,
    source: Arc<SourceImage>,
    settings: CompressionSettings,
    timeout: Duration,
) -> Result<CompressedResult, CompressionFailed>
where
    B: ImageBackend + 'static,
{
    let original_bytes = source.byte_size();
    let task = tokio::task::spawn_blocking(move || {
        compress_image(
            backend.as_ref(),
            &source.bytes,
            settings.format,
            settings.quality,
            settings.max_width,
        )
    });

    let encoded = match tokio::time::timeout(timeout, task).await {
        Err(_) => return Err(SessionError::TimedOut(timeout).into()),
        Ok(Err(join)) => return Err(SessionError::Interrupted(join.to_string()).into()),
        Ok(Ok(result)) => result?,
    };

    Ok(CompressedResult {
        bytes: encoded.bytes,
        format: encoded.format,
        width: encoded.width,
        height: encoded.height,
        original_bytes,
        run: 0,
    })
}

#[derive(Debug, Default)]
struct SessionState {
    source: Option<Arc<SourceImage>>,
    settings: CompressionSettings,
    result: Option<Arc<CompressedResult>>,
    latest_run: u64,
    latest_load: u64,
}

/// Interactive compression session. See the [module docs](self).
pub struct Session<B> {
    backend: Arc<B>,
    options: SessionOptions,
    state: Mutex<SessionState>,
    notifier: Option<Sender<Notification>>,
}

impl<B> Session<B>
where
    B: ImageBackend + 'static,
{
    pub fn new(backend: B, options: SessionOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
            state: Mutex::new(SessionState::default()),
            notifier: None,
        }
    }

    /// Start from `settings` instead of the stock defaults.
    pub fn with_settings(self, settings: CompressionSettings) -> Self {
        self.state().settings = settings;
        self
    }

    pub fn with_notifier(mut self, tx: Sender<Notification>) -> Self {
        self.notifier = Some(tx);
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notification: Notification) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(notification);
        }
    }

    // =========================================================================
    // Source
    // =========================================================================

    /// Check, decode and install a new source image.
    ///
    /// On success the max width resets to the natural width, the previous
    /// result is cleared, and runs still in flight become stale. On failure
    /// the session is unchanged.
    ///
    /// Loads follow the same last-started-wins rule as runs: the ticket is
    /// taken when this is called, and a load overtaken by a newer one (or by
    /// [`reset`](Self::reset)) resolves to [`LoadOutcome::Superseded`]
    /// whether it decoded or not, without notifying.
    pub fn load_source<'a>(
        &'a self,
        bytes: Vec<u8>,
        media_type: &'a str,
    ) -> impl Future<Output = Result<LoadOutcome, SessionError>> + Send + 'a {
        let ticket = {
            let mut state = self.state();
            state.latest_load += 1;
            state.latest_load
        };
        async move {
            let decoded = self.decode(bytes, media_type).await;
            self.finish_load(ticket, media_type, decoded)
        }
    }

    /// Read `path` and load it as a source declared as `media_type`.
    ///
    /// A read failure is reported like any other load failure.
    pub async fn load_path(
        &self,
        path: &Path,
        media_type: &str,
    ) -> Result<LoadOutcome, SessionError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => self.load_source(bytes, media_type).await,
            Err(e) => {
                let e = SessionError::from(e);
                warn!(path = %path.display(), "failed to read source: {}", e);
                self.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    async fn decode(
        &self,
        bytes: Vec<u8>,
        media_type: &str,
    ) -> Result<(Vec<u8>, Dimensions), SessionError> {
        let backend = Arc::clone(&self.backend);
        let max_bytes = self.options.max_input_bytes;
        let media = media_type.to_string();
        let task = tokio::task::spawn_blocking(move || {
            decode_source(backend.as_ref(), &bytes, &media, max_bytes).map(|dims| (bytes, dims))
        });

        match tokio::time::timeout(self.options.timeout, task).await {
            Err(_) => Err(SessionError::TimedOut(self.options.timeout)),
            Ok(Err(join)) => Err(SessionError::Interrupted(join.to_string())),
            Ok(Ok(result)) => result.map_err(SessionError::from),
        }
    }

    fn finish_load(
        &self,
        ticket: u64,
        media_type: &str,
        decoded: Result<(Vec<u8>, Dimensions), SessionError>,
    ) -> Result<LoadOutcome, SessionError> {
        let mut state = self.state();
        if state.latest_load != ticket {
            drop(state);
            match &decoded {
                Ok(_) => warn!(load = ticket, "dropping superseded source"),
                Err(e) => warn!(load = ticket, "dropping superseded load failure: {}", e),
            }
            return Ok(LoadOutcome::Superseded { load: ticket });
        }

        let (bytes, dims) = match decoded {
            Ok(ok) => ok,
            Err(e) => {
                drop(state);
                warn!("failed to load source: {}", e);
                self.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        let source = Arc::new(SourceImage {
            bytes,
            media_type: media_type.to_string(),
            width: dims.width,
            height: dims.height,
        });
        state.source = Some(Arc::clone(&source));
        state.settings.max_width = dims.width;
        state.result = None;
        state.latest_run += 1;
        drop(state);
        info!(
            width = dims.width,
            height = dims.height,
            bytes = source.byte_size(),
            "source loaded"
        );
        Ok(LoadOutcome::Loaded(source))
    }

    pub fn source(&self) -> Option<Arc<SourceImage>> {
        self.state().source.clone()
    }

    /// Drop the source and result; in-flight work becomes stale.
    pub fn reset(&self) {
        let mut state = self.state();
        state.source = None;
        state.result = None;
        state.latest_run += 1;
        state.latest_load += 1;
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn settings(&self) -> CompressionSettings {
        self.state().settings
    }

    pub fn set_format(&self, format: OutputFormat) {
        self.state().settings.format = format;
    }

    /// Set the slider quality; values outside `0.0..=1.0` are rejected.
    pub fn set_quality(&self, quality: f32) -> Result<(), ImagingError> {
        effective_quality(OutputFormat::Jpeg, quality)?;
        self.state().settings.quality = quality;
        Ok(())
    }

    /// Set the max width, clamped to `[1, natural width]` once a source is
    /// loaded. Returns the stored value.
    pub fn set_max_width(&self, max_width: u32) -> u32 {
        let mut state = self.state();
        let clamped = match &state.source {
            Some(source) => clamp_max_width(max_width, source.width),
            None => max_width.max(1),
        };
        state.settings.max_width = clamped;
        clamped
    }

    // =========================================================================
    // Runs
    // =========================================================================

    pub fn current_result(&self) -> Option<Arc<CompressedResult>> {
        self.state().result.clone()
    }

    /// Start a compression run with the current source and settings.
    ///
    /// The ticket and settings snapshot are taken when this is called, not
    /// when the returned future is first polled.
    pub fn compress(
        &self,
    ) -> impl Future<Output = Result<RunOutcome, CompressionFailed>> + Send + '_ {
        let begun = self.begin_run();
        async move {
            let (run, source, settings) = begun?;
            debug!(run, ?settings, "run started");
            let outcome = compress(
                Arc::clone(&self.backend),
                source,
                settings,
                self.options.timeout,
            )
            .await;
            self.finish_run(run, outcome)
        }
    }

    fn begin_run(
        &self,
    ) -> Result<(u64, Arc<SourceImage>, CompressionSettings), CompressionFailed> {
        let mut state = self.state();
        let source = state.source.clone().ok_or(SessionError::NoSource)?;
        state.latest_run += 1;
        Ok((state.latest_run, source, state.settings))
    }

    fn finish_run(
        &self,
        run: u64,
        outcome: Result<CompressedResult, CompressionFailed>,
    ) -> Result<RunOutcome, CompressionFailed> {
        let mut state = self.state();
        if state.latest_run != run {
            drop(state);
            match &outcome {
                Ok(_) => warn!(run, "dropping superseded result"),
                Err(e) => warn!(run, "dropping superseded failure: {}", e),
            }
            return Ok(RunOutcome::Superseded { run });
        }

        match outcome {
            Ok(mut result) => {
                result.run = run;
                let result = Arc::new(result);
                state.result = Some(Arc::clone(&result));
                drop(state);
                info!(
                    run,
                    format = %result.format,
                    width = result.width,
                    height = result.height,
                    bytes = result.byte_size(),
                    savings = result.savings_percent(),
                    "run applied"
                );
                self.notify(Notification::success("Image compressed successfully!"));
                Ok(RunOutcome::Applied(result))
            }
            Err(e) => {
                drop(state);
                warn!(run, "{}", e);
                self.notify(Notification::error(e.cause.user_message()));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Download
    // =========================================================================

    /// Hand out the current result under a timestamped file name.
    ///
    /// The extension follows the format the result was encoded with, which
    /// may differ from the currently selected format.
    pub fn download(&self) -> Result<Download, SessionError> {
        let Some(result) = self.current_result() else {
            let e = SessionError::NoResult;
            self.notify(Notification::error(e.user_message()));
            return Err(e);
        };
        let file_name = download_file_name(result.format, Utc::now());
        self.notify(Notification::success("Download started!"));
        Ok(Download { file_name, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, mock_image};
    use std::sync::mpsc::{Receiver, channel};

    fn session_with(backend: MockBackend) -> (Session<MockBackend>, Receiver<Notification>) {
        let (tx, rx) = channel();
        let session = Session::new(backend, SessionOptions::default()).with_notifier(tx);
        (session, rx)
    }

    fn drain(rx: &Receiver<Notification>) -> Vec<Notification> {
        rx.try_iter().collect()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[tokio::test]
    async fn load_resets_max_width_to_natural() {
        let (session, _rx) = session_with(MockBackend::new());
        session.set_max_width(50);
        let source = session
            .load_source(mock_image(1600, 900), "image/png")
            .await
            .unwrap();
        let source = source.source().unwrap();
        assert_eq!((source.width, source.height), (1600, 900));
        assert_eq!(session.settings().max_width, 1600);
    }

    #[tokio::test]
    async fn load_non_image_notifies_and_keeps_state() {
        let (session, rx) = session_with(MockBackend::new());
        let result = session.load_source(mock_image(10, 10), "text/plain").await;
        assert!(matches!(
            result,
            Err(SessionError::Imaging(ImagingError::UnsupportedInput { .. }))
        ));
        assert!(session.source().is_none());
        assert_eq!(
            drain(&rx),
            vec![Notification::error("Please select a valid image file")]
        );
    }

    #[tokio::test]
    async fn load_oversize_names_limit() {
        let (tx, rx) = channel();
        let options = SessionOptions {
            max_input_bytes: 32,
            ..SessionOptions::default()
        };
        let session = Session::new(MockBackend::new(), options).with_notifier(tx);
        let result = session.load_source(mock_image(10, 10), "image/jpeg").await;
        assert!(matches!(
            result,
            Err(SessionError::Imaging(ImagingError::OversizeInput { size: 64, limit: 32 }))
        ));
        assert_eq!(
            drain(&rx)[0].message,
            "Please select an image smaller than 32 B"
        );
    }

    #[tokio::test]
    async fn load_malformed_bytes_is_decode_error() {
        let (session, rx) = session_with(MockBackend::new());
        let result = session.load_source(vec![1, 2, 3], "image/jpeg").await;
        assert!(matches!(
            result,
            Err(SessionError::Imaging(ImagingError::Decode(_)))
        ));
        assert_eq!(drain(&rx)[0].message, "Error loading image");
    }

    #[tokio::test]
    async fn slow_older_load_is_superseded() {
        let backend = MockBackend::new().with_decode_delay(1000, Duration::from_millis(300));
        let (session, rx) = session_with(backend);

        let older = session.load_source(mock_image(1000, 800), "image/jpeg");
        let newer = session.load_source(mock_image(20, 10), "image/png");
        let (older, newer) = tokio::join!(older, newer);

        assert!(matches!(older.unwrap(), LoadOutcome::Superseded { load: 1 }));
        assert_eq!(newer.unwrap().source().unwrap().width, 20);
        assert_eq!(session.source().unwrap().width, 20);
        assert_eq!(session.settings().max_width, 20);
        assert!(drain(&rx).is_empty());
    }

    #[tokio::test]
    async fn superseded_load_failure_is_silent() {
        let backend = MockBackend::new()
            .with_decode_delay(1000, Duration::from_millis(300))
            .with_decode_failure(1000);
        let (session, rx) = session_with(backend);

        let older = session.load_source(mock_image(1000, 800), "image/jpeg");
        let newer = session.load_source(mock_image(20, 10), "image/png");
        let (older, newer) = tokio::join!(older, newer);

        assert!(matches!(older, Ok(LoadOutcome::Superseded { .. })));
        assert!(matches!(newer, Ok(LoadOutcome::Loaded(_))));
        assert_eq!(session.source().unwrap().width, 20);
        assert!(drain(&rx).is_empty());
    }

    #[tokio::test]
    async fn reset_supersedes_pending_load() {
        let backend = MockBackend::new().with_decode_delay(300, Duration::from_millis(200));
        let (session, _rx) = session_with(backend);

        let load = session.load_source(mock_image(300, 200), "image/jpeg");
        session.reset();
        assert!(matches!(load.await, Ok(LoadOutcome::Superseded { .. })));
        assert!(session.source().is_none());
    }

    #[tokio::test]
    async fn unreadable_path_notifies() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (session, rx) = session_with(MockBackend::new());
        let result = session
            .load_path(&tmp.path().join("missing.jpg"), "image/jpeg")
            .await;
        assert!(matches!(result, Err(SessionError::Read(_))));
        assert!(session.source().is_none());
        assert_eq!(
            drain(&rx),
            vec![Notification::error("Error reading file")]
        );
    }

    #[tokio::test]
    async fn load_path_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, mock_image(640, 480)).unwrap();
        let (session, _rx) = session_with(MockBackend::new());
        let outcome = session.load_path(&path, "image/jpeg").await.unwrap();
        assert_eq!(outcome.source().unwrap().height, 480);
    }

    #[test]
    fn oversize_label_uses_whole_megabytes() {
        assert_eq!(size_limit_label(DEFAULT_MAX_INPUT_BYTES), "10MB");
        assert_eq!(size_limit_label(1536), "1.50 KB");
    }

    // =========================================================================
    // Settings
    // =========================================================================

    #[tokio::test]
    async fn max_width_is_clamped_to_source() {
        let (session, _rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(800, 600), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(session.set_max_width(0), 1);
        assert_eq!(session.set_max_width(10_000), 800);
        assert_eq!(session.set_max_width(400), 400);
    }

    #[test]
    fn quality_setter_validates() {
        let (session, _rx) = session_with(MockBackend::new());
        assert!(session.set_quality(0.35).is_ok());
        assert!(matches!(
            session.set_quality(1.1),
            Err(ImagingError::InvalidQuality(_))
        ));
        assert!(matches!(
            session.set_quality(-0.1),
            Err(ImagingError::InvalidQuality(_))
        ));
        assert_eq!(session.settings().quality, 0.35);
    }

    // =========================================================================
    // Runs
    // =========================================================================

    #[tokio::test]
    async fn compress_without_source_fails() {
        let (session, _rx) = session_with(MockBackend::new());
        let err = session.compress().await.unwrap_err();
        assert!(matches!(err.cause, SessionError::NoSource));
    }

    #[tokio::test]
    async fn compress_applies_result_and_notifies() {
        let (session, rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(4000, 3000), "image/jpeg")
            .await
            .unwrap();
        session.set_max_width(2000);

        let outcome = session.compress().await.unwrap();
        let RunOutcome::Applied(result) = outcome else {
            panic!("expected applied run, got {outcome:?}");
        };
        assert_eq!((result.width, result.height), (2000, 1500));
        assert_eq!(result.media_type(), "image/jpeg");
        assert_eq!(result.original_bytes, 64);
        assert!(result.savings_percent().is_finite());
        assert_eq!(session.current_result(), Some(result));
        assert_eq!(
            drain(&rx),
            vec![Notification::success("Image compressed successfully!")]
        );
    }

    #[tokio::test]
    async fn natural_width_run_encodes_without_render() {
        let backend = MockBackend::new();
        let (session, _rx) = session_with(backend);
        session
            .load_source(mock_image(300, 200), "image/png")
            .await
            .unwrap();
        session.compress().await.unwrap();
        let ops = session.backend.get_operations();
        assert!(!ops.iter().any(|op| matches!(op, RecordedOp::Render { .. })));
    }

    #[tokio::test]
    async fn png_run_uses_scaled_quality() {
        let (session, _rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(100, 100), "image/png")
            .await
            .unwrap();
        session.set_format(OutputFormat::Png);
        session.set_quality(1.0).unwrap();
        session.compress().await.unwrap();
        let ops = session.backend.get_operations();
        assert!(matches!(
            ops.last(),
            Some(RecordedOp::Encode {
                format: OutputFormat::Png,
                quality,
                ..
            }) if *quality == 0.9
        ));
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let (session, _rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(640, 480), "image/jpeg")
            .await
            .unwrap();
        let first = session.compress().await.unwrap();
        let second = session.compress().await.unwrap();
        let (RunOutcome::Applied(a), RunOutcome::Applied(b)) = (first, second) else {
            panic!("both runs should apply");
        };
        assert_eq!(a.bytes, b.bytes);
        assert!(b.run > a.run);
    }

    #[tokio::test]
    async fn slow_older_run_is_suppressed() {
        let backend = MockBackend::new().with_delay(OutputFormat::Jpeg, Duration::from_millis(300));
        let (session, _rx) = session_with(backend);
        session
            .load_source(mock_image(1000, 800), "image/jpeg")
            .await
            .unwrap();

        session.set_format(OutputFormat::Jpeg);
        let run_a = session.compress();
        session.set_format(OutputFormat::Png);
        let run_b = session.compress();

        let (a, b) = tokio::join!(run_a, run_b);
        assert!(matches!(a.unwrap(), RunOutcome::Superseded { .. }));
        assert!(matches!(b.unwrap(), RunOutcome::Applied(_)));
        assert_eq!(session.current_result().unwrap().format, OutputFormat::Png);
    }

    #[tokio::test]
    async fn fast_older_run_is_suppressed_too() {
        let backend = MockBackend::new().with_delay(OutputFormat::Png, Duration::from_millis(300));
        let (session, rx) = session_with(backend);
        session
            .load_source(mock_image(1000, 800), "image/jpeg")
            .await
            .unwrap();

        session.set_format(OutputFormat::Jpeg);
        let run_a = session.compress();
        session.set_format(OutputFormat::Png);
        let run_b = session.compress();

        let (a, b) = tokio::join!(run_a, run_b);
        assert!(matches!(a.unwrap(), RunOutcome::Superseded { .. }));
        assert!(matches!(b.unwrap(), RunOutcome::Applied(_)));
        assert_eq!(session.current_result().unwrap().format, OutputFormat::Png);
        // Only the applied run reports success
        assert_eq!(drain(&rx).len(), 1);
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_result() {
        let backend = MockBackend::new().with_failure(OutputFormat::Webp);
        let (session, rx) = session_with(backend);
        session
            .load_source(mock_image(500, 500), "image/jpeg")
            .await
            .unwrap();
        let RunOutcome::Applied(good) = session.compress().await.unwrap() else {
            panic!("first run should apply");
        };

        session.set_format(OutputFormat::Webp);
        let err = session.compress().await.unwrap_err();
        assert!(matches!(
            err.cause,
            SessionError::Imaging(ImagingError::Encode { .. })
        ));
        assert_eq!(session.current_result(), Some(good));

        let notes = drain(&rx);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn run_exceeding_timeout_fails() {
        let (tx, _rx) = channel();
        let options = SessionOptions {
            timeout: Duration::from_millis(100),
            ..SessionOptions::default()
        };
        let backend = MockBackend::new().with_delay(OutputFormat::Jpeg, Duration::from_millis(500));
        let session = Session::new(backend, options).with_notifier(tx);
        session
            .load_source(mock_image(10, 10), "image/jpeg")
            .await
            .unwrap();
        let err = session.compress().await.unwrap_err();
        assert!(matches!(err.cause, SessionError::TimedOut(_)));
        assert!(session.current_result().is_none());
    }

    #[tokio::test]
    async fn new_source_makes_inflight_run_stale() {
        let backend = MockBackend::new().with_delay(OutputFormat::Jpeg, Duration::from_millis(300));
        let (session, _rx) = session_with(backend);
        session
            .load_source(mock_image(1000, 800), "image/jpeg")
            .await
            .unwrap();

        let run = session.compress();
        let load = session.load_source(mock_image(20, 10), "image/png");
        let (run, load) = tokio::join!(run, load);

        assert!(matches!(run.unwrap(), RunOutcome::Superseded { .. }));
        assert_eq!(load.unwrap().source().unwrap().width, 20);
        assert!(session.current_result().is_none());
        assert_eq!(session.settings().max_width, 20);
    }

    #[tokio::test]
    async fn reset_clears_source_and_result() {
        let (session, _rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(64, 64), "image/jpeg")
            .await
            .unwrap();
        session.compress().await.unwrap();
        session.reset();
        assert!(session.source().is_none());
        assert!(session.current_result().is_none());
    }

    // =========================================================================
    // Download
    // =========================================================================

    #[tokio::test]
    async fn download_without_result_notifies() {
        let (session, rx) = session_with(MockBackend::new());
        assert!(matches!(session.download(), Err(SessionError::NoResult)));
        assert_eq!(
            drain(&rx),
            vec![Notification::error("No compressed image available")]
        );
    }

    #[tokio::test]
    async fn download_uses_result_format() {
        let (session, rx) = session_with(MockBackend::new());
        session
            .load_source(mock_image(64, 64), "image/jpeg")
            .await
            .unwrap();
        session.set_format(OutputFormat::Webp);
        session.compress().await.unwrap();
        // Changing the selection afterwards does not rename the download
        session.set_format(OutputFormat::Png);

        let download = session.download().unwrap();
        assert!(download.file_name.starts_with("compressed-"));
        assert!(download.file_name.ends_with(".webp"));
        assert_eq!(download.media_type(), "image/webp");
        assert!(!download.bytes().is_empty());
        assert_eq!(
            drain(&rx).last(),
            Some(&Notification::success("Download started!"))
        );
    }

    #[test]
    fn compression_failed_wraps_cause() {
        let err = CompressionFailed::from(ImagingError::InvalidDimension(0));
        assert!(err.to_string().starts_with("Compression failed:"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
