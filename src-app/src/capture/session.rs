//! Single-frame capture session.
//!
//! A session opens a stream for the target display, waits for the first
//! frame (racing a fixed deadline and cancellation), stops the stream and
//! crops the frame to the requested region. Only one attempt may be live per
//! session at a time.

use super::error::CaptureError;
use super::process::crop_and_scale;
use super::types::{CapturedFrame, StopHandle};
use super::CaptureBackend;
use extshot_types::CaptureRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

/// How long to wait for the first frame after a capture starts.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture has been attempted yet
    Idle,
    /// Checking displays and permission, opening the stream
    Starting,
    /// Stream is open, waiting for a frame
    Streaming,
    /// A frame was accepted and the stream stopped
    FrameReceived,
    /// Cropping and scaling the frame
    Finalizing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::TimedOut
                | SessionState::Cancelled
        )
    }

    /// True while an attempt is in flight.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle) && !self.is_terminal()
    }

    fn accepts_cancel(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Streaming)
    }

    fn from_result(result: &Result<CapturedFrame, CaptureError>) -> Self {
        match result {
            Ok(_) => SessionState::Completed,
            Err(CaptureError::CaptureTimeout) => SessionState::TimedOut,
            Err(CaptureError::Cancelled) => SessionState::Cancelled,
            Err(_) => SessionState::Failed,
        }
    }
}

/// Cancels one capture attempt from outside the session.
///
/// The handle can be created and used before the attempt is spawned, so a
/// cancel issued right after a selection is confirmed is never lost.
#[derive(Debug)]
pub struct CancelHandle(oneshot::Sender<()>);

impl CancelHandle {
    /// Returns false if the attempt has already ended.
    pub fn cancel(self) -> bool {
        self.0.send(()).is_ok()
    }
}

/// Receiving side of a [`CancelHandle`]. Dropping the handle without
/// cancelling leaves the attempt running.
#[derive(Debug)]
pub struct CancelSignal(Option<oneshot::Receiver<()>>);

impl CancelSignal {
    fn is_cancelled(&mut self) -> bool {
        let Some(rx) = self.0.as_mut() else {
            return false;
        };
        match rx.try_recv() {
            Ok(()) => {
                self.0 = None;
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.0 = None;
                false
            }
        }
    }

    /// Resolves on cancellation; pending forever if the handle was dropped.
    async fn cancelled(&mut self) {
        if let Some(rx) = self.0.as_mut() {
            let result = rx.await;
            self.0 = None;
            if result.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Create a linked cancel handle and signal for
/// [`CaptureSession::begin_capture_with`].
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle(tx), CancelSignal(Some(rx)))
}

/// Both ways an attempt can be cancelled: [`CaptureSession::cancel`] and the
/// caller's own handle.
struct Cancellation {
    session: CancelSignal,
    caller: CancelSignal,
}

impl Cancellation {
    fn is_cancelled(&mut self) -> bool {
        self.session.is_cancelled() || self.caller.is_cancelled()
    }

    async fn cancelled(&mut self) {
        tokio::select! {
            _ = self.session.cancelled() => {}
            _ = self.caller.cancelled() => {}
        }
    }
}

struct Inner {
    state: SessionState,
    /// Taken exactly once, by `cancel` or when the attempt ends.
    cancel: Option<CancelHandle>,
}

/// Drives capture attempts against a [`CaptureBackend`].
pub struct CaptureSession {
    backend: Arc<dyn CaptureBackend>,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl CaptureSession {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            timeout: CAPTURE_TIMEOUT,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                cancel: None,
            }),
        }
    }

    /// Get the current session state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Capture `request`, resolving once with the cropped frame or the
    /// reason the attempt ended.
    ///
    /// Fails immediately with [`CaptureError::AlreadyInProgress`] if another
    /// attempt on this session has not reached a terminal state.
    pub async fn begin_capture(
        &self,
        request: CaptureRequest,
    ) -> Result<CapturedFrame, CaptureError> {
        let (_handle, signal) = cancel_pair();
        self.begin_capture_with(request, signal).await
    }

    /// Like [`begin_capture`](Self::begin_capture), but also ends with
    /// [`CaptureError::Cancelled`] once the [`CancelHandle`] paired with
    /// `cancel` fires, including when it fired before this call.
    pub async fn begin_capture_with(
        &self,
        request: CaptureRequest,
        cancel: CancelSignal,
    ) -> Result<CapturedFrame, CaptureError> {
        let mut cancellation = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_active() {
                warn!("Capture requested while another is in progress");
                return Err(CaptureError::AlreadyInProgress);
            }
            let (handle, signal) = cancel_pair();
            inner.state = SessionState::Starting;
            inner.cancel = Some(handle);
            Cancellation {
                session: signal,
                caller: cancel,
            }
        };

        let result = self.run(request, &mut cancellation).await;

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::from_result(&result);
        inner.cancel = None;
        match &result {
            Ok(frame) => info!(
                "Capture completed: {}x{} ({})",
                frame.width(),
                frame.height(),
                frame.preset
            ),
            Err(CaptureError::Cancelled) => info!("Capture cancelled"),
            Err(e) => warn!("Capture failed: {}", e),
        }
        result
    }

    /// Cancel the attempt in flight.
    ///
    /// Only honoured while starting or streaming; returns whether a
    /// cancellation was delivered. Calling it again is a no-op.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.accepts_cancel() {
            return false;
        }
        match inner.cancel.take() {
            Some(handle) => {
                debug!("Cancelling capture in state {:?}", inner.state);
                handle.cancel()
            }
            None => false,
        }
    }

    async fn set_state(&self, state: SessionState) {
        let mut inner = self.inner.lock().await;
        debug!("Capture session {:?} -> {:?}", inner.state, state);
        inner.state = state;
    }

    async fn run(
        &self,
        request: CaptureRequest,
        cancellation: &mut Cancellation,
    ) -> Result<CapturedFrame, CaptureError> {
        let deadline = Instant::now() + self.timeout;
        if cancellation.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }

        let displays = self.backend.list_displays().map_err(|e| {
            warn!("Display enumeration failed: {}", e);
            CaptureError::NoDisplayFound
        })?;
        let target = displays
            .into_iter()
            .find(|d| d.id == request.display_id())
            .ok_or(CaptureError::NoDisplayFound)?;

        if !self.backend.has_permission() {
            return Err(CaptureError::PermissionDenied);
        }

        let rect = request.rect();
        if rect.is_empty() {
            return Err(CaptureError::InvalidRegion(format!(
                "{}x{} selection has no area",
                rect.width, rect.height
            )));
        }

        if cancellation.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }

        let display_id = target.id;
        info!(
            "Starting capture of display {} region {}x{} at ({}, {})",
            display_id, rect.width, rect.height, rect.x, rect.y
        );
        let (mut frames, stop) = self.backend.start_display_capture(&target)?;
        self.set_state(SessionState::Streaming).await;

        let received = tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(CaptureError::Cancelled),
            frame = frames.recv() => frame.ok_or_else(|| {
                CaptureError::StreamOpenFailed(
                    "stream ended or failed before delivering a frame".to_string(),
                )
            }),
            _ = time::sleep_until(deadline) => Err(CaptureError::CaptureTimeout),
        };
        stop_stream(stop);
        // Later frames are dropped with the receiver.
        drop(frames);

        let frame = received?;
        self.set_state(SessionState::FrameReceived).await;
        debug!("Received {}x{} frame", frame.width, frame.height);

        self.set_state(SessionState::Finalizing).await;
        let preset = request.preset();
        tokio::task::spawn_blocking(move || crop_and_scale(&frame, rect, preset))
            .await
            .map_err(|e| CaptureError::InvalidRegion(format!("frame processing task failed: {}", e)))?
    }
}

fn stop_stream(stop: StopHandle) {
    debug!("Stopping capture stream");
    stop.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::error::EnumerationError;
    use crate::capture::test_support::{test_display, FakeBackend, FrameScript};
    use crate::capture::types::FrameReceiver;
    use extshot_types::{DisplayInfo, PixelRect, PresetSize};
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex as StdMutex;

    fn request(rect: PixelRect, preset: PresetSize) -> CaptureRequest {
        CaptureRequest::new(rect, 1, preset)
    }

    /// Blocks inside `start_display_capture` until released.
    struct GatedBackend {
        inner: FakeBackend,
        entered: StdMutex<std_mpsc::Sender<()>>,
        release: StdMutex<std_mpsc::Receiver<()>>,
    }

    impl CaptureBackend for GatedBackend {
        fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
            self.inner.list_displays()
        }

        fn has_permission(&self) -> bool {
            self.inner.has_permission()
        }

        fn request_permission(&self) {}

        fn start_display_capture(
            &self,
            display: &DisplayInfo,
        ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.inner.start_display_capture(display)
        }
    }

    // The fake display is 640x400 points at scale 2.
    fn large_request() -> CaptureRequest {
        request(PixelRect::new(0, 0, 1280, 800), PresetSize::LARGE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_frame_completes_and_stops_once() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(3)));
        let session = CaptureSession::new(backend.clone());

        let frame = session.begin_capture(large_request()).await.unwrap();

        assert_eq!((frame.width(), frame.height()), (1280, 800));
        assert_eq!(backend.stop_count(), 1);
        assert_eq!(backend.open_count(), 1);
        assert_eq!(session.state().await, SessionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_preset_keeps_device_pixels() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend);

        let frame = session
            .begin_capture(request(PixelRect::new(100, 100, 640, 400), PresetSize::SMALL))
            .await
            .unwrap();

        assert_eq!((frame.width(), frame.height()), (640, 400));
        assert_eq!(frame.preset, PresetSize::SMALL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frame_times_out_and_stops_once() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Silent));
        let session = CaptureSession::new(backend.clone());
        let started = Instant::now();

        let err = session.begin_capture(large_request()).await.unwrap_err();

        assert_eq!(err, CaptureError::CaptureTimeout);
        assert!(started.elapsed() >= CAPTURE_TIMEOUT);
        assert_eq!(backend.stop_count(), 1);
        assert_eq!(session.state().await, SessionState::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ending_without_frame_fails() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Closed));
        let session = CaptureSession::new(backend.clone());

        let err = session.begin_capture(large_request()).await.unwrap_err();

        assert!(matches!(err, CaptureError::StreamOpenFailed(_)));
        assert_eq!(backend.stop_count(), 1);
        assert_eq!(session.state().await, SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_is_reported() {
        let backend = Arc::new(FakeBackend::new(FrameScript::OpenFails));
        let session = CaptureSession::new(backend.clone());

        let err = session.begin_capture(large_request()).await.unwrap_err();

        assert!(matches!(err, CaptureError::StreamOpenFailed(_)));
        assert_eq!(backend.stop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_never_opens_stream() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)).without_permission());
        let session = CaptureSession::new(backend.clone());

        let err = session.begin_capture(large_request()).await.unwrap_err();

        assert_eq!(err, CaptureError::PermissionDenied);
        assert_eq!(backend.open_count(), 0);
        assert_eq!(session.state().await, SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_display() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)).with_displays(vec![]));
        let session = CaptureSession::new(backend);

        let err = session.begin_capture(large_request()).await.unwrap_err();
        assert_eq!(err, CaptureError::NoDisplayFound);

        let mut other = test_display();
        other.id = 9;
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)).with_displays(vec![other]));
        let session = CaptureSession::new(backend);
        let err = session.begin_capture(large_request()).await.unwrap_err();
        assert_eq!(err, CaptureError::NoDisplayFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_region_rejected() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend.clone());

        let err = session
            .begin_capture(request(PixelRect::new(0, 0, 0, 800), PresetSize::LARGE))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::InvalidRegion(_)));
        assert_eq!(backend.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_streaming() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Silent));
        let session = Arc::new(CaptureSession::new(backend.clone()));

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.begin_capture(large_request()).await })
        };
        while session.state().await != SessionState::Streaming {
            tokio::task::yield_now().await;
        }

        assert!(session.cancel().await);
        // Idempotent
        assert!(!session.cancel().await);

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, CaptureError::Cancelled);
        assert_eq!(backend.stop_count(), 1);
        assert_eq!(session.state().await, SessionState::Cancelled);
        assert!(!session.cancel().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_begin_while_active_is_rejected() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Silent));
        let session = Arc::new(CaptureSession::new(backend.clone()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.begin_capture(large_request()).await })
        };
        while session.state().await != SessionState::Streaming {
            tokio::task::yield_now().await;
        }

        let err = session.begin_capture(large_request()).await.unwrap_err();
        assert_eq!(err, CaptureError::AlreadyInProgress);
        assert_eq!(backend.open_count(), 1);

        assert_eq!(first.await.unwrap().unwrap_err(), CaptureError::CaptureTimeout);

        // Terminal again, so a new attempt is accepted.
        backend.set_script(FrameScript::Frames(1));
        assert!(session.begin_capture(large_request()).await.is_ok());
        assert_eq!(backend.stop_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_completion_is_noop() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend.clone());
        session.begin_capture(large_request()).await.unwrap();

        assert!(!session.cancel().await);
        assert_eq!(backend.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_error_fails_before_timeout() {
        let backend = Arc::new(FakeBackend::new(FrameScript::FailsAfter(Duration::from_millis(100))));
        let session = CaptureSession::new(backend.clone());
        let started = Instant::now();

        let err = session.begin_capture(large_request()).await.unwrap_err();

        assert!(matches!(err, CaptureError::StreamOpenFailed(_)));
        assert!(started.elapsed() < CAPTURE_TIMEOUT);
        assert_eq!(backend.stop_count(), 1);
        assert_eq!(session.state().await, SessionState::Failed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_while_starting_leaves_no_stream_open() {
        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let gated = GatedBackend {
            // A frame is already queued when the stream opens.
            inner: FakeBackend::new(FrameScript::Frames(1)),
            entered: StdMutex::new(entered_tx),
            release: StdMutex::new(release_rx),
        };
        let backend = Arc::new(gated);
        let session = Arc::new(CaptureSession::new(backend.clone()));

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.begin_capture(large_request()).await })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap())
            .await
            .unwrap();

        assert_eq!(session.state().await, SessionState::Starting);
        assert!(session.cancel().await);
        release_tx.send(()).unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, CaptureError::Cancelled);
        assert_eq!(session.state().await, SessionState::Cancelled);
        assert_eq!(backend.inner.open_count(), 1);
        assert_eq!(backend.inner.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_cancelled_before_begin() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend.clone());
        let (handle, signal) = cancel_pair();

        assert!(handle.cancel());
        let err = session.begin_capture_with(large_request(), signal).await.unwrap_err();

        assert_eq!(err, CaptureError::Cancelled);
        assert_eq!(backend.open_count(), 0);
        assert_eq!(session.state().await, SessionState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_cancels_while_streaming() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Silent));
        let session = Arc::new(CaptureSession::new(backend.clone()));
        let (handle, signal) = cancel_pair();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.begin_capture_with(large_request(), signal).await })
        };
        while session.state().await != SessionState::Streaming {
            tokio::task::yield_now().await;
        }

        assert!(handle.cancel());
        assert_eq!(task.await.unwrap().unwrap_err(), CaptureError::Cancelled);
        assert_eq!(backend.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_does_not_cancel() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend.clone());
        let (handle, signal) = cancel_pair();
        drop(handle);

        assert!(session.begin_capture_with(large_request(), signal).await.is_ok());
        assert_eq!(session.state().await, SessionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_after_completion_reports_false() {
        let backend = Arc::new(FakeBackend::new(FrameScript::Frames(1)));
        let session = CaptureSession::new(backend);
        let (handle, signal) = cancel_pair();

        session.begin_capture_with(large_request(), signal).await.unwrap();
        assert!(!handle.cancel());
    }
}
