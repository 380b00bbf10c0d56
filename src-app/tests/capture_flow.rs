//! End-to-end capture through the public API: overlay input in, PNG out.

use extshot_lib::capture::{
    CaptureBackend, CaptureError, EnumerationError, FrameReceiver, RawFrame, StopHandle,
};
use extshot_lib::coordinator::{CaptureCoordinator, FeedbackOptions};
use extshot_lib::events::{AppEvent, ChannelSink};
use extshot_lib::feedback::{Notifier, SaveFeedback};
use extshot_lib::overlay::{
    OverlayError, OverlayHost, OverlayId, OverlayInput, OverlayScene, OverlaySurface,
    SurfaceGeometry,
};
use extshot_lib::persist::ImagePersister;
use extshot_types::{DisplayInfo, Point, PresetSize, Rect};
use image::Rgba;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

fn retina() -> DisplayInfo {
    DisplayInfo {
        id: 7,
        name: "Built-in Retina Display".to_string(),
        x: 0.0,
        y: 0.0,
        width: 1920.0,
        height: 1080.0,
        scale_factor: 2.0,
        is_primary: true,
    }
}

/// BGRA frame with B = (x / 16) % 256 and G = (y / 16) % 256.
fn banded_frame(width: u32, height: u32) -> RawFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[((x / 16) % 256) as u8, ((y / 16) % 256) as u8, 0, 0xFF]);
        }
    }
    RawFrame {
        width,
        height,
        data,
    }
}

#[derive(Default)]
struct OneShotBackend {
    stops: Arc<AtomicUsize>,
    keep_open: Mutex<Vec<mpsc::Sender<RawFrame>>>,
}

impl CaptureBackend for OneShotBackend {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>, EnumerationError> {
        Ok(vec![retina()])
    }

    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) {}

    fn start_display_capture(
        &self,
        display: &DisplayInfo,
    ) -> Result<(FrameReceiver, StopHandle), CaptureError> {
        let (tx, rx) = mpsc::channel(1);
        tx.try_send(banded_frame(display.pixel_width(), display.pixel_height()))
            .map_err(|e| CaptureError::StreamOpenFailed(e.to_string()))?;
        self.keep_open.lock().unwrap().push(tx);
        let stops = self.stops.clone();
        Ok((
            rx,
            StopHandle::new(move || {
                stops.fetch_add(1, Ordering::SeqCst);
            }),
        ))
    }
}

struct Surface {
    geometry: SurfaceGeometry,
    closes: Arc<AtomicUsize>,
}

impl OverlaySurface for Surface {
    fn render(&mut self, _scene: &OverlayScene) {}

    fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct Host {
    closes: Arc<AtomicUsize>,
}

impl OverlayHost for Host {
    fn open(
        &mut self,
        _id: OverlayId,
        display: &DisplayInfo,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        Ok(Box::new(Surface {
            geometry: SurfaceGeometry {
                view_frame: Rect::new(0.0, 0.0, display.width, display.height),
                window_origin: Point::new(display.x, display.y),
                bottom_left_origin: false,
            },
            closes: self.closes.clone(),
        }))
    }
}

#[derive(Clone, Default)]
struct Recorder {
    saved: Arc<Mutex<Vec<PathBuf>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl SaveFeedback for Recorder {
    fn reveal(&self, path: &Path) -> io::Result<()> {
        self.saved.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn play_completion_sound(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Notifier for Recorder {
    fn notify_error(&self, _title: &str, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

async fn pump_until(
    coordinator: &mut CaptureCoordinator,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    stop: impl Fn(&AppEvent) -> bool,
) {
    loop {
        let event = rx.recv().await.expect("event channel closed");
        let done = stop(&event);
        coordinator.handle_event(event);
        if done {
            return;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_dragged_selection_is_saved_at_device_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(OneShotBackend::default());
    let closes = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::default();
    let (sink, mut rx) = ChannelSink::new(Handle::current());

    let mut coordinator = CaptureCoordinator::new(
        backend.clone(),
        Box::new(Host {
            closes: closes.clone(),
        }),
        ImagePersister::new(dir.path(), "screenshot"),
        Arc::new(sink),
        Handle::current(),
    )
    .with_feedback(
        Box::new(recorder.clone()),
        FeedbackOptions {
            reveal_in_file_browser: true,
            play_sound: false,
        },
    )
    .with_notifier(Box::new(recorder.clone()));

    assert!(coordinator.request_capture(PresetSize::SMALL));
    // A second request while the overlay is up is ignored
    assert!(!coordinator.request_capture(PresetSize::LARGE));
    let id = coordinator.overlay_id().unwrap();
    pump_until(&mut coordinator, &mut rx, |e| matches!(e, AppEvent::OverlayReady(_))).await;

    // Centred at (640, 340); drag it to (100, 80)
    let send = |coordinator: &mut CaptureCoordinator, input| {
        coordinator.handle_event(AppEvent::OverlayInput { id, input });
    };
    send(
        &mut coordinator,
        OverlayInput::PointerDown {
            location: Point::new(650.0, 350.0),
            timestamp: Duration::from_secs(10),
        },
    );
    send(
        &mut coordinator,
        OverlayInput::PointerDragged {
            location: Point::new(110.0, 90.0),
        },
    );
    send(&mut coordinator, OverlayInput::PointerUp);
    assert_eq!(
        coordinator.overlay_selection(),
        Some(Rect::new(100.0, 80.0, 640.0, 400.0))
    );

    for ms in [20_000, 20_200] {
        send(
            &mut coordinator,
            OverlayInput::PointerDown {
                location: Point::new(120.0, 100.0),
                timestamp: Duration::from_millis(ms),
            },
        );
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.overlay_id(), None);

    pump_until(&mut coordinator, &mut rx, |e| matches!(e, AppEvent::CaptureFinished(_))).await;
    assert!(!coordinator.is_capturing());
    assert_eq!(backend.stops.load(Ordering::SeqCst), 1);

    pump_until(&mut coordinator, &mut rx, |e| matches!(e, AppEvent::PersistFinished(_))).await;
    assert!(recorder.errors.lock().unwrap().is_empty());

    let saved = recorder.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("screenshot-640x400-"), "{}", name);
    assert!(name.ends_with(".png"));

    // Device rect (200, 160, 1280, 800)
    let image = image::open(&saved[0]).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (1280, 800));
    assert_eq!(image.get_pixel(0, 0), &Rgba([0, 10, 12, 255]));
    assert_eq!(image.get_pixel(1279, 799), &Rgba([0, 59, 92, 255]));

    // The next request opens a fresh overlay
    assert!(coordinator.request_capture(PresetSize::LARGE));
}
