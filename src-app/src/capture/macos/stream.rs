//! Single-frame display streams using ScreenCaptureKit.

use crate::capture::types::{FrameReceiver, RawFrame, StopHandle};
use screencapturekit::{
    cm_sample_buffer::CMSampleBuffer,
    sc_content_filter::{InitParams, SCContentFilter},
    sc_error_handler::StreamErrorHandler,
    sc_output_handler::{SCStreamOutputType, StreamOutput},
    sc_shareable_content::SCShareableContent,
    sc_stream::SCStream,
    sc_stream_configuration::{PixelFormat, SCStreamConfiguration},
    sc_types::base::CMTime,
};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// FFI bindings for CVPixelBuffer functions not exposed by the crate
#[link(name = "CoreVideo", kind = "framework")]
extern "C" {
    fn CVPixelBufferGetWidth(pixelBuffer: *const c_void) -> usize;
    fn CVPixelBufferGetHeight(pixelBuffer: *const c_void) -> usize;
    fn CVPixelBufferGetBytesPerRow(pixelBuffer: *const c_void) -> usize;
}

/// How often the keep-alive thread checks the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Sender for the one frame a stream delivers. Taking it out either
/// delivers that frame or ends the receiver empty.
type FrameSlot = Arc<Mutex<Option<mpsc::Sender<RawFrame>>>>;

fn take_sender(slot: &FrameSlot) -> Option<mpsc::Sender<RawFrame>> {
    slot.lock().ok().and_then(|mut tx| tx.take())
}

/// Ends the receiver on a stream error, so the session fails right away
/// rather than waiting out its deadline.
struct CaptureErrorHandler {
    slot: FrameSlot,
}

impl StreamErrorHandler for CaptureErrorHandler {
    fn on_error(&self) {
        error!("ScreenCaptureKit stream error");
        if take_sender(&self.slot).is_some() {
            debug!("Closed frame channel after stream error");
        }
    }
}

/// Forwards the first complete frame and ignores the rest.
struct SingleFrameHandler {
    slot: FrameSlot,
    stop_flag: Arc<AtomicBool>,
    width: u32,
    height: u32,
}

impl SingleFrameHandler {
    /// Copy the sample's pixels out of the locked buffer, dropping row padding.
    fn copy_frame(&self, sample: &CMSampleBuffer) -> Option<RawFrame> {
        let pixel_buffer = sample.pixel_buffer.as_ref()?;
        if !pixel_buffer.lock() {
            warn!("Failed to lock pixel buffer");
            return None;
        }

        // BGRA in memory when configured with ARGB8888
        let base_address = pixel_buffer.get_base_adress();
        if base_address.is_null() {
            pixel_buffer.unlock();
            return None;
        }

        // CVImageBufferRef and CVPixelBufferRef are toll-free bridged
        let cv_buffer_ptr: *const c_void = sample
            .image_buf_ref
            .as_ref()
            .map(|img_buf| {
                let inner_ref = &**img_buf;
                inner_ref as *const _ as *const c_void
            })
            .unwrap_or(std::ptr::null());

        let (actual_width, actual_height, bytes_per_row) = if !cv_buffer_ptr.is_null() {
            unsafe {
                (
                    CVPixelBufferGetWidth(cv_buffer_ptr) as u32,
                    CVPixelBufferGetHeight(cv_buffer_ptr) as u32,
                    CVPixelBufferGetBytesPerRow(cv_buffer_ptr),
                )
            }
        } else {
            (self.width, self.height, (self.width * 4) as usize)
        };

        let width = if actual_width > 0 { actual_width } else { self.width };
        let height = if actual_height > 0 { actual_height } else { self.height };
        let row_bytes = width as usize * 4;
        let stride = if bytes_per_row == 0 { row_bytes } else { bytes_per_row };

        let src_ptr = base_address as *const u8;
        let data = if stride == row_bytes {
            let len = row_bytes * height as usize;
            unsafe { std::slice::from_raw_parts(src_ptr, len) }.to_vec()
        } else {
            let mut data = Vec::with_capacity(row_bytes * height as usize);
            for row in 0..height as usize {
                let row_data =
                    unsafe { std::slice::from_raw_parts(src_ptr.add(row * stride), row_bytes) };
                data.extend_from_slice(row_data);
            }
            data
        };

        pixel_buffer.unlock();
        debug!("Copied {}x{} frame (stride {})", width, height, stride);

        Some(RawFrame {
            width,
            height,
            data,
        })
    }
}

impl StreamOutput for SingleFrameHandler {
    fn did_output_sample_buffer(&self, sample: CMSampleBuffer, of_type: SCStreamOutputType) {
        if !matches!(of_type, SCStreamOutputType::Screen) {
            return;
        }
        if self.stop_flag.load(Ordering::Relaxed) {
            return;
        }
        let delivered = self.slot.lock().map(|tx| tx.is_none()).unwrap_or(true);
        if delivered {
            return;
        }

        // Idle and blank samples carry no pixel buffer; wait for a real one.
        let Some(frame) = self.copy_frame(&sample) else {
            return;
        };
        if let Some(tx) = take_sender(&self.slot) {
            let _ = tx.try_send(frame);
        }
    }
}

/// Open a stream of `display_id` at `width × height` device pixels.
///
/// The stream runs until the returned handle is stopped; only its first
/// frame is forwarded to the receiver.
pub fn start_display_capture(
    display_id: u32,
    width: u32,
    height: u32,
) -> Result<(FrameReceiver, StopHandle), String> {
    info!(
        "Opening capture stream for display {} ({}x{})",
        display_id, width, height
    );

    // Requires screen recording permission
    let content = SCShareableContent::try_current()
        .map_err(|e| format!("Failed to get shareable content: {}", e))?;

    let mut content = content;
    let display_index = content
        .displays
        .iter()
        .position(|d| d.display_id == display_id)
        .ok_or_else(|| format!("Display {} not shareable", display_id))?;
    let display = content.displays.swap_remove(display_index);

    let filter = SCContentFilter::new(InitParams::Display(display));

    let config = SCStreamConfiguration {
        width,
        height,
        shows_cursor: false,
        pixel_format: PixelFormat::ARGB8888,
        minimum_frame_interval: CMTime {
            value: 1,
            timescale: 1,
            flags: 1,
            epoch: 0,
        },
        queue_depth: 1,
        ..Default::default()
    };

    let (tx, rx) = mpsc::channel(1);
    let slot: FrameSlot = Arc::new(Mutex::new(Some(tx)));
    let stop_flag = Arc::new(AtomicBool::new(false));

    let mut stream = SCStream::new(
        filter,
        config,
        CaptureErrorHandler { slot: slot.clone() },
    );
    stream.add_output(
        SingleFrameHandler {
            slot,
            stop_flag: stop_flag.clone(),
            width,
            height,
        },
        SCStreamOutputType::Screen,
    );

    stream
        .start_capture()
        .map_err(|e| format!("Failed to start capture: {}", e))?;
    debug!("Capture stream started");

    // Keep the stream alive until the handle is stopped.
    let keep_alive = stop_flag.clone();
    std::thread::spawn(move || {
        while !keep_alive.load(Ordering::Relaxed) {
            std::thread::sleep(STOP_POLL_INTERVAL);
        }
        debug!("Stopping capture stream for display {}", display_id);
        if let Err(e) = stream.stop_capture() {
            warn!("Failed to stop capture stream: {}", e);
        }
    });

    Ok((rx, StopHandle::from_flag(stop_flag)))
}
