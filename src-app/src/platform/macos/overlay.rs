//! AppKit overlay surface: a borderless panel covering one display with a
//! view that forwards input and draws the [`OverlayScene`].

use crate::events::{AppEvent, EventSink};
use crate::overlay::{
    Color, OverlayError, OverlayHost, OverlayId, OverlayInput, OverlayScene, OverlaySurface,
    SurfaceGeometry,
};
use extshot_types::{DisplayInfo, Point, Rect, Size};
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{define_class, msg_send, DefinedClass, MainThreadOnly};
use objc2_app_kit::{
    NSApplicationActivationOptions, NSBackingStoreType, NSBezierPath, NSColor, NSEvent, NSFont,
    NSPanel, NSRunningApplication, NSScreen, NSStringDrawing, NSView, NSWindingRule,
    NSWindowStyleMask,
};
use objc2_foundation::{MainThreadMarker, NSDictionary, NSPoint, NSRect, NSSize, NSString};
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Above the menu bar and the Dock.
const OVERLAY_WINDOW_LEVEL: isize = 1000;

const ESCAPE_KEY_CODE: u16 = 53;

const HINT_FONT_SIZE: f64 = 14.0;

pub struct SelectionViewIvars {
    id: OverlayId,
    sink: Arc<dyn EventSink>,
    scene: RefCell<Option<OverlayScene>>,
}

define_class!(
    // SAFETY: NSView has no subclassing requirements we violate, and
    // SelectionView does not implement Drop.
    #[unsafe(super = NSView)]
    #[thread_kind = MainThreadOnly]
    #[name = "ExtShotSelectionView"]
    #[ivars = SelectionViewIvars]
    pub struct SelectionView;

    impl SelectionView {
        /// Top-left origin, matching the selection model.
        #[unsafe(method(isFlipped))]
        fn is_flipped(&self) -> bool {
            true
        }

        #[unsafe(method(acceptsFirstResponder))]
        fn accepts_first_responder(&self) -> bool {
            true
        }

        #[unsafe(method(acceptsFirstMouse:))]
        fn accepts_first_mouse(&self, _event: Option<&NSEvent>) -> bool {
            true
        }

        #[unsafe(method(mouseDown:))]
        fn mouse_down(&self, event: &NSEvent) {
            let timestamp = Duration::try_from_secs_f64(event.timestamp()).unwrap_or_default();
            self.send(OverlayInput::PointerDown {
                location: self.location(event),
                timestamp,
            });
        }

        #[unsafe(method(mouseDragged:))]
        fn mouse_dragged(&self, event: &NSEvent) {
            self.send(OverlayInput::PointerDragged {
                location: self.location(event),
            });
        }

        #[unsafe(method(mouseUp:))]
        fn mouse_up(&self, _event: &NSEvent) {
            self.send(OverlayInput::PointerUp);
        }

        #[unsafe(method(keyDown:))]
        fn key_down(&self, event: &NSEvent) {
            if event.keyCode() == ESCAPE_KEY_CODE {
                self.send(OverlayInput::Escape);
            }
        }

        #[unsafe(method(drawRect:))]
        fn draw_rect(&self, _dirty: NSRect) {
            if let Some(scene) = self.ivars().scene.borrow().as_ref() {
                draw_scene(scene);
            }
        }
    }
);

impl SelectionView {
    fn new(mtm: MainThreadMarker, frame: NSRect, id: OverlayId, sink: Arc<dyn EventSink>) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(SelectionViewIvars {
            id,
            sink,
            scene: RefCell::new(None),
        });
        unsafe { msg_send![super(this), initWithFrame: frame] }
    }

    fn location(&self, event: &NSEvent) -> Point {
        let point = self.convertPoint_fromView(event.locationInWindow(), None);
        Point::new(point.x, point.y)
    }

    fn send(&self, input: OverlayInput) {
        let ivars = self.ivars();
        ivars.sink.post(AppEvent::OverlayInput {
            id: ivars.id,
            input,
        });
    }
}

define_class!(
    // SAFETY: NSPanel has no subclassing requirements we violate, and
    // OverlayPanel does not implement Drop.
    #[unsafe(super = NSPanel)]
    #[thread_kind = MainThreadOnly]
    #[name = "ExtShotOverlayPanel"]
    pub struct OverlayPanel;

    impl OverlayPanel {
        /// Borderless windows refuse key status by default, which would
        /// swallow Escape.
        #[unsafe(method(canBecomeKeyWindow))]
        fn can_become_key_window(&self) -> bool {
            true
        }
    }
);

fn ns_rect(rect: Rect) -> NSRect {
    NSRect::new(
        NSPoint::new(rect.x(), rect.y()),
        NSSize::new(rect.width(), rect.height()),
    )
}

fn ns_color(color: Color) -> Retained<NSColor> {
    NSColor::colorWithCalibratedRed_green_blue_alpha(color.r, color.g, color.b, color.a)
}

fn draw_scene(scene: &OverlayScene) {
    let dim = NSBezierPath::bezierPath();
    dim.setWindingRule(NSWindingRule::EvenOdd);
    for rect in scene.dim_path() {
        dim.appendBezierPathWithRect(ns_rect(rect));
    }
    ns_color(scene.dim).setFill();
    dim.fill();

    let outline = NSBezierPath::bezierPathWithRect(ns_rect(scene.selection));
    outline.setLineWidth(scene.outline_width);
    ns_color(scene.outline).setStroke();
    outline.stroke();

    let font = NSFont::systemFontOfSize(HINT_FONT_SIZE);
    let text_color = ns_color(scene.outline);
    let font_key = NSString::from_str("NSFont");
    let color_key = NSString::from_str("NSColor");
    let keys: &[&NSString] = &[&font_key, &color_key];
    let values: &[&AnyObject] = unsafe {
        &[
            &*(&*font as *const NSFont as *const AnyObject),
            &*(&*text_color as *const NSColor as *const AnyObject),
        ]
    };
    let attributes = NSDictionary::from_slices(keys, values);

    let hint = NSString::from_str(scene.hint);
    let size = unsafe { hint.sizeWithAttributes(Some(&attributes)) };
    let origin = scene.hint_origin(Size::new(size.width, size.height));
    unsafe { hint.drawAtPoint_withAttributes(NSPoint::new(origin.x, origin.y), Some(&attributes)) };
}

/// Opens [`PanelSurface`]s.
pub struct PanelHost {
    mtm: MainThreadMarker,
    sink: Arc<dyn EventSink>,
}

impl PanelHost {
    pub fn new(mtm: MainThreadMarker, sink: Arc<dyn EventSink>) -> Self {
        Self { mtm, sink }
    }
}

impl OverlayHost for PanelHost {
    fn open(
        &mut self,
        id: OverlayId,
        display: &DisplayInfo,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        let mtm = self.mtm;

        // AppKit frames have a bottom-left origin on the main screen.
        let screens = NSScreen::screens(mtm);
        if screens.count() == 0 {
            return Err(OverlayError::PlatformError("no screens attached".to_string()));
        }
        let main_height = screens.objectAtIndex(0).frame().size.height;
        let frame = NSRect::new(
            NSPoint::new(display.x, main_height - display.y - display.height),
            NSSize::new(display.width, display.height),
        );

        let style = NSWindowStyleMask::Borderless | NSWindowStyleMask::NonactivatingPanel;
        let panel: Retained<OverlayPanel> = unsafe {
            msg_send![
                mtm.alloc::<OverlayPanel>(),
                initWithContentRect: frame,
                styleMask: style,
                backing: NSBackingStoreType::Buffered,
                defer: false
            ]
        };
        unsafe { panel.setReleasedWhenClosed(false) };
        panel.setLevel(OVERLAY_WINDOW_LEVEL);
        panel.setOpaque(false);
        panel.setHasShadow(false);
        panel.setBackgroundColor(Some(&NSColor::clearColor()));
        panel.setAcceptsMouseMovedEvents(true);

        let view_frame = NSRect::new(NSPoint::new(0.0, 0.0), frame.size);
        let view = SelectionView::new(mtm, view_frame, id, self.sink.clone());
        let content: &NSView = &view;
        panel.setContentView(Some(content));
        panel.makeKeyAndOrderFront(None);
        panel.makeFirstResponder(Some(content));
        NSRunningApplication::currentApplication()
            .activateWithOptions(NSApplicationActivationOptions::empty());

        debug!("Overlay panel {} covers {:?}", id, frame);
        Ok(Box::new(PanelSurface {
            panel,
            view,
            geometry: SurfaceGeometry {
                view_frame: Rect::new(0.0, 0.0, display.width, display.height),
                window_origin: Point::new(display.x, display.y),
                bottom_left_origin: false,
            },
            closed: false,
        }))
    }
}

/// One open overlay panel.
pub struct PanelSurface {
    panel: Retained<OverlayPanel>,
    view: Retained<SelectionView>,
    geometry: SurfaceGeometry,
    closed: bool,
}

impl OverlaySurface for PanelSurface {
    fn render(&mut self, scene: &OverlayScene) {
        *self.view.ivars().scene.borrow_mut() = Some(scene.clone());
        self.view.setNeedsDisplay(true);
    }

    fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.panel.orderOut(None);
            self.panel.close();
        }
    }
}

impl Drop for PanelSurface {
    fn drop(&mut self) {
        self.close();
    }
}
