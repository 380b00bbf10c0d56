//! Status bar menu.

use crate::events::{AppEvent, EventSink};
use extshot_types::PresetSize;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, Sel};
use objc2::{define_class, msg_send, sel, DefinedClass, MainThreadOnly};
use objc2_app_kit::{NSMenu, NSMenuItem, NSStatusBar, NSStatusItem, NSVariableStatusItemLength};
use objc2_foundation::{MainThreadMarker, NSObject, NSObjectProtocol, NSString};
use std::sync::Arc;

const STATUS_TITLE: &str = "ExtShot";

pub struct MenuTargetIvars {
    sink: Arc<dyn EventSink>,
}

define_class!(
    // SAFETY: NSObject has no subclassing requirements, and MenuTarget does
    // not implement Drop.
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "ExtShotMenuTarget"]
    #[ivars = MenuTargetIvars]
    pub struct MenuTarget;

    unsafe impl NSObjectProtocol for MenuTarget {}

    impl MenuTarget {
        #[unsafe(method(captureLarge:))]
        fn capture_large(&self, _sender: Option<&AnyObject>) {
            self.ivars().sink.post(AppEvent::CaptureRequested(PresetSize::LARGE));
        }

        #[unsafe(method(captureSmall:))]
        fn capture_small(&self, _sender: Option<&AnyObject>) {
            self.ivars().sink.post(AppEvent::CaptureRequested(PresetSize::SMALL));
        }

        #[unsafe(method(quit:))]
        fn quit(&self, _sender: Option<&AnyObject>) {
            self.ivars().sink.post(AppEvent::Shutdown);
        }
    }
);

impl MenuTarget {
    fn new(mtm: MainThreadMarker, sink: Arc<dyn EventSink>) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(MenuTargetIvars { sink });
        unsafe { msg_send![super(this), init] }
    }
}

/// The status item and its menu target; dropping it removes the item.
pub struct StatusMenu {
    item: Retained<NSStatusItem>,
    _target: Retained<MenuTarget>,
}

impl StatusMenu {
    pub fn install(mtm: MainThreadMarker, sink: Arc<dyn EventSink>) -> Self {
        let target = MenuTarget::new(mtm, sink);
        let menu = NSMenu::new(mtm);

        let entries: [(String, Sel, &str); 3] = [
            (format!("Capture {}", PresetSize::LARGE), sel!(captureLarge:), "1"),
            (format!("Capture {}", PresetSize::SMALL), sel!(captureSmall:), "2"),
            ("Quit ExtShot".to_string(), sel!(quit:), "q"),
        ];
        for (title, action, key) in entries {
            let item = unsafe {
                NSMenuItem::initWithTitle_action_keyEquivalent(
                    mtm.alloc(),
                    &NSString::from_str(&title),
                    Some(action),
                    &NSString::from_str(key),
                )
            };
            let target_object: &AnyObject = &target;
            unsafe { item.setTarget(Some(target_object)) };
            menu.addItem(&item);
        }

        let item = NSStatusBar::systemStatusBar().statusItemWithLength(NSVariableStatusItemLength);
        if let Some(button) = item.button(mtm) {
            button.setTitle(&NSString::from_str(STATUS_TITLE));
        }
        item.setMenu(Some(&menu));

        Self {
            item,
            _target: target,
        }
    }
}

impl Drop for StatusMenu {
    fn drop(&mut self) {
        NSStatusBar::systemStatusBar().removeStatusItem(&self.item);
    }
}
