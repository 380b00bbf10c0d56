//! Event delivery on the AppKit main queue.
//!
//! AppKit callbacks carry no user data, so the [`AppContext`] lives in a
//! main-thread-local slot that [`MainQueueSink`] deliveries borrow.

use crate::app::AppContext;
use crate::events::{AppEvent, EventSink};
use dispatch::Queue;
use objc2_app_kit::NSApplication;
use objc2_foundation::MainThreadMarker;
use std::cell::RefCell;
use std::time::Duration;
use tracing::debug;

thread_local! {
    static CONTEXT: RefCell<Option<AppContext>> = const { RefCell::new(None) };
}

/// Make `context` the receiver of main-queue events. Main thread only.
pub fn install(context: AppContext) {
    CONTEXT.with(|slot| *slot.borrow_mut() = Some(context));
}

/// [`EventSink`] that posts to the main dispatch queue.
pub struct MainQueueSink;

impl EventSink for MainQueueSink {
    fn post(&self, event: AppEvent) {
        Queue::main().exec_async(move || deliver(event));
    }

    fn post_after(&self, delay: Duration, event: AppEvent) {
        Queue::main().exec_after(delay, move || deliver(event));
    }
}

fn deliver(event: AppEvent) {
    CONTEXT.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            // A handler is running further up this stack.
            Queue::main().exec_async(move || deliver(event));
            return;
        };
        let Some(context) = slot.as_mut() else {
            debug!("No context, dropping {:?}", event);
            return;
        };
        if context.handle_event(event) {
            return;
        }

        if let Some(mut context) = slot.take() {
            context.teardown();
        }
        drop(slot);
        if let Some(mtm) = MainThreadMarker::new() {
            NSApplication::sharedApplication(mtm).terminate(None);
        }
    });
}
