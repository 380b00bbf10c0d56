//! Global hotkeys.
//!
//! [`HotkeyDispatcher`] binds key combinations to application actions. OS
//! registration sits behind [`HotkeyRegistrar`]; the `global-hotkey`
//! implementation delivers presses on its own channel, which
//! [`forward_hotkey_events`] relays to the main context as
//! `AppEvent::Hotkey`.

use crate::events::{AppEvent, EventSink};
use extshot_types::PresetSize;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identifier chosen by the application for a binding.
pub type HotkeyId = u32;

/// Identifier the OS layer reports when a hotkey fires.
pub type OsHotkeyId = u32;

const KEY_CODES: [(char, Code); 36] = [
    ('0', Code::Digit0),
    ('1', Code::Digit1),
    ('2', Code::Digit2),
    ('3', Code::Digit3),
    ('4', Code::Digit4),
    ('5', Code::Digit5),
    ('6', Code::Digit6),
    ('7', Code::Digit7),
    ('8', Code::Digit8),
    ('9', Code::Digit9),
    ('a', Code::KeyA),
    ('b', Code::KeyB),
    ('c', Code::KeyC),
    ('d', Code::KeyD),
    ('e', Code::KeyE),
    ('f', Code::KeyF),
    ('g', Code::KeyG),
    ('h', Code::KeyH),
    ('i', Code::KeyI),
    ('j', Code::KeyJ),
    ('k', Code::KeyK),
    ('l', Code::KeyL),
    ('m', Code::KeyM),
    ('n', Code::KeyN),
    ('o', Code::KeyO),
    ('p', Code::KeyP),
    ('q', Code::KeyQ),
    ('r', Code::KeyR),
    ('s', Code::KeyS),
    ('t', Code::KeyT),
    ('u', Code::KeyU),
    ('v', Code::KeyV),
    ('w', Code::KeyW),
    ('x', Code::KeyX),
    ('y', Code::KeyY),
    ('z', Code::KeyZ),
];

/// Error type for hotkey registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The combination string could not be parsed
    InvalidCombination(String),
    /// Another binding already uses the combination
    AlreadyBound(String),
    /// The OS refused the registration
    PlatformError(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidCombination(msg) => write!(f, "Invalid key combination: {}", msg),
            RegistrationError::AlreadyBound(combo) => write!(f, "{} is already bound", combo),
            RegistrationError::PlatformError(msg) => write!(f, "Hotkey registration failed: {}", msg),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<RegistrationError> for String {
    fn from(err: RegistrationError) -> Self {
        err.to_string()
    }
}

/// A modifier set plus one letter or digit key, e.g. `alt+shift+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombination {
    pub modifiers: Modifiers,
    /// Lowercase ASCII letter or digit
    pub key: char,
}

impl KeyCombination {
    pub fn new(modifiers: Modifiers, key: char) -> Result<Self, RegistrationError> {
        let key = key.to_ascii_lowercase();
        if key_code(key).is_none() {
            return Err(RegistrationError::InvalidCombination(format!(
                "unsupported key '{}'",
                key
            )));
        }
        Ok(Self { modifiers, key })
    }

    /// Physical key code for the OS layer.
    pub fn code(&self) -> Code {
        // Validated on construction.
        key_code(self.key).unwrap_or(Code::Digit0)
    }
}

fn key_code(key: char) -> Option<Code> {
    KEY_CODES
        .iter()
        .find(|(c, _)| *c == key)
        .map(|(_, code)| *code)
}

impl FromStr for KeyCombination {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::empty();
        let mut key = None;

        for part in s.split('+').map(|p| p.trim().to_lowercase()) {
            match part.as_str() {
                "shift" => modifiers |= Modifiers::SHIFT,
                "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
                "alt" | "option" | "opt" => modifiers |= Modifiers::ALT,
                "cmd" | "command" | "super" | "meta" => modifiers |= Modifiers::META,
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) => key = Some(c),
                        _ => {
                            return Err(RegistrationError::InvalidCombination(format!(
                                "unexpected '{}' in '{}'",
                                other, s
                            )))
                        }
                    }
                }
            }
        }

        let key = key.ok_or_else(|| {
            RegistrationError::InvalidCombination(format!("no key in '{}'", s))
        })?;
        Self::new(modifiers, key)
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::CONTROL, "ctrl"),
            (Modifiers::ALT, "alt"),
            (Modifiers::SHIFT, "shift"),
            (Modifiers::META, "cmd"),
        ];
        for (flag, name) in names {
            if self.modifiers.contains(flag) {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// What a hotkey does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Capture(PresetSize),
}

/// OS-level hotkey registration.
pub trait HotkeyRegistrar {
    /// Register `combination`; returns the id reported when it fires.
    fn register(&mut self, combination: KeyCombination) -> Result<OsHotkeyId, RegistrationError>;

    fn unregister(&mut self, os_id: OsHotkeyId);
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    combination: KeyCombination,
    os_id: OsHotkeyId,
    action: HotkeyAction,
}

/// Maps fired hotkeys to application actions.
pub struct HotkeyDispatcher {
    registrar: Box<dyn HotkeyRegistrar>,
    bindings: HashMap<HotkeyId, Binding>,
}

impl HotkeyDispatcher {
    pub fn new(registrar: Box<dyn HotkeyRegistrar>) -> Self {
        Self {
            registrar,
            bindings: HashMap::new(),
        }
    }

    /// Bind `combination` to `action` under `id`.
    ///
    /// Registering an id again replaces its previous binding. A combination
    /// can only be bound to one id.
    pub fn register(
        &mut self,
        combination: KeyCombination,
        id: HotkeyId,
        action: HotkeyAction,
    ) -> Result<(), RegistrationError> {
        if let Some((other, _)) = self
            .bindings
            .iter()
            .find(|(other, b)| **other != id && b.combination == combination)
        {
            warn!("{} is already bound to hotkey {}", combination, other);
            return Err(RegistrationError::AlreadyBound(combination.to_string()));
        }

        if let Some(existing) = self.bindings.get_mut(&id) {
            if existing.combination == combination {
                existing.action = action;
                return Ok(());
            }
        }

        let os_id = self.registrar.register(combination)?;
        let binding = Binding {
            combination,
            os_id,
            action,
        };
        if let Some(old) = self.bindings.insert(id, binding) {
            debug!("Hotkey {} rebound from {}", id, old.combination);
            self.registrar.unregister(old.os_id);
        }
        info!("Registered hotkey {} ({}) -> {:?}", id, combination, action);
        Ok(())
    }

    /// Resolve a fired hotkey to its action.
    pub fn dispatch(&self, os_id: OsHotkeyId) -> Option<HotkeyAction> {
        let action = self
            .bindings
            .values()
            .find(|b| b.os_id == os_id)
            .map(|b| b.action);
        if action.is_none() {
            debug!("Ignoring unknown hotkey {}", os_id);
        }
        action
    }

    /// Release every registration.
    pub fn unregister_all(&mut self) {
        for (_, binding) in self.bindings.drain() {
            self.registrar.unregister(binding.os_id);
        }
    }
}

/// [`HotkeyRegistrar`] backed by the `global-hotkey` crate.
///
/// On macOS the manager must be created on the main thread.
pub struct GlobalHotkeyRegistrar {
    manager: GlobalHotKeyManager,
    registered: HashMap<OsHotkeyId, HotKey>,
}

impl GlobalHotkeyRegistrar {
    pub fn new() -> Result<Self, RegistrationError> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| RegistrationError::PlatformError(e.to_string()))?;
        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }
}

impl HotkeyRegistrar for GlobalHotkeyRegistrar {
    fn register(&mut self, combination: KeyCombination) -> Result<OsHotkeyId, RegistrationError> {
        let modifiers = if combination.modifiers.is_empty() {
            None
        } else {
            Some(combination.modifiers)
        };
        let hotkey = HotKey::new(modifiers, combination.code());
        self.manager
            .register(hotkey)
            .map_err(|e| RegistrationError::PlatformError(e.to_string()))?;
        self.registered.insert(hotkey.id(), hotkey);
        Ok(hotkey.id())
    }

    fn unregister(&mut self, os_id: OsHotkeyId) {
        if let Some(hotkey) = self.registered.remove(&os_id) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to unregister hotkey {}: {}", os_id, e);
            }
        }
    }
}

/// Registrar for processes that cannot take global hotkeys; every
/// registration fails, leaving the bindings inert.
pub struct InertRegistrar;

impl HotkeyRegistrar for InertRegistrar {
    fn register(&mut self, combination: KeyCombination) -> Result<OsHotkeyId, RegistrationError> {
        Err(RegistrationError::PlatformError(format!(
            "global hotkeys unavailable, {} not registered",
            combination
        )))
    }

    fn unregister(&mut self, _os_id: OsHotkeyId) {}
}

/// Relay presses from `global-hotkey` to `sink` on a background thread.
pub fn forward_hotkey_events(sink: Arc<dyn EventSink>) {
    std::thread::spawn(move || {
        let receiver = GlobalHotKeyEvent::receiver();
        while let Ok(event) = receiver.recv() {
            if event.state() == HotKeyState::Pressed {
                sink.post(AppEvent::Hotkey(event.id()));
            }
        }
        debug!("Hotkey event channel closed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        registered: Vec<KeyCombination>,
        unregistered: Vec<OsHotkeyId>,
        next_id: OsHotkeyId,
        refuse: bool,
    }

    struct FakeRegistrar(Rc<RefCell<Log>>);

    impl HotkeyRegistrar for FakeRegistrar {
        fn register(&mut self, combination: KeyCombination) -> Result<OsHotkeyId, RegistrationError> {
            let mut log = self.0.borrow_mut();
            if log.refuse {
                return Err(RegistrationError::PlatformError("refused".into()));
            }
            log.next_id += 1;
            log.registered.push(combination);
            Ok(100 + log.next_id)
        }

        fn unregister(&mut self, os_id: OsHotkeyId) {
            self.0.borrow_mut().unregistered.push(os_id);
        }
    }

    fn dispatcher() -> (HotkeyDispatcher, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        (HotkeyDispatcher::new(Box::new(FakeRegistrar(log.clone()))), log)
    }

    fn combo(s: &str) -> KeyCombination {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_combination() {
        let c = combo("alt+shift+1");
        assert_eq!(c.modifiers, Modifiers::ALT | Modifiers::SHIFT);
        assert_eq!(c.key, '1');
        assert_eq!(c.code(), Code::Digit1);

        let c = combo(" Cmd + Ctrl + S ");
        assert_eq!(c.modifiers, Modifiers::META | Modifiers::CONTROL);
        assert_eq!(c.code(), Code::KeyS);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("alt+shift".parse::<KeyCombination>().is_err());
        assert!("alt+f1".parse::<KeyCombination>().is_err());
        assert!("alt+1+2".parse::<KeyCombination>().is_err());
        assert!("alt+%".parse::<KeyCombination>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(combo("shift+option+2").to_string(), "alt+shift+2");
        assert_eq!(combo("meta+ctrl+a").to_string(), "ctrl+cmd+a");
    }

    #[test]
    fn test_dispatch_resolves_bound_action() {
        let (mut hotkeys, _) = dispatcher();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .unwrap();
        hotkeys
            .register(combo("alt+shift+2"), 2, HotkeyAction::Capture(PresetSize::SMALL))
            .unwrap();

        assert_eq!(hotkeys.dispatch(101), Some(HotkeyAction::Capture(PresetSize::LARGE)));
        assert_eq!(hotkeys.dispatch(102), Some(HotkeyAction::Capture(PresetSize::SMALL)));
        assert_eq!(hotkeys.dispatch(999), None);
    }

    #[test]
    fn test_last_registration_for_id_wins() {
        let (mut hotkeys, log) = dispatcher();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .unwrap();
        hotkeys
            .register(combo("alt+shift+9"), 1, HotkeyAction::Capture(PresetSize::SMALL))
            .unwrap();

        assert_eq!(log.borrow().unregistered, vec![101]);
        assert_eq!(hotkeys.dispatch(101), None);
        assert_eq!(hotkeys.dispatch(102), Some(HotkeyAction::Capture(PresetSize::SMALL)));
    }

    #[test]
    fn test_rebinding_same_combination_updates_action() {
        let (mut hotkeys, log) = dispatcher();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .unwrap();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::SMALL))
            .unwrap();

        assert_eq!(log.borrow().registered.len(), 1);
        assert_eq!(hotkeys.dispatch(101), Some(HotkeyAction::Capture(PresetSize::SMALL)));
    }

    #[test]
    fn test_combination_is_unique() {
        let (mut hotkeys, _) = dispatcher();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .unwrap();
        let err = hotkeys
            .register(combo("shift+alt+1"), 2, HotkeyAction::Capture(PresetSize::SMALL))
            .unwrap_err();
        assert_eq!(err, RegistrationError::AlreadyBound("alt+shift+1".to_string()));
    }

    #[test]
    fn test_platform_failure_leaves_hotkey_inert() {
        let (mut hotkeys, log) = dispatcher();
        log.borrow_mut().refuse = true;
        assert!(hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .is_err());
        assert_eq!(hotkeys.dispatch(101), None);
    }

    #[test]
    fn test_unregister_all() {
        let (mut hotkeys, log) = dispatcher();
        hotkeys
            .register(combo("alt+shift+1"), 1, HotkeyAction::Capture(PresetSize::LARGE))
            .unwrap();
        hotkeys.unregister_all();
        assert_eq!(log.borrow().unregistered, vec![101]);
        assert_eq!(hotkeys.dispatch(101), None);
    }
}
