//! User interaction handling.
//!
//! Input handling is done in several steps:
//! 1. The host toolkit's events are converted by the application into the
//!    common [`RawInputEvent`] enum. The dispatcher does not talk to any
//!    windowing library directly.
//! 2. `RawInputEvent` is given to the [`EventDispatcher`], which keeps
//!    track of input state (held keys, sticky modifiers, pending clicks)
//!    and synthesizes the higher-level [`EventPayload`] values.
//! 3. The dispatcher invokes the callbacks registered for the matching
//!    event category, button and modifier, skipping callbacks whose layer
//!    is not part of the currently visible composition.

use ortelius_types::cartesian::Point2d;

use crate::pick::PickResult;

mod dispatcher;

pub use dispatcher::{
    ClickOptions, EventCallback, EventDispatcher, KeyOptions, MoveOptions, PickOptions,
};

/// Category of an interaction event. Callbacks are registered per category,
/// and dispatch state (sticky modifiers, the re-entrancy queue) is kept per
/// category as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Mouse button clicks.
    Click,
    /// Nearest-point picks triggered by clicks.
    Pick,
    /// Pointer movement.
    Move,
    /// Keyboard key presses.
    KeyPress,
}

impl EventCategory {
    fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Click => "click",
            EventCategory::Pick => "pick",
            EventCategory::Move => "move",
            EventCategory::KeyPress => "keypress",
        }
    }
}

/// What kind of callback a [`CallbackId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Callback registered with the event dispatcher.
    Event(EventCategory),
    /// Layer activation callback registered with the layer registry.
    LayerActivation,
}

/// Opaque handle to a registered callback, returned by the attach methods
/// and used for removal. Unique per event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId {
    kind: CallbackKind,
    seq: u64,
}

impl CallbackId {
    pub(crate) fn new(kind: CallbackKind, seq: u64) -> Self {
        Self { kind, seq }
    }

    pub(crate) fn kind(&self) -> CallbackKind {
        self.kind
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            CallbackKind::Event(category) => category.as_str(),
            CallbackKind::LayerActivation => "activation",
        };
        write!(f, "{}/{}", kind, self.seq)
    }
}

/// Mouse button enum.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left (primary) mouse button.
    Left,
    /// Middle mouse button or wheel click.
    Middle,
    /// Right (secondary) mouse button.
    Right,
    /// Any other button.
    Other,
}

/// Keyboard key, reduced to what the dispatcher needs for callbacks and
/// modifier tracking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character key.
    Char(char),
    /// The escape key. Cancels any active sticky modifier.
    Escape,
    /// The enter key.
    Enter,
    /// The space bar.
    Space,
    /// Either control key. Combined with another key it toggles sticky
    /// modifiers.
    Control,
    /// Either shift key.
    Shift,
    /// Either alt key.
    Alt,
}

/// Raw input event as reported by the host toolkit.
///
/// This type carries no input state: which buttons or keys are currently
/// held is tracked by the [`EventDispatcher`] that consumes these events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInputEvent {
    /// A mouse button was pressed.
    ButtonPressed(MouseButton),
    /// A mouse button was released.
    ButtonReleased(MouseButton),
    /// The pointer moved to the given screen pixel position.
    PointerMoved(Point2d),
    /// A keyboard key was pressed.
    KeyPressed(Key),
    /// A keyboard key was released.
    KeyReleased(Key),
}

/// Payload of a click callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    /// Button that was clicked.
    pub button: MouseButton,
    /// Pointer position in screen pixels from the top-left corner.
    pub screen_position: Point2d,
    /// Pointer position in projected map coordinates.
    pub map_position: Point2d,
    /// The modifier that was active for the click category.
    pub modifier: Option<Key>,
    /// True for the second click of a double-click sequence.
    pub double: bool,
}

/// Payload of a move callback.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvent {
    /// Pointer position in screen pixels from the top-left corner.
    pub screen_position: Point2d,
    /// Pointer position in projected map coordinates.
    pub map_position: Point2d,
    /// The modifier that was active for the move category.
    pub modifier: Option<Key>,
}

/// Payload of a keypress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// The key that was pressed.
    pub key: Key,
    /// The modifier that was active for the keypress category.
    pub modifier: Option<Key>,
}

/// Payload of a pick callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PickEvent {
    /// Layer whose dataset was queried.
    pub layer: String,
    /// Query position in projected map coordinates.
    pub query: Point2d,
    /// Points found near the query position. May be empty.
    pub result: PickResult,
    /// Button of the click that triggered the pick.
    pub button: MouseButton,
    /// The modifier that was active for the pick category.
    pub modifier: Option<Key>,
}

/// Event data passed to callbacks, tagged by category.
///
/// Every variant documents exactly which fields are present for its
/// category; there are no free-form keyword bags.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// A mouse button was clicked (or double-clicked).
    Click(ClickEvent),
    /// A pick query was executed in response to a click.
    Pick(PickEvent),
    /// The pointer moved.
    Move(MoveEvent),
    /// A key was pressed.
    Key(KeyEvent),
}

impl EventPayload {
    /// The category this payload belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventPayload::Click(_) => EventCategory::Click,
            EventPayload::Pick(_) => EventCategory::Pick,
            EventPayload::Move(_) => EventCategory::Move,
            EventPayload::Key(_) => EventCategory::KeyPress,
        }
    }
}
