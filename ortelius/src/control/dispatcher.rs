use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use ahash::HashSet;
use ortelius_types::cartesian::Point2d;
use parking_lot::Mutex;
use web_time::SystemTime;

use crate::control::{
    CallbackId, CallbackKind, ClickEvent, EventCategory, EventPayload, Key, KeyEvent, MouseButton,
    MoveEvent, PickEvent, RawInputEvent,
};
use crate::error::OrteliusError;
use crate::map::Map;
use crate::pick::PickConfig;

/// Callback invoked by the dispatcher. Returning an error does not stop the
/// dispatch cycle: the error is logged and the remaining callbacks for the
/// same event still run.
pub type EventCallback = Box<dyn FnMut(&EventPayload, &mut Map) -> Result<(), OrteliusError>>;

/// Registration options for a click callback.
#[derive(Debug, Clone, Default)]
pub struct ClickOptions {
    layer: Option<String>,
    button: Option<MouseButton>,
    modifier: Option<Key>,
    double_click: bool,
}

impl ClickOptions {
    /// Gates the callback on the given layer being visible.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Sets the button the callback reacts to. Defaults to
    /// [`MouseButton::Left`].
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    /// Requires the given modifier to be active for the callback to fire.
    pub fn with_modifier(mut self, modifier: Key) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Makes the callback react to double clicks instead of single clicks.
    pub fn with_double_click(mut self) -> Self {
        self.double_click = true;
        self
    }
}

/// Registration options for a move callback.
#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    layer: Option<String>,
    modifier: Option<Key>,
}

impl MoveOptions {
    /// Gates the callback on the given layer being visible.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Requires the given modifier to be active for the callback to fire.
    pub fn with_modifier(mut self, modifier: Key) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

/// Registration options for a keypress callback.
#[derive(Debug, Clone, Default)]
pub struct KeyOptions {
    layer: Option<String>,
    key: Option<Key>,
    modifier: Option<Key>,
}

impl KeyOptions {
    /// Gates the callback on the given layer being visible.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Makes the callback react only to the given key. By default it reacts
    /// to any key.
    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Requires the given modifier to be active for the callback to fire.
    pub fn with_modifier(mut self, modifier: Key) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

/// Registration options for a pick callback. The layer names the dataset to
/// query and also gates the callback on that layer being visible.
#[derive(Debug, Clone)]
pub struct PickOptions {
    layer: String,
    button: MouseButton,
    modifier: Option<Key>,
    config: PickConfig,
}

impl PickOptions {
    /// Creates pick options for the dataset of the given layer.
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            button: MouseButton::Left,
            modifier: None,
            config: PickConfig::default(),
        }
    }

    /// Sets the button that triggers the pick. Defaults to
    /// [`MouseButton::Left`].
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    /// Requires the given modifier to be active for the callback to fire.
    pub fn with_modifier(mut self, modifier: Key) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Sets the pick query parameters (neighbor count, search radius,
    /// relative-to-closest).
    pub fn with_config(mut self, config: PickConfig) -> Self {
        self.config = config;
        self
    }
}

struct CallbackEntry {
    id: CallbackId,
    layer: Option<String>,
    button: Option<MouseButton>,
    key: Option<Key>,
    modifier: Option<Key>,
    double_click: bool,
    pick: Option<PickConfig>,
    callback: EventCallback,
}

enum QueuedDispatch {
    Event(EventPayload),
    PickRound {
        button: MouseButton,
        map_position: Point2d,
    },
}

#[derive(Default)]
struct CategoryState {
    callbacks: Vec<CallbackEntry>,
    dispatching: bool,
    queue: VecDeque<QueuedDispatch>,
    sticky_candidates: HashSet<Key>,
    active_sticky: Option<Key>,
}

struct PendingClick {
    event: ClickEvent,
    created: SystemTime,
    muted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkMode {
    Share,
    Forward,
}

struct LinkedEvent {
    event: RawInputEvent,
    at: SystemTime,
    mode: LinkMode,
}

type LinkQueue = Mutex<VecDeque<LinkedEvent>>;

struct Link {
    target: Weak<LinkQueue>,
    mode: LinkMode,
}

/// Routes raw input events to registered callbacks.
///
/// The dispatcher keeps all interaction state: held keys, sticky modifiers,
/// the click buffered for double-click detection, and the per-category
/// `Idle -> Dispatching -> Idle` state machine. It lives next to the
/// [`Map`], not inside it, so that callbacks can freely mutate the map.
///
/// Events are normally handled with [`EventDispatcher::handle`]. The host
/// should also call [`EventDispatcher::poll`] when idle so that buffered
/// clicks and events from linked maps get delivered.
pub struct EventDispatcher {
    click: CategoryState,
    pick: CategoryState,
    pointer_move: CategoryState,
    keypress: CategoryState,
    next_seq: u64,
    pointer_position: Point2d,
    last_pressed_time: SystemTime,
    pending_click: Option<PendingClick>,
    held_keys: HashSet<Key>,
    links: Vec<Link>,
    inbox: Arc<LinkQueue>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self {
            click: CategoryState::default(),
            pick: CategoryState::default(),
            pointer_move: CategoryState::default(),
            keypress: CategoryState::default(),
            next_seq: 0,
            pointer_position: Point2d::new(0.0, 0.0),
            last_pressed_time: SystemTime::UNIX_EPOCH,
            pending_click: None,
            held_keys: HashSet::default(),
            links: vec![],
            inbox: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no callbacks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a click callback. Returns the handle to remove it with.
    pub fn on_click(
        &mut self,
        options: ClickOptions,
        callback: impl FnMut(&EventPayload, &mut Map) -> Result<(), OrteliusError> + 'static,
    ) -> CallbackId {
        let id = self.next_id(EventCategory::Click);
        self.click.callbacks.push(CallbackEntry {
            id,
            layer: options.layer,
            button: Some(options.button.unwrap_or(MouseButton::Left)),
            key: None,
            modifier: options.modifier,
            double_click: options.double_click,
            pick: None,
            callback: Box::new(callback),
        });
        id
    }

    /// Registers a move callback. Returns the handle to remove it with.
    pub fn on_move(
        &mut self,
        options: MoveOptions,
        callback: impl FnMut(&EventPayload, &mut Map) -> Result<(), OrteliusError> + 'static,
    ) -> CallbackId {
        let id = self.next_id(EventCategory::Move);
        self.pointer_move.callbacks.push(CallbackEntry {
            id,
            layer: options.layer,
            button: None,
            key: None,
            modifier: options.modifier,
            double_click: false,
            pick: None,
            callback: Box::new(callback),
        });
        id
    }

    /// Registers a keypress callback. Returns the handle to remove it with.
    pub fn on_key(
        &mut self,
        options: KeyOptions,
        callback: impl FnMut(&EventPayload, &mut Map) -> Result<(), OrteliusError> + 'static,
    ) -> CallbackId {
        let id = self.next_id(EventCategory::KeyPress);
        self.keypress.callbacks.push(CallbackEntry {
            id,
            layer: options.layer,
            button: None,
            key: options.key,
            modifier: options.modifier,
            double_click: false,
            pick: None,
            callback: Box::new(callback),
        });
        id
    }

    /// Registers a pick callback. Every click with the matching button and
    /// modifier queries the dataset of the callback's layer and invokes the
    /// callback with the result (which may be empty).
    pub fn on_pick(
        &mut self,
        options: PickOptions,
        callback: impl FnMut(&EventPayload, &mut Map) -> Result<(), OrteliusError> + 'static,
    ) -> CallbackId {
        let id = self.next_id(EventCategory::Pick);
        self.pick.callbacks.push(CallbackEntry {
            id,
            layer: Some(options.layer),
            button: Some(options.button),
            key: None,
            modifier: options.modifier,
            double_click: false,
            pick: Some(options.config),
            callback: Box::new(callback),
        });
        id
    }

    /// Unregisters a callback.
    ///
    /// Returns [`OrteliusError::CallbackNotFound`] if the id is unknown;
    /// callers that do not care can log and ignore the error.
    pub fn remove(&mut self, id: CallbackId) -> Result<(), OrteliusError> {
        let CallbackKind::Event(category) = id.kind() else {
            log::warn!("tried to remove non-event callback {id} from the dispatcher");
            return Err(OrteliusError::CallbackNotFound(id));
        };

        let state = self.category_mut(category);
        match state.callbacks.iter().position(|entry| entry.id == id) {
            Some(position) => {
                state.callbacks.remove(position);
                Ok(())
            }
            None => {
                log::warn!("tried to remove unknown callback {id}");
                Err(OrteliusError::CallbackNotFound(id))
            }
        }
    }

    /// Marks the given keys as sticky candidates for the category.
    ///
    /// Pressing `ctrl+K` for a candidate `K` makes it the active modifier
    /// of the category until `escape` is pressed, `ctrl+K` is pressed again
    /// or a different candidate is activated.
    pub fn set_sticky_modifiers(
        &mut self,
        category: EventCategory,
        keys: impl IntoIterator<Item = Key>,
    ) {
        let state = self.category_mut(category);
        state.sticky_candidates = keys.into_iter().collect();
        if let Some(active) = state.active_sticky {
            if !state.sticky_candidates.contains(&active) {
                state.active_sticky = None;
            }
        }
    }

    /// The modifier that would gate callbacks of the category right now:
    /// the active sticky modifier if any, otherwise a held key that some
    /// callback of the category uses as its modifier.
    pub fn active_modifier(&self, category: EventCategory) -> Option<Key> {
        let state = self.category(category);
        if let Some(key) = state.active_sticky {
            return Some(key);
        }

        state
            .callbacks
            .iter()
            .filter_map(|entry| entry.modifier)
            .find(|modifier| self.held_keys.contains(modifier))
    }

    /// Links two dispatchers so that raw events handled by either one are
    /// replayed on the other, where they run the other map's own callbacks.
    ///
    /// Replayed events are delivered through [`EventDispatcher::poll`].
    pub fn share_events(&mut self, other: &mut EventDispatcher) {
        self.links.push(Link {
            target: Arc::downgrade(&other.inbox),
            mode: LinkMode::Share,
        });
        other.links.push(Link {
            target: Arc::downgrade(&self.inbox),
            mode: LinkMode::Share,
        });
    }

    /// Links two dispatchers so that raw events handled by this one are
    /// replayed on `other` with its callbacks suppressed: the other
    /// dispatcher updates its interaction state (modifiers, buffered
    /// clicks) but does not invoke user callbacks.
    ///
    /// Replayed events are delivered through [`EventDispatcher::poll`].
    pub fn forward_events(&mut self, other: &mut EventDispatcher) {
        self.links.push(Link {
            target: Arc::downgrade(&other.inbox),
            mode: LinkMode::Forward,
        });
    }

    /// Handles a raw input event, timestamped with the current time.
    pub fn handle(&mut self, event: RawInputEvent, map: &mut Map) {
        self.handle_at(event, map, SystemTime::now());
    }

    /// Handles a raw input event with an explicit timestamp. Useful for
    /// deterministic tests and event replay.
    pub fn handle_at(&mut self, event: RawInputEvent, map: &mut Map, now: SystemTime) {
        self.flush_pending_click(map, now);
        self.process(event, map, now, false);
        self.publish(event, now);
    }

    /// Delivers buffered clicks whose double-click window expired and any
    /// events replayed from linked dispatchers. Hosts should call this when
    /// the event loop is idle.
    pub fn poll(&mut self, map: &mut Map) {
        self.poll_at(map, SystemTime::now());
    }

    /// [`EventDispatcher::poll`] with an explicit current time.
    pub fn poll_at(&mut self, map: &mut Map, now: SystemTime) {
        loop {
            let Some(linked) = self.inbox.lock().pop_front() else {
                break;
            };
            self.flush_pending_click(map, linked.at);
            self.process(linked.event, map, linked.at, linked.mode == LinkMode::Forward);
        }

        self.flush_pending_click(map, now);
    }

    fn category(&self, category: EventCategory) -> &CategoryState {
        match category {
            EventCategory::Click => &self.click,
            EventCategory::Pick => &self.pick,
            EventCategory::Move => &self.pointer_move,
            EventCategory::KeyPress => &self.keypress,
        }
    }

    fn category_mut(&mut self, category: EventCategory) -> &mut CategoryState {
        match category {
            EventCategory::Click => &mut self.click,
            EventCategory::Pick => &mut self.pick,
            EventCategory::Move => &mut self.pointer_move,
            EventCategory::KeyPress => &mut self.keypress,
        }
    }

    fn next_id(&mut self, category: EventCategory) -> CallbackId {
        self.next_seq += 1;
        CallbackId::new(CallbackKind::Event(category), self.next_seq)
    }

    fn process(&mut self, event: RawInputEvent, map: &mut Map, now: SystemTime, muted: bool) {
        match event {
            RawInputEvent::ButtonPressed(_) => {
                self.last_pressed_time = now;
            }
            RawInputEvent::ButtonReleased(button) => {
                let click_timeout = map.config().click_timeout();
                let held_for = now
                    .duration_since(self.last_pressed_time)
                    .unwrap_or_default();
                if held_for < click_timeout {
                    self.on_raw_click(button, map, now, muted);
                }
            }
            RawInputEvent::PointerMoved(position) => {
                self.pointer_position = position;
                let payload = EventPayload::Move(MoveEvent {
                    screen_position: position,
                    map_position: map.view().px_to_map(position),
                    modifier: self.active_modifier(EventCategory::Move),
                });
                self.dispatch(EventCategory::Move, payload, map, muted);
            }
            RawInputEvent::KeyPressed(key) => {
                if key == Key::Escape {
                    self.clear_sticky_modifiers();
                } else if self.held_keys.contains(&Key::Control) {
                    self.toggle_sticky(key);
                }
                self.held_keys.insert(key);

                let payload = EventPayload::Key(KeyEvent {
                    key,
                    modifier: self.active_modifier(EventCategory::KeyPress),
                });
                self.dispatch(EventCategory::KeyPress, payload, map, muted);
            }
            RawInputEvent::KeyReleased(key) => {
                self.held_keys.remove(&key);
            }
        }
    }

    fn clear_sticky_modifiers(&mut self) {
        for category in [
            EventCategory::Click,
            EventCategory::Pick,
            EventCategory::Move,
            EventCategory::KeyPress,
        ] {
            self.category_mut(category).active_sticky = None;
        }
    }

    fn toggle_sticky(&mut self, key: Key) {
        for category in [
            EventCategory::Click,
            EventCategory::Pick,
            EventCategory::Move,
            EventCategory::KeyPress,
        ] {
            let state = self.category_mut(category);
            if state.sticky_candidates.contains(&key) {
                state.active_sticky = if state.active_sticky == Some(key) {
                    None
                } else {
                    Some(key)
                };
            }
        }
    }

    fn on_raw_click(&mut self, button: MouseButton, map: &mut Map, now: SystemTime, muted: bool) {
        let map_position = map.view().px_to_map(self.pointer_position);

        let completes_double = match &self.pending_click {
            Some(pending) if pending.event.button == button => {
                now.duration_since(pending.created).unwrap_or_default()
                    < map.config().double_click_interval()
            }
            _ => false,
        };

        if completes_double {
            // The buffered first click is cancelled, not delivered.
            let muted_pair = self
                .pending_click
                .take()
                .map(|pending| pending.muted)
                .unwrap_or(muted);
            let event = ClickEvent {
                button,
                screen_position: self.pointer_position,
                map_position,
                modifier: self.active_modifier(EventCategory::Click),
                double: true,
            };
            self.dispatch(
                EventCategory::Click,
                EventPayload::Click(event),
                map,
                muted || muted_pair,
            );
        } else {
            // A pending click for another button is delivered before the
            // new one takes its place.
            if let Some(pending) = self.pending_click.take() {
                self.dispatch(
                    EventCategory::Click,
                    EventPayload::Click(pending.event),
                    map,
                    pending.muted,
                );
            }

            let event = ClickEvent {
                button,
                screen_position: self.pointer_position,
                map_position,
                modifier: self.active_modifier(EventCategory::Click),
                double: false,
            };
            self.pending_click = Some(PendingClick {
                event,
                created: now,
                muted,
            });
        }

        self.dispatch_picks(button, map_position, map, muted);
    }

    fn flush_pending_click(&mut self, map: &mut Map, now: SystemTime) {
        let interval = map.config().double_click_interval();
        let expired = match &self.pending_click {
            Some(pending) => now.duration_since(pending.created).unwrap_or_default() >= interval,
            None => false,
        };

        if expired {
            if let Some(pending) = self.pending_click.take() {
                self.dispatch(
                    EventCategory::Click,
                    EventPayload::Click(pending.event),
                    map,
                    pending.muted,
                );
            }
        }
    }

    fn dispatch(
        &mut self,
        category: EventCategory,
        payload: EventPayload,
        map: &mut Map,
        muted: bool,
    ) {
        if muted {
            return;
        }

        {
            let state = self.category_mut(category);
            if state.dispatching {
                state.queue.push_back(QueuedDispatch::Event(payload));
                return;
            }
            state.dispatching = true;
        }

        self.run_callbacks(category, &payload, map);
        self.finish_dispatch(category, map);
    }

    fn run_callbacks(&mut self, category: EventCategory, payload: &EventPayload, map: &mut Map) {
        let (button, key, modifier, double) = match payload {
            EventPayload::Click(event) => (Some(event.button), None, event.modifier, event.double),
            EventPayload::Move(event) => (None, None, event.modifier, false),
            EventPayload::Key(event) => (None, Some(event.key), event.modifier, false),
            // Picks carry a per-callback payload and go through
            // dispatch_picks instead.
            EventPayload::Pick(_) => return,
        };

        let matching: Vec<usize> = self
            .category(category)
            .callbacks
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry_matches(entry, button, key, modifier, double)
                    && layer_visible(map, entry.layer.as_deref())
            })
            .map(|(index, _)| index)
            .collect();

        for index in matching {
            let entry = &mut self.category_mut(category).callbacks[index];
            let id = entry.id;
            if let Err(error) = (entry.callback)(payload, map) {
                log::error!("callback {id} failed: {error}");
            }
        }
    }

    fn dispatch_picks(&mut self, button: MouseButton, map_position: Point2d, map: &mut Map, muted: bool) {
        if muted {
            return;
        }

        {
            let state = &mut self.pick;
            if state.dispatching {
                state.queue.push_back(QueuedDispatch::PickRound {
                    button,
                    map_position,
                });
                return;
            }
            if state.callbacks.is_empty() {
                return;
            }
            state.dispatching = true;
        }

        let modifier = self.active_modifier(EventCategory::Pick);
        let matching: Vec<usize> = self
            .pick
            .callbacks
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry.button == Some(button)
                    && entry.modifier == modifier
                    && layer_visible(map, entry.layer.as_deref())
            })
            .map(|(index, _)| index)
            .collect();

        for index in matching {
            let (layer, config) = {
                let entry = &self.pick.callbacks[index];
                (
                    entry.layer.clone().unwrap_or_default(),
                    entry.pick.unwrap_or_default(),
                )
            };

            let result = match map.pick(&layer, map_position, &config) {
                Ok(result) => result,
                Err(error) => {
                    log::debug!("pick on layer {layer} skipped: {error}");
                    continue;
                }
            };

            let payload = EventPayload::Pick(PickEvent {
                layer,
                query: map_position,
                result,
                button,
                modifier,
            });

            let entry = &mut self.pick.callbacks[index];
            let id = entry.id;
            if let Err(error) = (entry.callback)(&payload, map) {
                log::error!("callback {id} failed: {error}");
            }
        }

        self.finish_dispatch(EventCategory::Pick, map);
    }

    fn finish_dispatch(&mut self, category: EventCategory, map: &mut Map) {
        self.category_mut(category).dispatching = false;

        while let Some(queued) = self.category_mut(category).queue.pop_front() {
            match queued {
                QueuedDispatch::Event(payload) => self.dispatch(category, payload, map, false),
                QueuedDispatch::PickRound {
                    button,
                    map_position,
                } => self.dispatch_picks(button, map_position, map, false),
            }
        }
    }

    fn publish(&mut self, event: RawInputEvent, now: SystemTime) {
        self.links.retain(|link| link.target.strong_count() > 0);
        for link in &self.links {
            if let Some(inbox) = link.target.upgrade() {
                inbox.lock().push_back(LinkedEvent {
                    event,
                    at: now,
                    mode: link.mode,
                });
            }
        }
    }
}

fn entry_matches(
    entry: &CallbackEntry,
    button: Option<MouseButton>,
    key: Option<Key>,
    modifier: Option<Key>,
    double: bool,
) -> bool {
    if let Some(button) = button {
        if entry.button != Some(button) {
            return false;
        }
    }

    if let Some(key) = key {
        if let Some(entry_key) = entry.key {
            if entry_key != key {
                return false;
            }
        }
    }

    entry.double_click == double && entry.modifier == modifier
}

fn layer_visible(map: &Map, layer: Option<&str>) -> bool {
    layer.map_or(true, |name| map.layers().is_visible(name))
}
