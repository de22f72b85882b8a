use ahash::{HashMap, HashMapExt, HashSet};

use crate::control::{CallbackId, CallbackKind};
use crate::error::OrteliusError;

/// Name of the special layer whose artists take part in the rendering of
/// every other layer.
pub const ALL_LAYER: &str = "all";

/// One member of the visible layer composition: a layer name plus the
/// opacity it is composited with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerSpec {
    name: String,
    opacity: f32,
}

impl LayerSpec {
    /// Creates a spec showing the layer with the given opacity
    /// (`1.0` = fully opaque).
    pub fn new(name: impl Into<String>, opacity: f32) -> Self {
        Self {
            name: name.into(),
            opacity,
        }
    }

    /// Name of the layer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opacity the layer is composited with.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}

impl From<&str> for LayerSpec {
    fn from(name: &str) -> Self {
        Self::new(name, 1.0)
    }
}

impl From<String> for LayerSpec {
    fn from(name: String) -> Self {
        Self::new(name, 1.0)
    }
}

impl From<(&str, f32)> for LayerSpec {
    fn from((name, opacity): (&str, f32)) -> Self {
        Self::new(name, opacity)
    }
}

impl From<(String, f32)> for LayerSpec {
    fn from((name, opacity): (String, f32)) -> Self {
        Self::new(name, opacity)
    }
}

type ActivationCallback = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct LayerInfo {
    activation_callbacks: Vec<(CallbackId, ActivationCallback)>,
}

/// Source of truth for which layers exist and which are currently visible.
///
/// Layers are created on first reference: referring to a layer name in
/// [`LayerRegistry::show_layer`], an artist registration or an activation
/// callback is enough to bring it into existence. The registry owns no
/// drawable content itself; artists live in the
/// [`BlitManager`](crate::render::BlitManager), keyed by the same layer
/// names.
#[derive(Default)]
pub struct LayerRegistry {
    layers: HashMap<String, LayerInfo>,
    composition: Vec<LayerSpec>,
    next_seq: u64,
}

impl LayerRegistry {
    /// Creates a registry with no layers.
    pub fn new() -> Self {
        Self {
            layers: HashMap::new(),
            composition: vec![],
            next_seq: 0,
        }
    }

    /// Makes sure the layer exists, creating it if needed.
    pub fn ensure_layer(&mut self, name: impl Into<String>) {
        self.layers.entry(name.into()).or_default();
    }

    /// Returns true if the layer exists.
    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Iterates over the names of all known layers in no particular order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.layers.keys().map(|name| name.as_str())
    }

    /// Removes a layer and its activation callbacks. The layer also leaves
    /// the visible composition.
    pub fn remove_layer(&mut self, name: &str) {
        self.layers.remove(name);
        self.composition.retain(|spec| spec.name() != name);
    }

    /// Replaces the visible composition.
    ///
    /// Duplicate names within one call collapse to their first occurrence,
    /// so showing a composition twice yields the same state. The first
    /// named layer is the bottom of the stack. Returns the names of layers
    /// that were not visible before this call; their activation callbacks
    /// have been fired (once per transition into visibility, not on every
    /// redraw).
    pub fn show_layer(
        &mut self,
        specs: impl IntoIterator<Item = impl Into<LayerSpec>>,
    ) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::default();
        let mut composition: Vec<LayerSpec> = vec![];
        for spec in specs {
            let spec = spec.into();
            if seen.insert(spec.name().to_string()) {
                self.ensure_layer(spec.name());
                composition.push(spec);
            }
        }

        let previous: HashSet<String> = self
            .composition
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();

        self.composition = composition;

        let activated: Vec<String> = self
            .composition
            .iter()
            .filter(|spec| !previous.contains(spec.name()))
            .map(|spec| spec.name().to_string())
            .collect();

        for name in &activated {
            if let Some(info) = self.layers.get_mut(name) {
                for (_, callback) in &mut info.activation_callbacks {
                    callback(name);
                }
            }
        }

        activated
    }

    /// The currently visible composition, bottom first.
    pub fn composition(&self) -> &[LayerSpec] {
        &self.composition
    }

    /// Returns true if the layer takes part in the current composition.
    /// The [`ALL_LAYER`] is always considered visible.
    pub fn is_visible(&self, name: &str) -> bool {
        name == ALL_LAYER || self.composition.iter().any(|spec| spec.name() == name)
    }

    /// Registers a callback fired every time the layer transitions from
    /// hidden to visible. Creates the layer if needed.
    pub fn on_activation(
        &mut self,
        layer: impl Into<String>,
        callback: impl FnMut(&str) + 'static,
    ) -> CallbackId {
        self.next_seq += 1;
        let id = CallbackId::new(CallbackKind::LayerActivation, self.next_seq);
        self.layers
            .entry(layer.into())
            .or_default()
            .activation_callbacks
            .push((id, Box::new(callback)));
        id
    }

    /// Unregisters an activation callback.
    ///
    /// Returns [`OrteliusError::CallbackNotFound`] if the id is unknown.
    pub fn remove_activation(&mut self, id: CallbackId) -> Result<(), OrteliusError> {
        for info in self.layers.values_mut() {
            if let Some(position) = info
                .activation_callbacks
                .iter()
                .position(|(callback_id, _)| *callback_id == id)
            {
                info.activation_callbacks.remove(position);
                return Ok(());
            }
        }

        Err(OrteliusError::CallbackNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn layers_are_created_on_first_reference() {
        let mut registry = LayerRegistry::new();
        assert!(!registry.contains("coastlines"));

        registry.show_layer(["coastlines"]);
        assert!(registry.contains("coastlines"));
    }

    #[test]
    fn showing_a_composition_twice_is_idempotent() {
        let mut registry = LayerRegistry::new();
        let activated = registry.show_layer(["a"]);
        assert_eq!(activated, vec!["a".to_string()]);

        let activated = registry.show_layer(["a"]);
        assert!(activated.is_empty());
        assert_eq!(registry.composition().len(), 1);
    }

    #[test]
    fn duplicate_names_collapse_to_first_occurrence() {
        let mut registry = LayerRegistry::new();
        registry.show_layer([("a", 0.3), ("b", 1.0), ("a", 0.9)]);

        let composition = registry.composition();
        assert_eq!(composition.len(), 2);
        assert_eq!(composition[0], LayerSpec::new("a", 0.3));
        assert_eq!(composition[1], LayerSpec::new("b", 1.0));
    }

    #[test]
    fn composition_preserves_order_and_opacity() {
        let mut registry = LayerRegistry::new();
        registry.show_layer([("a", 1.0), ("b", 0.5)]);
        assert_eq!(
            registry.composition(),
            &[LayerSpec::new("a", 1.0), LayerSpec::new("b", 0.5)]
        );

        registry.show_layer([("b", 0.5), ("a", 1.0)]);
        assert_eq!(
            registry.composition(),
            &[LayerSpec::new("b", 0.5), LayerSpec::new("a", 1.0)]
        );
    }

    #[test]
    fn all_layer_is_always_visible() {
        let registry = LayerRegistry::new();
        assert!(registry.is_visible(ALL_LAYER));
        assert!(!registry.is_visible("a"));
    }

    #[test]
    fn activation_fires_once_per_transition() {
        let mut registry = LayerRegistry::new();
        let activations = Rc::new(RefCell::new(vec![]));

        let log = activations.clone();
        registry.on_activation("a", move |name| log.borrow_mut().push(name.to_string()));

        registry.show_layer(["a"]);
        registry.show_layer(["a"]); // still visible, no transition
        registry.show_layer(["b"]); // hides "a"
        registry.show_layer(["a", "b"]); // shows it again

        assert_eq!(*activations.borrow(), vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn removing_unknown_activation_callback_is_reported() {
        let mut registry = LayerRegistry::new();
        let id = registry.on_activation("a", |_| {});
        registry.remove_activation(id).expect("id is registered");
        assert_matches!(
            registry.remove_activation(id),
            Err(OrteliusError::CallbackNotFound(_))
        );
    }

    #[test]
    fn removed_layer_leaves_the_composition() {
        let mut registry = LayerRegistry::new();
        registry.show_layer(["a", "b"]);
        registry.remove_layer("a");
        assert!(!registry.contains("a"));
        assert_eq!(registry.composition(), &[LayerSpec::new("b", 1.0)]);
    }
}
