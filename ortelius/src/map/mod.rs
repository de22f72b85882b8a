//! The map itself: view, layers, datasets and the redraw machinery.

use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use ortelius_types::cartesian::{CartesianPoint2d, Point2d, Size};
use ortelius_types::geo::Projection;

use crate::config::CoreConfig;
use crate::error::OrteliusError;
use crate::messenger::Messenger;
use crate::pick::{PickConfig, PickResult, Picker};
use crate::render::{Artist, ArtistId, BlitManager, Canvas};
use crate::view::MapView;

mod layer_registry;

pub use layer_registry::{LayerRegistry, LayerSpec, ALL_LAYER};

/// Map composes the view, the layer registry, the redraw coordinator and
/// the per-layer datasets used for picking.
///
/// The map does not handle input by itself: an
/// [`EventDispatcher`](crate::control::EventDispatcher) lives next to it
/// and mutates it from inside callbacks.
pub struct Map {
    view: MapView,
    layers: LayerRegistry,
    blit: BlitManager,
    pickers: HashMap<String, Picker>,
    messenger: Option<Box<dyn Messenger>>,
    config: CoreConfig,
}

impl Map {
    /// Creates a new map.
    pub fn new(
        view: MapView,
        config: CoreConfig,
        messenger: Option<Box<dyn Messenger + 'static>>,
    ) -> Self {
        Self {
            view,
            layers: LayerRegistry::new(),
            blit: BlitManager::new(),
            pickers: HashMap::new(),
            messenger,
            config,
        }
    }

    /// Current view of the map.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Changes the view of the map. Cached background snapshots become
    /// stale implicitly: they are keyed by the view extent.
    pub fn set_view(&mut self, view: MapView) {
        self.view = view;
        self.redraw();
    }

    /// Sets the pixel size of the map.
    pub fn set_size(&mut self, size: Size) {
        self.view = self.view.with_size(size);
        self.redraw();
    }

    /// Configuration of the interactive core.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Replaces the configuration.
    pub fn set_config(&mut self, config: CoreConfig) {
        self.config = config;
    }

    /// The layer registry.
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Mutable access to the layer registry.
    pub fn layers_mut(&mut self) -> &mut LayerRegistry {
        &mut self.layers
    }

    /// Replaces the visible layer composition; see
    /// [`LayerRegistry::show_layer`]. Requests a redraw.
    pub fn show_layer(
        &mut self,
        specs: impl IntoIterator<Item = impl Into<LayerSpec>>,
    ) -> Vec<String> {
        let activated = self.layers.show_layer(specs);
        self.redraw();
        activated
    }

    /// Registers a background artist on the layer, creating the layer if
    /// needed. See [`BlitManager::add_bg_artist`].
    pub fn add_bg_artist(
        &mut self,
        artist: &Arc<dyn Artist>,
        layer: impl Into<String>,
        z_index: i32,
    ) -> ArtistId {
        let layer = layer.into();
        self.layers.ensure_layer(layer.clone());
        let id = self.blit.add_bg_artist(artist, layer, z_index);
        self.redraw();
        id
    }

    /// Registers a dynamic artist on the layer, creating the layer if
    /// needed. See [`BlitManager::add_artist`].
    pub fn add_artist(
        &mut self,
        artist: &Arc<dyn Artist>,
        layer: impl Into<String>,
        z_index: i32,
    ) -> ArtistId {
        let layer = layer.into();
        self.layers.ensure_layer(layer.clone());
        let id = self.blit.add_artist(artist, layer, z_index);
        self.redraw();
        id
    }

    /// Unregisters an artist. Returns false if the id is unknown.
    pub fn remove_artist(&mut self, id: ArtistId) -> bool {
        let removed = self.blit.remove_artist(id);
        if removed {
            self.redraw();
        }
        removed
    }

    /// Discards the cached background snapshot of the layer and requests a
    /// redraw.
    pub fn invalidate(&mut self, layer: &str) {
        self.blit.invalidate(layer);
        self.redraw();
    }

    /// Removes a layer: its artists, its cached snapshot, its dataset and
    /// its activation callbacks.
    pub fn remove_layer(&mut self, layer: &str) {
        self.layers.remove_layer(layer);
        self.blit.remove_layer(layer);
        self.pickers.remove(layer);
        self.redraw();
    }

    /// Sets the pickable dataset of a layer from coordinates that are
    /// already in plot-projection space. The spatial index is rebuilt from
    /// scratch. `values` is an optional value column aligned with `points`.
    pub fn set_data<P: CartesianPoint2d<Num = f64>>(
        &mut self,
        layer: impl Into<String>,
        points: &[P],
        values: Option<Vec<f64>>,
    ) -> Result<(), OrteliusError> {
        let layer = layer.into();
        self.layers.ensure_layer(layer.clone());

        let mut picker = Picker::with_radius_scale(self.config.pick_radius_scale());
        picker.set_data(points, values)?;
        self.pickers.insert(layer, picker);
        Ok(())
    }

    /// Sets the pickable dataset of a layer, projecting the coordinates
    /// first. Points the projection cannot map are excluded from the index
    /// but keep their dataset indices.
    pub fn set_data_projected<P>(
        &mut self,
        layer: impl Into<String>,
        points: &[P::InPoint],
        values: Option<Vec<f64>>,
        projection: &P,
    ) -> Result<(), OrteliusError>
    where
        P: Projection<OutPoint = Point2d> + ?Sized,
    {
        let projected: Vec<Point2d> = points
            .iter()
            .map(|point| {
                projection
                    .project(point)
                    .unwrap_or_else(|| Point2d::new(f64::NAN, f64::NAN))
            })
            .collect();
        self.set_data(layer, &projected, values)
    }

    /// Drops the dataset of a layer. Picking on it becomes a programmer
    /// error again.
    pub fn clear_data(&mut self, layer: &str) {
        self.pickers.remove(layer);
    }

    /// Finds the data points of the layer's dataset nearest to `query` (in
    /// projected map coordinates).
    ///
    /// Returns [`OrteliusError::IndexNotReady`] when the layer has no
    /// dataset.
    pub fn pick(
        &self,
        layer: &str,
        query: Point2d,
        config: &PickConfig,
    ) -> Result<PickResult, OrteliusError> {
        let picker = self.pickers.get(layer).ok_or(OrteliusError::IndexNotReady)?;
        picker.pick(query, config)
    }

    /// Renders the currently visible composition to the canvas through the
    /// blit manager.
    pub fn update(&mut self, canvas: &mut dyn Canvas) {
        let Map {
            ref mut blit,
            ref layers,
            ref view,
            ..
        } = *self;
        blit.update(canvas, layers.composition(), view);
    }

    /// Requests an asynchronous redraw of the map via the messenger.
    pub fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    /// Sets the new messenger for the map.
    pub fn set_messenger(&mut self, messenger: Option<impl Messenger + 'static>) {
        self.messenger = match messenger {
            Some(messenger) => Some(Box::new(messenger)),
            None => None,
        };
    }
}
