use std::sync::{Arc, Weak};

use ahash::{HashMap, HashMapExt};
use ortelius_types::cartesian::{Rect, Size};

use crate::map::{LayerSpec, ALL_LAYER};
use crate::render::{Artist, Canvas, Snapshot};
use crate::view::MapView;

/// Opaque handle to an artist registration, returned by the add methods of
/// the [`BlitManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtistId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedrawClass {
    Background,
    Dynamic,
}

struct ArtistRecord {
    id: ArtistId,
    artist: Weak<dyn Artist>,
    layer: String,
    z_index: i32,
    class: RedrawClass,
    order: u64,
}

struct CachedBackground {
    snapshot: Snapshot,
    extent: Rect,
    size: Size,
    dpi_scale: f32,
}

/// Splits registered artists into a cached background raster and a set of
/// dynamic artists redrawn on every frame.
///
/// Background artists of a layer are drawn once and captured into a
/// per-layer snapshot; the snapshot stays valid until the view extent, the
/// canvas size or the DPI scale changes, or until the layer is invalidated
/// explicitly. Dynamic artists are drawn on top of the restored snapshots
/// on every [`BlitManager::update`] call.
///
/// Artists of the special `"all"` layer take part in the rendering of every
/// composition member.
#[derive(Default)]
pub struct BlitManager {
    artists: Vec<ArtistRecord>,
    backgrounds: HashMap<String, CachedBackground>,
    next_id: u64,
    next_order: u64,
}

impl BlitManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            artists: vec![],
            backgrounds: HashMap::new(),
            next_id: 0,
            next_order: 0,
        }
    }

    /// Registers a background artist on the layer. The artist becomes part
    /// of the layer's next background snapshot.
    ///
    /// Registering an artist that is already registered moves it: the
    /// previous registration is removed first.
    pub fn add_bg_artist(
        &mut self,
        artist: &Arc<dyn Artist>,
        layer: impl Into<String>,
        z_index: i32,
    ) -> ArtistId {
        self.add(artist, layer.into(), z_index, RedrawClass::Background)
    }

    /// Registers a dynamic artist on the layer: it is redrawn on every
    /// update cycle regardless of the background cache state.
    ///
    /// Registering an artist that is already registered moves it: the
    /// previous registration is removed first.
    pub fn add_artist(
        &mut self,
        artist: &Arc<dyn Artist>,
        layer: impl Into<String>,
        z_index: i32,
    ) -> ArtistId {
        self.add(artist, layer.into(), z_index, RedrawClass::Dynamic)
    }

    fn add(
        &mut self,
        artist: &Arc<dyn Artist>,
        layer: String,
        z_index: i32,
        class: RedrawClass,
    ) -> ArtistId {
        let weak = Arc::downgrade(artist);
        if let Some(position) = self
            .artists
            .iter()
            .position(|record| Weak::ptr_eq(&record.artist, &weak))
        {
            let removed = self.artists.remove(position);
            if removed.class == RedrawClass::Background {
                self.invalidate(&removed.layer);
            }
        }

        self.next_id += 1;
        self.next_order += 1;
        let id = ArtistId(self.next_id);
        if class == RedrawClass::Background {
            self.invalidate(&layer);
        }
        self.artists.push(ArtistRecord {
            id,
            artist: weak,
            layer,
            z_index,
            class,
            order: self.next_order,
        });

        id
    }

    /// Unregisters an artist. Returns false if the id is unknown.
    pub fn remove_artist(&mut self, id: ArtistId) -> bool {
        match self.artists.iter().position(|record| record.id == id) {
            Some(position) => {
                let removed = self.artists.remove(position);
                if removed.class == RedrawClass::Background {
                    self.invalidate(&removed.layer);
                }
                true
            }
            None => false,
        }
    }

    /// Removes all artists of the layer along with its cached snapshot.
    pub fn remove_layer(&mut self, layer: &str) {
        self.artists.retain(|record| record.layer != layer);
        self.backgrounds.remove(layer);
    }

    /// Discards the cached background snapshot of the layer. The snapshot
    /// is rebuilt lazily during the next update that needs it.
    pub fn invalidate(&mut self, layer: &str) {
        self.backgrounds.remove(layer);
        if layer == ALL_LAYER {
            // "all" artists are baked into every snapshot.
            self.backgrounds.clear();
        }
    }

    /// Discards all cached background snapshots.
    pub fn invalidate_all(&mut self) {
        self.backgrounds.clear();
    }

    /// Redraws the canvas for the given layer composition.
    ///
    /// Stale artists (dropped by the host without being unregistered here)
    /// and artists whose draw fails are logged and skipped; an update never
    /// fails as a whole.
    pub fn update(&mut self, canvas: &mut dyn Canvas, composition: &[LayerSpec], view: &MapView) {
        self.purge_stale();

        for spec in composition {
            self.ensure_background(canvas, spec.name(), view);
        }

        canvas.clear();
        for spec in composition {
            if let Some(cached) = self.backgrounds.get(spec.name()) {
                canvas.restore(&cached.snapshot, spec.opacity());
            }
        }

        let mut dynamic: Vec<&ArtistRecord> = self
            .artists
            .iter()
            .filter(|record| {
                record.class == RedrawClass::Dynamic
                    && (record.layer == ALL_LAYER
                        || composition.iter().any(|spec| spec.name() == record.layer))
            })
            .collect();
        dynamic.sort_by_key(|record| (record.z_index, record.order));

        for record in dynamic {
            draw_record(record, view, canvas);
        }
    }

    fn ensure_background(&mut self, canvas: &mut dyn Canvas, layer: &str, view: &MapView) {
        let extent = view.bbox();
        let size = canvas.size();
        let dpi_scale = canvas.dpi_scale();

        if let Some(cached) = self.backgrounds.get(layer) {
            if cached.extent == extent && cached.size == size && cached.dpi_scale == dpi_scale {
                return;
            }
        }

        let mut background: Vec<&ArtistRecord> = self
            .artists
            .iter()
            .filter(|record| {
                record.class == RedrawClass::Background
                    && (record.layer == layer || record.layer == ALL_LAYER)
            })
            .collect();
        background.sort_by_key(|record| (record.z_index, record.order));

        canvas.clear();
        for record in background {
            draw_record(record, view, canvas);
        }

        let snapshot = canvas.capture();
        self.backgrounds.insert(
            layer.to_string(),
            CachedBackground {
                snapshot,
                extent,
                size,
                dpi_scale,
            },
        );
    }

    fn purge_stale(&mut self) {
        let mut stale_bg_layers: Vec<String> = vec![];
        self.artists.retain(|record| {
            if record.artist.strong_count() > 0 {
                true
            } else {
                log::warn!(
                    "artist {:?} on layer {} was dropped without being unregistered",
                    record.id,
                    record.layer
                );
                if record.class == RedrawClass::Background {
                    stale_bg_layers.push(record.layer.clone());
                }
                false
            }
        });

        for layer in stale_bg_layers {
            self.invalidate(&layer);
        }
    }
}

fn draw_record(record: &ArtistRecord, view: &MapView, canvas: &mut dyn Canvas) {
    let Some(artist) = record.artist.upgrade() else {
        log::warn!(
            "artist {:?} on layer {} was dropped during the update cycle",
            record.id,
            record.layer
        );
        return;
    };

    if let Err(error) = artist.draw(view, canvas) {
        log::warn!(
            "artist {:?} on layer {} failed to draw: {error}",
            record.id,
            record.layer
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ortelius_types::cartesian::Point2d;

    use super::*;
    use crate::tests::{drain_log, ops_named, ops_with_prefix, BrokenArtist, TestArtist, TestCanvas};

    fn fixture() -> (BlitManager, TestCanvas, crate::tests::OpLog, MapView) {
        let log = Rc::new(RefCell::new(vec![]));
        let canvas = TestCanvas::new(log.clone(), Size::new(100.0, 100.0));
        let view = MapView::new(Point2d::new(0.0, 0.0), 1.0).with_size(Size::new(100.0, 100.0));
        (BlitManager::new(), canvas, log, view)
    }

    fn artist(name: &str, log: &crate::tests::OpLog) -> Arc<dyn Artist> {
        Arc::new(TestArtist::new(name, log.clone()))
    }

    fn composition(specs: &[(&str, f32)]) -> Vec<LayerSpec> {
        specs
            .iter()
            .map(|(name, opacity)| LayerSpec::new(*name, *opacity))
            .collect()
    }

    #[test]
    fn background_snapshot_is_reused_until_extent_changes() {
        let (mut blit, mut canvas, log, view) = fixture();
        let bg = artist("bg", &log);
        let marker = artist("marker", &log);
        blit.add_bg_artist(&bg, "x", 0);
        blit.add_artist(&marker, "x", 0);

        let composition = composition(&[("x", 1.0)]);

        blit.update(&mut canvas, &composition, &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 1);
        assert_eq!(ops_named(&ops, "draw:marker"), 1);

        blit.update(&mut canvas, &composition, &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 0, "snapshot must be reused");
        assert_eq!(ops_named(&ops, "draw:marker"), 1);
        assert_eq!(ops_with_prefix(&ops, "restore:"), 1);

        let moved = view.with_center(Point2d::new(10.0, 0.0));
        blit.update(&mut canvas, &composition, &moved);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 1, "extent change rebuilds");
    }

    #[test]
    fn dpi_change_rebuilds_snapshot() {
        let (mut blit, mut canvas, log, view) = fixture();
        let bg = artist("bg", &log);
        blit.add_bg_artist(&bg, "x", 0);
        let composition = composition(&[("x", 1.0)]);

        blit.update(&mut canvas, &composition, &view);
        drain_log(&log);

        canvas.set_dpi_scale(2.0);
        blit.update(&mut canvas, &composition, &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 1);
    }

    #[test]
    fn explicit_invalidation_rebuilds_snapshot() {
        let (mut blit, mut canvas, log, view) = fixture();
        let bg = artist("bg", &log);
        blit.add_bg_artist(&bg, "x", 0);
        let composition = composition(&[("x", 1.0)]);

        blit.update(&mut canvas, &composition, &view);
        drain_log(&log);

        blit.invalidate("x");
        blit.update(&mut canvas, &composition, &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 1);
    }

    #[test]
    fn updates_are_idempotent_without_state_changes() {
        let (mut blit, mut canvas, log, view) = fixture();
        let bg = artist("bg", &log);
        let marker = artist("marker", &log);
        blit.add_bg_artist(&bg, "x", 0);
        blit.add_artist(&marker, "x", 0);
        let composition = composition(&[("x", 1.0)]);

        blit.update(&mut canvas, &composition, &view);
        drain_log(&log);

        blit.update(&mut canvas, &composition, &view);
        let first = drain_log(&log);
        blit.update(&mut canvas, &composition, &view);
        let second = drain_log(&log);
        assert_eq!(first, second);
        assert_eq!(ops_named(&first, "draw:marker"), 1, "no double-drawing");
    }

    #[test]
    fn dynamic_artists_draw_in_z_order_then_registration_order() {
        let (mut blit, mut canvas, log, view) = fixture();
        let top = artist("top", &log);
        let bottom = artist("bottom", &log);
        let first = artist("first", &log);
        let second = artist("second", &log);
        blit.add_artist(&top, "x", 5);
        blit.add_artist(&bottom, "x", -5);
        blit.add_artist(&first, "x", 0);
        blit.add_artist(&second, "x", 0);

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        let ops = drain_log(&log);
        let draws: Vec<&str> = ops
            .iter()
            .filter(|op| op.starts_with("draw:"))
            .map(|op| op.as_str())
            .collect();
        assert_eq!(
            draws,
            vec!["draw:bottom", "draw:first", "draw:second", "draw:top"]
        );
    }

    #[test]
    fn composition_order_and_opacity_are_honored() {
        let (mut blit, mut canvas, log, view) = fixture();
        let a = artist("a", &log);
        let b = artist("b", &log);
        blit.add_bg_artist(&a, "A", 0);
        blit.add_bg_artist(&b, "B", 0);

        blit.update(&mut canvas, &composition(&[("A", 1.0), ("B", 0.5)]), &view);
        let ops = drain_log(&log);
        let restores: Vec<&String> = ops.iter().filter(|op| op.starts_with("restore:")).collect();
        assert_eq!(restores.len(), 2);
        assert!(restores[0].ends_with("@1"), "A restored first: {restores:?}");
        assert!(restores[1].ends_with("@0.5"), "B on top at half opacity");

        // Reversing the composition reverses the stacking.
        blit.update(&mut canvas, &composition(&[("B", 0.5), ("A", 1.0)]), &view);
        let ops = drain_log(&log);
        let restores: Vec<&String> = ops.iter().filter(|op| op.starts_with("restore:")).collect();
        assert!(restores[0].ends_with("@0.5"));
        assert!(restores[1].ends_with("@1"));
    }

    #[test]
    fn all_layer_artists_join_every_composition_member() {
        let (mut blit, mut canvas, log, view) = fixture();
        let shared_bg = artist("shared-bg", &log);
        let shared_marker = artist("shared-marker", &log);
        let base = artist("base", &log);
        blit.add_bg_artist(&shared_bg, ALL_LAYER, 0);
        blit.add_artist(&shared_marker, ALL_LAYER, 0);
        blit.add_bg_artist(&base, "x", 0);

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:shared-bg"), 1);
        assert_eq!(ops_named(&ops, "draw:shared-marker"), 1);
        assert_eq!(ops_named(&ops, "draw:base"), 1);
    }

    #[test]
    fn stale_artists_are_skipped_and_logged_not_fatal() {
        let (mut blit, mut canvas, log, view) = fixture();
        let keep = artist("keep", &log);
        blit.add_artist(&keep, "x", 0);
        {
            let dropped = artist("dropped", &log);
            blit.add_artist(&dropped, "x", 0);
        }

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:keep"), 1);
        assert_eq!(ops_named(&ops, "draw:dropped"), 0);
    }

    #[test]
    fn broken_artist_does_not_abort_the_cycle() {
        let (mut blit, mut canvas, log, view) = fixture();
        let broken: Arc<dyn Artist> = Arc::new(BrokenArtist);
        let fine = artist("fine", &log);
        blit.add_artist(&broken, "x", -1);
        blit.add_artist(&fine, "x", 0);

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:fine"), 1);
    }

    #[test]
    fn re_registration_moves_the_artist() {
        let (mut blit, mut canvas, log, view) = fixture();
        let wanderer = artist("wanderer", &log);
        blit.add_bg_artist(&wanderer, "old", 0);
        blit.add_bg_artist(&wanderer, "new", 0);

        blit.update(&mut canvas, &composition(&[("old", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:wanderer"), 0, "left the old layer");

        blit.update(&mut canvas, &composition(&[("new", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:wanderer"), 1);
    }

    #[test]
    fn removed_artist_invalidates_its_layer() {
        let (mut blit, mut canvas, log, view) = fixture();
        let bg = artist("bg", &log);
        let other = artist("other", &log);
        blit.add_bg_artist(&other, "x", 0);
        let id = blit.add_bg_artist(&bg, "x", 1);

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        drain_log(&log);

        assert!(blit.remove_artist(id));
        assert!(!blit.remove_artist(id), "second removal reports false");

        blit.update(&mut canvas, &composition(&[("x", 1.0)]), &view);
        let ops = drain_log(&log);
        assert_eq!(ops_named(&ops, "draw:bg"), 0);
        assert_eq!(ops_named(&ops, "draw:other"), 1, "snapshot was rebuilt");
    }
}
