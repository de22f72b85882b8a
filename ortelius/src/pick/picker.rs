use ortelius_types::cartesian::{CartesianPoint2d, Point2d};

use crate::error::OrteliusError;
use crate::pick::spatial_index::SpatialIndex;

const DEFAULT_RADIUS_SCALE: f64 = 4.0;

/// Parameters of a pick query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickConfig {
    neighbor_count: usize,
    search_radius: Option<f64>,
    relative_to_closest: bool,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            neighbor_count: 1,
            search_radius: None,
            relative_to_closest: true,
        }
    }
}

impl PickConfig {
    /// Maximum number of neighbors to return.
    pub fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    /// Sets the maximum number of neighbors to return.
    pub fn with_neighbor_count(mut self, count: usize) -> Self {
        self.neighbor_count = count;
        self
    }

    /// Search radius in plot-projection units. `None` means the radius is
    /// estimated from the median nearest-neighbor spacing of the dataset.
    pub fn search_radius(&self) -> Option<f64> {
        self.search_radius
    }

    /// Sets the search radius in plot-projection units.
    pub fn with_search_radius(mut self, radius: Option<f64>) -> Self {
        self.search_radius = radius;
        self
    }

    /// Whether neighbors beyond the closest point are selected relative to
    /// the closest point's location instead of the query location.
    pub fn relative_to_closest(&self) -> bool {
        self.relative_to_closest
    }

    /// Sets whether neighbors beyond the closest point are selected
    /// relative to the closest point's location.
    pub fn with_relative_to_closest(mut self, relative: bool) -> Self {
        self.relative_to_closest = relative;
        self
    }
}

/// A single picked data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Index of the point in the original dataset.
    pub index: usize,
    /// Distance from the effective query center. For picks with
    /// `relative_to_closest` this is the distance from the closest point
    /// for every hit but the first.
    pub distance: f64,
    /// Value associated with the point, if the dataset has a value column.
    pub value: Option<f64>,
    /// Position of the point in plot-projection space.
    pub position: Point2d,
}

/// Result of a pick query: hits ordered by distance ascending, ties broken
/// by dataset index ascending. Empty when no point lies within the search
/// radius.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickResult {
    hits: Vec<PickHit>,
}

impl PickResult {
    /// All hits, best first.
    pub fn hits(&self) -> &[PickHit] {
        &self.hits
    }

    /// The best hit, if any.
    pub fn closest(&self) -> Option<&PickHit> {
        self.hits.first()
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true when nothing was within the search radius.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Owns the spatial index over one dataset together with its optional value
/// column, and answers pick queries on it.
///
/// A picker starts out without data; picking in that state is a programmer
/// error reported as [`OrteliusError::IndexNotReady`]. Setting data rebuilds
/// the index from scratch.
pub struct Picker {
    index: Option<SpatialIndex>,
    values: Option<Vec<f64>>,
    auto_radius: f64,
    radius_scale: f64,
}

impl Default for Picker {
    fn default() -> Self {
        Self::new()
    }
}

impl Picker {
    /// Creates a picker with the default search-radius estimation scale.
    pub fn new() -> Self {
        Self {
            index: None,
            values: None,
            auto_radius: f64::INFINITY,
            radius_scale: DEFAULT_RADIUS_SCALE,
        }
    }

    /// Creates a picker that multiplies the estimated dataset spacing by
    /// `scale` when no explicit search radius is given.
    pub fn with_radius_scale(scale: f64) -> Self {
        Self {
            radius_scale: scale,
            ..Self::new()
        }
    }

    /// Returns true once data has been set.
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Replaces the dataset snapshot and rebuilds the spatial index.
    ///
    /// `values` must be aligned with `points` (one value per point,
    /// including points with non-finite coordinates).
    pub fn set_data<P: CartesianPoint2d<Num = f64>>(
        &mut self,
        points: &[P],
        values: Option<Vec<f64>>,
    ) -> Result<(), OrteliusError> {
        if let Some(values) = &values {
            if values.len() != points.len() {
                return Err(OrteliusError::Generic(format!(
                    "value column length {} does not match point count {}",
                    values.len(),
                    points.len()
                )));
            }
        }

        let index = SpatialIndex::build(points)?;
        self.auto_radius = index.median_spacing() * self.radius_scale;
        self.index = Some(index);
        self.values = values;
        Ok(())
    }

    /// Drops the dataset. The picker returns to the not-ready state.
    pub fn clear_data(&mut self) {
        self.index = None;
        self.values = None;
        self.auto_radius = f64::INFINITY;
    }

    /// Finds up to `config.neighbor_count()` points nearest to `query`.
    ///
    /// An empty result is not an error: it means no point was within the
    /// search radius.
    pub fn pick(&self, query: Point2d, config: &PickConfig) -> Result<PickResult, OrteliusError> {
        let index = self.index.as_ref().ok_or(OrteliusError::IndexNotReady)?;

        let n = config.neighbor_count();
        if n == 0 {
            return Ok(PickResult::default());
        }

        let radius = config.search_radius().unwrap_or(self.auto_radius);

        let neighbors = if n > 1 && config.relative_to_closest() {
            match index.nearest(query, 1, radius).first() {
                // The closest point itself stays first: it is at distance 0
                // from the new query center.
                Some(closest) => index.nearest(closest.position, n, radius),
                None => vec![],
            }
        } else {
            index.nearest(query, n, radius)
        };

        let hits = neighbors
            .into_iter()
            .map(|neighbor| PickHit {
                index: neighbor.index,
                distance: neighbor.distance,
                value: self
                    .values
                    .as_ref()
                    .and_then(|values| values.get(neighbor.index).copied()),
                position: neighbor.position,
            })
            .collect();

        Ok(PickResult { hits })
    }
}
