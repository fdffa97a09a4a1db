//! Map preview geometry derived from a course's stops.
//!
//! Nothing here is persisted or cached; callers recompute on every edit.

use serde::Serialize;

use crate::draft::{Location, Position};

/// Centroid and route path of the stops that have a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    /// Mean of all positioned stops, `None` when no stop has a position.
    pub centroid: Option<Position>,
    /// Positioned stops in visit order.
    pub path: Vec<Position>,
}

/// Axis-aligned box around a path, for fitting a map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south_west: Position,
    pub north_east: Position,
}

impl Geometry {
    /// A path only becomes a drawable line with at least two points.
    #[must_use]
    pub fn has_route_line(&self) -> bool {
        self.path.len() >= 2
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let (first, rest) = self.path.split_first()?;
        let mut south_west = *first;
        let mut north_east = *first;
        for p in rest {
            south_west.lat = south_west.lat.min(p.lat);
            south_west.lng = south_west.lng.min(p.lng);
            north_east.lat = north_east.lat.max(p.lat);
            north_east.lng = north_east.lng.max(p.lng);
        }
        Some(Bounds {
            south_west,
            north_east,
        })
    }
}

/// Derive centroid and path from `locations`.
///
/// Stops without a position are skipped; the others keep their order. The
/// centroid is the plain `f64` mean of latitudes and longitudes, unrounded.
#[must_use]
pub fn compute_geometry(locations: &[Location]) -> Geometry {
    let path: Vec<Position> = locations.iter().filter_map(|l| l.position).collect();

    let centroid = if path.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let n = path.len() as f64;
        let lat: f64 = path.iter().map(|p| p.lat).sum();
        let lng: f64 = path.iter().map(|p| p.lng).sum();
        Some(Position::new(lat / n, lng / n))
    };

    Geometry { centroid, path }
}
