#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory point index for restaurant proximity lookups.
//!
//! Builds an R-tree over every inspection row's coordinates once per dataset
//! load. Radius queries are two-phase: [`PointIndex::query_radius`] returns a
//! coarse, over-inclusive candidate set from a degree-space envelope, and the
//! caller confirms each candidate with [`geodesic_distance_miles`].

use geo::{Distance, Geodesic, Point};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

/// Fixed linear approximation of miles per degree.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Meters in one statute mile.
const METERS_PER_MILE: f64 = 1_609.344;

/// Relative padding applied to both envelope half-widths so that a point
/// the exact filter would keep is never outside the envelope.
const ENVELOPE_MARGIN: f64 = 0.01;

/// Highest latitude the longitude widening is evaluated at. Keeps the
/// envelope finite for queries near the poles.
const MAX_WIDENING_LATITUDE: f64 = 89.0;

/// An indexed point: `[longitude, latitude]` tagged with its row position.
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Converts a distance in miles to a radius in degrees using
/// [`MILES_PER_DEGREE`].
#[must_use]
pub fn miles_to_degrees(miles: f64) -> f64 {
    miles / MILES_PER_DEGREE
}

/// Exact distance in miles between two `(latitude, longitude)` pairs on the
/// WGS84 ellipsoid.
#[must_use]
pub fn geodesic_distance_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
    let origin = Point::new(from.1, from.0);
    let destination = Point::new(to.1, to.0);
    Geodesic.distance(origin, destination) / METERS_PER_MILE
}

/// Immutable R-tree over row coordinates.
///
/// Row positions are assigned in input order, so a position returned by a
/// query indexes straight back into the slice the index was built from.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Bulk-loads the index from `(latitude, longitude)` pairs.
    ///
    /// Non-finite coordinates are left out of the tree.
    #[must_use]
    pub fn build<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut skipped = 0_usize;
        let entries: Vec<IndexedPoint> = points
            .into_iter()
            .enumerate()
            .filter_map(|(position, (lat, lng))| {
                if lat.is_finite() && lng.is_finite() {
                    Some(GeomWithData::new([lng, lat], position))
                } else {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            log::warn!("Left {skipped} points with non-finite coordinates out of the index");
        }

        let tree = RTree::bulk_load(entries);
        log::debug!("Built point index over {} coordinates", tree.size());
        Self { tree }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Row positions of every point inside the coarse envelope around
    /// `center` (`(latitude, longitude)`).
    ///
    /// Both half-widths carry [`ENVELOPE_MARGIN`], which covers a degree of
    /// latitude being as short as ~68.7 miles. The longitude half-width is
    /// further widened by `1 / cos(latitude)` at the envelope's poleward
    /// edge, so every point whose exact distance is within `radius_degrees *
    /// MILES_PER_DEGREE` miles is returned. Results are in ascending row
    /// order.
    #[must_use]
    pub fn query_radius(&self, center: (f64, f64), radius_degrees: f64) -> Vec<usize> {
        let (lat, lng) = center;
        if !lat.is_finite() || !lng.is_finite() || !radius_degrees.is_finite() {
            return Vec::new();
        }

        let radius = radius_degrees.max(0.0);
        let lat_radius = radius * (1.0 + ENVELOPE_MARGIN);
        let poleward = (lat.abs() + lat_radius).min(MAX_WIDENING_LATITUDE);
        let lng_radius = lat_radius / poleward.to_radians().cos();

        let envelope = AABB::from_corners(
            [lng - lng_radius, lat - lat_radius],
            [lng + lng_radius, lat + lat_radius],
        );

        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        positions.sort_unstable();
        positions
    }
}
