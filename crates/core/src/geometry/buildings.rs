//! Building footprints and their spatial index
//!
//! Footprints are 2D polygons (holes allowed) extruded to a height. The
//! R-tree stores one bounding box per footprint and is built once, then
//! shared read-only by every viewpoint query.

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::{coord, project_on_segment, ring_points, vec2, EPSILON};
use geo::{BoundingRect, Contains, Point, Polygon, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Prismatic building: footprint extruded to `height`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub footprint: Polygon<f64>,
    /// Height above ground (m)
    pub height: f64,
}

impl Building {
    /// Building with a validated footprint
    ///
    /// # Errors
    /// [`Error::InvalidInputs`] when the exterior ring has fewer than three
    /// distinct vertices or the height is negative or not finite.
    pub fn new(footprint: Polygon<f64>, height: f64) -> Result<Self> {
        if ring_points(footprint.exterior()).len() < 3 {
            return Err(Error::invalid("building footprint needs at least three vertices"));
        }
        if !height.is_finite() || height < 0.0 {
            return Err(Error::invalid(format!("building height {height} is not valid")));
        }
        Ok(Self { footprint, height })
    }

    /// Flat footprint (height 0) for 2D analyses
    pub fn flat(footprint: Polygon<f64>) -> Result<Self> {
        Self::new(footprint, 0.0)
    }

    /// Footprint edges as point pairs, exterior then holes
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        std::iter::once(self.footprint.exterior())
            .chain(self.footprint.interiors())
            .flat_map(|ring| ring.lines().map(|l| (vec2(l.start), vec2(l.end))))
    }

    /// Distance from `p` to the footprint boundary
    pub fn boundary_distance(&self, p: Vec2) -> f64 {
        self.edges()
            .map(|(a, b)| project_on_segment(p, a, b).distance)
            .fold(f64::INFINITY, f64::min)
    }

    /// Whether `p` lies strictly inside the footprint
    pub fn strictly_contains(&self, p: Vec2) -> bool {
        self.footprint.contains(&Point::from(coord(p))) && self.boundary_distance(p) > EPSILON
    }
}

#[derive(Debug)]
struct IndexedFootprint {
    index: usize,
    bbox: Rect<f64>,
    footprint: Polygon<f64>,
}

impl RTreeObject for IndexedFootprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

impl PointDistance for IndexedFootprint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Vec2::new(point[0], point[1]);
        if self.footprint.contains(&Point::new(p.x, p.y)) {
            return 0.0;
        }
        let d = std::iter::once(self.footprint.exterior())
            .chain(self.footprint.interiors())
            .flat_map(|ring| ring.lines())
            .map(|l| project_on_segment(p, vec2(l.start), vec2(l.end)).distance)
            .fold(f64::INFINITY, f64::min);
        d * d
    }
}

/// Read-only R-tree over building footprints
#[derive(Debug)]
pub struct BuildingIndex {
    buildings: Vec<Building>,
    tree: RTree<IndexedFootprint>,
}

impl BuildingIndex {
    pub fn new(buildings: Vec<Building>) -> Self {
        let items = buildings
            .iter()
            .enumerate()
            .filter_map(|(index, b)| {
                b.footprint.bounding_rect().map(|bbox| IndexedFootprint {
                    index,
                    bbox,
                    footprint: b.footprint.clone(),
                })
            })
            .collect();
        Self {
            buildings,
            tree: RTree::bulk_load(items),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Building {
        &self.buildings[index]
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Indices of buildings whose bounding box meets `rect`, ascending
    pub fn intersecting(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.index)
            .collect();
        found.sort_unstable();
        found
    }

    /// Indices of buildings whose bounding box meets the segment's box
    pub fn along_segment(&self, a: Vec2, b: Vec2) -> Vec<usize> {
        self.intersecting(&Rect::new(coord(a), coord(b)))
    }

    /// Building strictly containing `p`, if any
    pub fn containing(&self, p: Vec2) -> Option<usize> {
        let envelope = AABB::from_point([p.x, p.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.index)
            .find(|&i| self.buildings[i].strictly_contains(p))
    }

    /// Building whose boundary passes through `p`, if any
    pub fn anchoring(&self, p: Vec2) -> Option<usize> {
        let envelope = AABB::from_corners([p.x - EPSILON, p.y - EPSILON], [p.x + EPSILON, p.y + EPSILON]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.index)
            .find(|&i| self.buildings[i].boundary_distance(p) <= EPSILON)
    }

    /// Fail when `p` is strictly inside a building
    pub fn ensure_outdoor(&self, p: Vec2) -> Result<()> {
        match self.containing(p) {
            Some(_) => Err(Error::IndoorViewpoint { x: p.x, y: p.y }),
            None => Ok(()),
        }
    }

    /// Nearest building and its distance to `p`
    pub fn nearest(&self, p: Vec2) -> Option<(usize, f64)> {
        self.tree
            .nearest_neighbor(&[p.x, p.y])
            .map(|item| (item.index, item.distance_2(&[p.x, p.y]).sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn block(x0: f64, y0: f64, x1: f64, y1: f64) -> Building {
        Building::new(
            polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
            10.0,
        )
        .unwrap()
    }

    fn serde_roundtrippable<T: Serialize + serde::de::DeserializeOwned>() {}

    #[test]
    fn test_building_is_serde() {
        // footprints carry geo polygons, serialisable with the use-serde feature
        serde_roundtrippable::<Building>();
        serde_roundtrippable::<Vec<Building>>();
    }

    #[test]
    fn test_indoor_and_border() {
        let index = BuildingIndex::new(vec![block(0.0, 0.0, 10.0, 10.0)]);
        assert!(matches!(
            index.ensure_outdoor(Vec2::new(5.0, 5.0)),
            Err(Error::IndoorViewpoint { .. })
        ));
        assert!(index.ensure_outdoor(Vec2::new(10.0, 5.0)).is_ok());
        assert_eq!(index.anchoring(Vec2::new(10.0, 5.0)), Some(0));
        assert_eq!(index.anchoring(Vec2::new(12.0, 5.0)), None);
    }

    #[test]
    fn test_nearest() {
        let index = BuildingIndex::new(vec![
            block(0.0, 0.0, 10.0, 10.0),
            block(20.0, 0.0, 30.0, 10.0),
        ]);
        let (i, d) = index.nearest(Vec2::new(17.0, 5.0)).unwrap();
        assert_eq!(i, 1);
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_footprint() {
        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        assert!(Building::flat(flat).is_err());
    }
}
