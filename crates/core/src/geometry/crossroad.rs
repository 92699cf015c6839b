//! Combinatorial crossroad descriptors
//!
//! A crossroad with `n` equi-angular directions is described by the set of
//! directions carrying a branch and by the continuous angular sectors that
//! are open. Two descriptors are the same crossroad when one is a rotation
//! of the other (optionally also a mirror image).

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::{coord, disk, from_polar, unit};
use geo::{BooleanOps, LineString, MultiPolygon, Polygon};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Element of a crossroad sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Item {
    /// Branch along direction `i`
    Branch(usize),
    /// Open sector swept counter-clockwise from direction `i` to `j`
    Sector(usize, usize),
}

impl Item {
    fn map(self, f: impl Fn(usize) -> usize) -> Self {
        match self {
            Item::Branch(i) => Item::Branch(f(i)),
            Item::Sector(i, j) => Item::Sector(f(i), f(j)),
        }
    }

    fn indices(self) -> impl Iterator<Item = usize> {
        let (i, j) = match self {
            Item::Branch(i) => (i, None),
            Item::Sector(i, j) => (i, Some(j)),
        };
        std::iter::once(i).chain(j)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Branch(i) => write!(f, "{i}"),
            Item::Sector(i, j) => write!(f, "({i},{j})"),
        }
    }
}

/// Crossroad sequence; equality and hashing are modulo rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossroadSequence {
    n: usize,
    items: Vec<Item>,
}

impl CrossroadSequence {
    /// # Errors
    /// [`Error::InvalidInputs`] when `n < 4`, an index is out of range or a
    /// sector is empty.
    pub fn new(n: usize, items: impl IntoIterator<Item = Item>) -> Result<Self> {
        if n < 4 {
            return Err(Error::invalid(format!("a crossroad needs at least 4 directions, got {n}")));
        }
        let mut items: Vec<Item> = items.into_iter().collect();
        for item in &items {
            if item.indices().any(|i| i >= n) {
                return Err(Error::invalid(format!("{item} is out of range for n = {n}")));
            }
            if let Item::Sector(i, j) = item {
                if i == j {
                    return Err(Error::invalid(format!("empty sector {item}")));
                }
            }
        }
        items.sort_unstable();
        items.dedup();
        Ok(Self { n, items })
    }

    /// Branches only
    pub fn branches(n: usize, branches: &[usize]) -> Result<Self> {
        Self::new(n, branches.iter().map(|&i| Item::Branch(i)))
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    fn remapped(&self, f: impl Fn(usize) -> usize + Copy) -> Self {
        let mut items: Vec<Item> = self.items.iter().map(|it| it.map(f)).collect();
        items.sort_unstable();
        Self { n: self.n, items }
    }

    /// Rotate by `k` directions counter-clockwise
    pub fn rotate(&self, k: usize) -> Self {
        let n = self.n;
        self.remapped(|i| (i + k) % n)
    }

    /// Mirror about the +x axis
    pub fn mirror(&self) -> Self {
        let n = self.n;
        let mut items: Vec<Item> = self
            .items
            .iter()
            .map(|it| match *it {
                Item::Branch(i) => Item::Branch((n - i) % n),
                Item::Sector(i, j) => Item::Sector((n - j) % n, (n - i) % n),
            })
            .collect();
        items.sort_unstable();
        Self { n, items }
    }

    /// Smallest item list over all rotations, and mirrors when asked
    pub fn canonical(&self, mirror: bool) -> Vec<Item> {
        let mut candidates = vec![self.clone()];
        if mirror {
            candidates.push(self.mirror());
        }
        candidates
            .iter()
            .flat_map(|s| (0..self.n).map(move |k| s.rotate(k).items))
            .min()
            .unwrap_or_default()
    }

    pub fn is_equivalent(&self, other: &Self, mirror: bool) -> bool {
        self.n == other.n && self.canonical(mirror) == other.canonical(mirror)
    }

    /// Coarsest regular model (4, 8 or n directions) holding every element
    pub fn minimum_model(&self) -> usize {
        let fits = |m: usize| {
            self.n % m == 0
                && self
                    .items
                    .iter()
                    .flat_map(|it| it.indices())
                    .all(|i| i % (self.n / m) == 0)
        };
        if fits(4) {
            4
        } else if fits(8) {
            8
        } else {
            self.n
        }
    }

    fn direction(&self, i: usize) -> f64 {
        TAU * i as f64 / self.n as f64
    }

    /// Planar footprint: branch rectangles of `length` and `half_width`,
    /// sector fans, and a central disk of radius 2·`half_width`
    pub fn to_polygon(&self, length: f64, half_width: f64) -> Result<MultiPolygon<f64>> {
        if !(length > 0.0 && half_width > 0.0 && half_width < length) {
            return Err(Error::invalid("crossroad length and half width must be positive"));
        }
        let origin = Vec2::zeros();
        let alpha = 2.0 * half_width.atan2(length);
        let mut parts = vec![disk(origin, 2.0 * half_width, 32)];
        for item in &self.items {
            match *item {
                Item::Branch(i) => {
                    let u = unit(self.direction(i));
                    let side = Vec2::new(-u.y, u.x) * half_width;
                    let ring = vec![-side, u * length - side, u * length + side, side];
                    parts.push(Polygon::new(
                        LineString::from(ring.into_iter().map(coord).collect::<Vec<_>>()),
                        vec![],
                    ));
                }
                Item::Sector(i, j) => {
                    let start = self.direction(i);
                    let mut sweep = self.direction(j) - start;
                    if sweep <= 0.0 {
                        sweep += TAU;
                    }
                    let steps = (sweep / (0.5 * alpha)).ceil().max(1.0) as usize;
                    let mut ring = vec![coord(origin)];
                    ring.extend(
                        (0..=steps).map(|k| coord(from_polar(origin, length, start + sweep * k as f64 / steps as f64))),
                    );
                    parts.push(Polygon::new(LineString::from(ring), vec![]));
                }
            }
        }
        Ok(parts
            .into_iter()
            .map(|p| MultiPolygon::new(vec![p]))
            .reduce(|acc, next| acc.union(&next))
            .unwrap_or_else(|| MultiPolygon::new(Vec::new())))
    }
}

impl PartialEq for CrossroadSequence {
    fn eq(&self, other: &Self) -> bool {
        self.is_equivalent(other, false)
    }
}

impl Eq for CrossroadSequence {}

impl Hash for CrossroadSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.n.hash(state);
        self.canonical(false).hash(state);
    }
}

impl fmt::Display for CrossroadSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={} [", self.n)?;
        for (k, item) in self.items.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "]")
    }
}

/// Every distinct crossroad on `n` directions, up to rotation and, when
/// `mirror` is set, reflection
///
/// Branch-only sequences cover every non-empty subset of directions. Sector
/// sequences open one quadrant-aligned sector (0, k·n/4), k ∈ {1, 2, 3},
/// plus any branches beyond the sector end.
pub fn enumerate(n: usize, mirror: bool) -> Result<Vec<CrossroadSequence>> {
    if n < 4 || n > 24 {
        return Err(Error::invalid(format!("cannot enumerate crossroads on {n} directions")));
    }
    let mut seen: FxHashSet<Vec<Item>> = FxHashSet::default();
    let mut out = Vec::new();
    let mut keep = |seq: CrossroadSequence| {
        if seen.insert(seq.canonical(mirror)) {
            out.push(seq);
        }
    };

    for mask in 1u32..(1 << n) {
        let branches: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        keep(CrossroadSequence::branches(n, &branches)?);
    }
    if n % 4 == 0 {
        for k in 1..=3 {
            let end = k * n / 4;
            let free: Vec<usize> = (end + 1..n).collect();
            for mask in 0u32..(1 << free.len()) {
                let items = std::iter::once(Item::Sector(0, end)).chain(
                    free.iter()
                        .enumerate()
                        .filter(|(b, _)| mask & (1 << *b) != 0)
                        .map(|(_, &i)| Item::Branch(i)),
                );
                keep(CrossroadSequence::new(n, items)?);
            }
        }
    }
    out.sort_by(|a, b| {
        a.items
            .len()
            .cmp(&b.items.len())
            .then_with(|| a.canonical(mirror).cmp(&b.canonical(mirror)))
    });
    Ok(out)
}
