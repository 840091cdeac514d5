//! Exact lattice geometry.
//!
//! All predicates work on integer coordinates and never round. Containment
//! is for the *closed* polygon: boundary points count as inside.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// A lattice point. Serialized as a `[x, y]` pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }

    #[inline]
    pub const fn dot(self, other: Point) -> i64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub const fn cross(self, other: Point) -> i64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared Euclidean distance.
    #[inline]
    pub fn distance_sq(self, other: Point) -> i64 {
        let d = self - other;
        d.dot(d)
    }

    #[inline]
    const fn doubled(self) -> Point {
        Point::new(self.x * 2, self.y * 2)
    }
}

impl From<[i64; 2]> for Point {
    fn from([x, y]: [i64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [i64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Sign of the turn `a -> b -> c`: 1 counter-clockwise, -1 clockwise, 0 collinear.
#[inline]
pub fn orientation(a: Point, b: Point, c: Point) -> i64 {
    (b - a).cross(c - a).signum()
}

/// True if `p` lies on the closed segment `ab`.
pub fn on_segment(p: Point, a: Point, b: Point) -> bool {
    orientation(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// True if segments `ab` and `cd` cross at a single point interior to both.
///
/// Touching at an endpoint and collinear overlap are not proper crossings.
pub fn segments_properly_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// A closed ring of lattice points.
///
/// The ring is implicitly closed (last vertex connects to the first) and may
/// be given in either winding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over boundary segments, including the closing one.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Closed containment test.
    pub fn contains_point(&self, p: Point) -> bool {
        self.contains_doubled(p.doubled())
    }

    /// Closed containment of `p / 2`, with the ring scaled by two.
    ///
    /// Lets segment midpoints between lattice points be tested exactly.
    fn contains_doubled(&self, p: Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            let (a, b) = (a.doubled(), b.doubled());
            if on_segment(p, a, b) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let upward = b.y > a.y;
                if upward == (orientation(a, b, p) > 0) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True if the whole closed segment `ab` lies inside the closed polygon.
    ///
    /// The segment may run along the boundary and touch vertices, but no part
    /// of it may leave the region.
    pub fn contains_segment(&self, a: Point, b: Point) -> bool {
        if !self.contains_point(a) || !self.contains_point(b) {
            return false;
        }
        if a == b {
            return true;
        }
        if self
            .edges()
            .any(|(c, d)| segments_properly_cross(a, b, c, d))
        {
            return false;
        }

        // Between two consecutive boundary contacts the open piece is either
        // wholly inside or wholly outside, so its midpoint decides.
        let dir = b - a;
        let mut cuts: SmallVec<[Point; 8]> = smallvec![a, b];
        cuts.extend(
            self.vertices
                .iter()
                .copied()
                .filter(|&v| v != a && v != b && on_segment(v, a, b)),
        );
        cuts.sort_by_key(|p| (*p - a).dot(dir));
        cuts.windows(2)
            .all(|w| w[0] == w[1] || self.contains_doubled(w[0] + w[1]))
    }

    /// Squared distance from `p` to the nearest ring vertex.
    pub fn nearest_vertex_distance_sq(&self, p: Point) -> i64 {
        self.vertices
            .iter()
            .map(|v| v.distance_sq(p))
            .min()
            .unwrap_or(0)
    }
}

/// Raster of every lattice point inside a closed polygon.
///
/// Built once per problem; used to draw random in-hole placements and to
/// answer point containment in O(1).
#[derive(Debug, Clone)]
pub struct HoleMask {
    min: Point,
    width: i64,
    height: i64,
    mask: Vec<bool>,
    inside: Vec<Point>,
}

impl HoleMask {
    pub fn new(hole: &Polygon) -> Self {
        let Some((min, max)) = hole.bounding_box() else {
            return Self {
                min: Point::default(),
                width: 0,
                height: 0,
                mask: Vec::new(),
                inside: Vec::new(),
            };
        };
        let width = max.x - min.x + 1;
        let height = max.y - min.y + 1;
        let mut mask = vec![false; (width * height) as usize];
        let mut inside = Vec::new();
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let p = Point::new(x, y);
                if hole.contains_point(p) {
                    mask[((y - min.y) * width + (x - min.x)) as usize] = true;
                    inside.push(p);
                }
            }
        }
        Self {
            min,
            width,
            height,
            mask,
            inside,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        let (dx, dy) = (p.x - self.min.x, p.y - self.min.y);
        if dx < 0 || dy < 0 || dx >= self.width || dy >= self.height {
            return false;
        }
        self.mask[(dy * self.width + dx) as usize]
    }

    /// All lattice points inside the hole, row-major.
    pub fn inside_points(&self) -> &[Point] {
        &self.inside
    }

    pub fn bounds(&self) -> (Point, Point) {
        (
            self.min,
            Point::new(self.min.x + self.width - 1, self.min.y + self.height - 1),
        )
    }
}
