use nalgebra::Point3;

/// An axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Aabb {
        Aabb { min, max }
    }

    /// An inverted box that any sample folded in will overwrite.
    pub fn empty() -> Aabb {
        Aabb {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// A zero-volume box at the given point.
    pub fn degenerate(at: Point3<f32>) -> Aabb {
        Aabb { min: at, max: at }
    }

    pub fn grow_point(&mut self, p: &Point3<f32>) {
        for i in 0..3 {
            if self.min[i] > p[i] {
                self.min[i] = p[i];
            }
            if self.max[i] < p[i] {
                self.max[i] = p[i];
            }
        }
    }

    /// Unions `other` into `self`.
    pub fn grow(&mut self, other: &Aabb) {
        for i in 0..3 {
            if self.min[i] > other.min[i] {
                self.min[i] = other.min[i];
            }
            if self.max[i] < other.max[i] {
                self.max[i] = other.max[i];
            }
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Corner `v` in 0..8, with bit 0 selecting x, bit 1 y and bit 2 z.
    pub fn corner(&self, v: u8) -> Point3<f32> {
        Point3::new(
            if v & 0x1 == 0 { self.min.x } else { self.max.x },
            if v & 0x2 == 0 { self.min.y } else { self.max.y },
            if v & 0x4 == 0 { self.min.z } else { self.max.z },
        )
    }

    /// Octant `i` in 0..8 of this box partitioned around `mid`, with the same
    /// bit layout as [`Aabb::corner`].
    pub fn octant(&self, mid: &Point3<f32>, i: u8) -> Aabb {
        let mut oct = *self;
        let mut bit = 0x1u8;
        for axis in 0..3 {
            if i & bit == 0 {
                oct.max[axis] = mid[axis];
            } else {
                oct.min[axis] = mid[axis];
            }
            bit <<= 1;
        }
        oct
    }

    /// Boxes that merely touch do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.max.x <= other.min.x
            || self.max.y <= other.min.y
            || self.max.z <= other.min.z
            || self.min.x >= other.max.x
            || self.min.y >= other.max.y
            || self.min.z >= other.max.z)
    }

    /// Volume of the overlap between the two boxes, zero when disjoint.
    pub fn intersection_volume(&self, other: &Aabb) -> f32 {
        if !self.intersects(other) {
            return 0.0;
        }
        let min = self.min.coords.sup(&other.min.coords);
        let max = self.max.coords.inf(&other.max.coords);
        (max.x - min.x) * (max.y - min.y) * (max.z - min.z)
    }
}
