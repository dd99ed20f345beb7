use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box used by groups to skip children.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Infinite extents are allowed (planes are unbounded in X and Z).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));
        Self::new(x, y, z)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn with_axis_interval(mut self, n: usize, interval: Interval) -> Self {
        match n {
            0 => self.x = interval,
            1 => self.y = interval,
            _ => self.z = interval,
        }
        self
    }

    /// Smallest corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Largest corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// True if the box has an infinite extent on any axis.
    pub fn is_unbounded(&self) -> bool {
        self.x.is_unbounded() || self.y.is_unbounded() || self.z.is_unbounded()
    }

    /// True if `other` fits entirely inside this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.x.contains_interval(&other.x)
            && self.y.contains_interval(&other.y)
            && self.z.contains_interval(&other.z)
    }

    /// Test if a ray intersects this AABB within the given interval.
    ///
    /// Slab method using the ray's cached inverse direction.
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let origin = r.origin[axis];
            let inv = r.inv_direction[axis];

            let mut t0 = (slab.min - origin) * inv;
            let mut t1 = (slab.max - origin) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN (0 * inf) leaves the running interval untouched
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return false;
            }
        }
        true
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Split the box in half across its longest finite axis.
    ///
    /// Returns `None` when every axis is unbounded or empty.
    pub fn split(&self) -> Option<(Aabb, Aabb)> {
        // Ties resolve to the earlier axis
        let mut axis = None;
        let mut longest = 0.0;
        for a in 0..3 {
            let interval = self.axis_interval(a);
            if !interval.is_unbounded() && interval.size() > longest {
                longest = interval.size();
                axis = Some(a);
            }
        }
        let axis = axis?;

        let slab = self.axis_interval(axis);
        let mid = (slab.min + slab.max) * 0.5;
        let left = self.with_axis_interval(axis, Interval::new(slab.min, mid));
        let right = self.with_axis_interval(axis, Interval::new(mid, slab.max));
        Some((left, right))
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}
