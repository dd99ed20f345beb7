//! Intersection records and pooled intersection sets.

use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

use crate::shape::{ShapeId, Shapes};

/// A ray parameter paired with the leaf shape it hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t: f32,
    pub shape: ShapeId,
}

impl Intersection {
    pub fn new(t: f32, shape: ShapeId) -> Self {
        Self { t, shape }
    }
}

/// Which surfaces may be selected as the hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    /// Every surface (camera and bounce rays)
    Any,
    /// Only surfaces whose material casts shadows (shadow rays)
    ShadowCasters,
}

/// Free list of intersection buffers shared by all render threads.
///
/// Buffers are handed out wrapped in an [`IntersectionSet`] and come back
/// automatically when the set is dropped.
#[derive(Debug, Default)]
pub struct IntersectionPool {
    free: Mutex<Vec<Vec<Intersection>>>,
}

impl IntersectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an empty set, reusing a returned buffer when one is available.
    pub fn acquire(&self) -> IntersectionSet<'_> {
        let items = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        IntersectionSet {
            items,
            pool: Some(self),
        }
    }

    /// Number of buffers waiting to be reused.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut items: Vec<Intersection>) {
        items.clear();
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(items);
    }
}

/// Intersections gathered for one ray query.
///
/// Dereferences to a slice. Once the set is dropped its buffer goes back
/// to the pool it came from, so it can never be read after release.
#[derive(Debug, Default)]
pub struct IntersectionSet<'p> {
    items: Vec<Intersection>,
    pool: Option<&'p IntersectionPool>,
}

impl<'p> IntersectionSet<'p> {
    /// A standalone set that is not backed by a pool.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Intersection>) -> Self {
        Self { items, pool: None }
    }

    pub fn push(&mut self, intersection: Intersection) {
        self.items.push(intersection);
    }

    /// Buffer for shape queries to append into.
    pub fn buffer_mut(&mut self) -> &mut Vec<Intersection> {
        &mut self.items
    }

    /// Stable ascending sort by `t`.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| a.t.total_cmp(&b.t));
    }

    /// Index of the hit: the smallest non-negative `t` admitted by `mode`,
    /// earliest entry on ties.
    pub fn hit_index(&self, shapes: &Shapes, mode: HitMode) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, x) in self.items.iter().enumerate() {
            if x.t < 0.0 || x.t.is_nan() {
                continue;
            }
            if mode == HitMode::ShadowCasters && !shapes.material(x.shape).casts_shadow {
                continue;
            }
            if best.map_or(true, |b| x.t < self.items[b].t) {
                best = Some(i);
            }
        }
        best
    }

    pub fn hit(&self, shapes: &Shapes, mode: HitMode) -> Option<Intersection> {
        self.hit_index(shapes, mode).map(|i| self.items[i])
    }
}

impl Deref for IntersectionSet<'_> {
    type Target = [Intersection];

    fn deref(&self) -> &[Intersection] {
        &self.items
    }
}

impl Drop for IntersectionSet<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::primitive::Primitive;

    fn two_shapes() -> (Shapes, ShapeId, ShapeId) {
        let mut shapes = Shapes::new();
        let a = shapes.add_shape(Primitive::Sphere);
        let b = shapes.add_shape(Primitive::Sphere);
        (shapes, a, b)
    }

    #[test]
    fn test_hit_all_positive() {
        let (shapes, a, _) = two_shapes();
        let set = IntersectionSet::from_vec(vec![Intersection::new(1.0, a), Intersection::new(2.0, a)]);
        assert_eq!(set.hit(&shapes, HitMode::Any), Some(Intersection::new(1.0, a)));
    }

    #[test]
    fn test_hit_skips_negative() {
        let (shapes, a, _) = two_shapes();
        let set = IntersectionSet::from_vec(vec![Intersection::new(-1.0, a), Intersection::new(1.0, a)]);
        assert_eq!(set.hit(&shapes, HitMode::Any).map(|x| x.t), Some(1.0));

        let set = IntersectionSet::from_vec(vec![Intersection::new(-2.0, a), Intersection::new(-1.0, a)]);
        assert_eq!(set.hit(&shapes, HitMode::Any), None);
    }

    #[test]
    fn test_hit_is_lowest_nonnegative_regardless_of_order() {
        let (shapes, a, _) = two_shapes();
        let set = IntersectionSet::from_vec(vec![
            Intersection::new(5.0, a),
            Intersection::new(7.0, a),
            Intersection::new(-3.0, a),
            Intersection::new(2.0, a),
        ]);
        assert_eq!(set.hit(&shapes, HitMode::Any).map(|x| x.t), Some(2.0));
        assert_eq!(set.hit_index(&shapes, HitMode::Any), Some(3));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let (shapes, a, b) = two_shapes();
        let mut set = IntersectionSet::from_vec(vec![
            Intersection::new(3.0, b),
            Intersection::new(1.0, a),
            Intersection::new(1.0, b),
        ]);
        assert_eq!(set.hit(&shapes, HitMode::Any).map(|x| x.shape), Some(a));

        set.sort();
        let order: Vec<ShapeId> = set.iter().map(|x| x.shape).collect();
        assert_eq!(order, vec![a, b, b]);
        assert_eq!(set[1].t, 1.0);
    }

    #[test]
    fn test_shadow_mode_skips_non_casters() {
        let (mut shapes, a, b) = two_shapes();
        let material = Material {
            casts_shadow: false,
            ..Default::default()
        };
        shapes.set_material(a, material).unwrap();

        let set = IntersectionSet::from_vec(vec![Intersection::new(1.0, a), Intersection::new(2.0, b)]);
        assert_eq!(set.hit(&shapes, HitMode::Any).map(|x| x.shape), Some(a));
        assert_eq!(set.hit(&shapes, HitMode::ShadowCasters).map(|x| x.shape), Some(b));
    }

    #[test]
    fn test_pool_reuses_released_buffers() {
        let (_, a, _) = two_shapes();
        let pool = IntersectionPool::new();
        assert_eq!(pool.available(), 0);

        {
            let mut set = pool.acquire();
            for i in 0..16 {
                set.push(Intersection::new(i as f32, a));
            }
            assert_eq!(set.len(), 16);
        }
        assert_eq!(pool.available(), 1);

        let set = pool.acquire();
        assert!(set.is_empty());
        assert!(set.items.capacity() >= 16);
        assert_eq!(pool.available(), 0);
        drop(set);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_unpooled_set_drops_quietly() {
        let pool = IntersectionPool::new();
        drop(IntersectionSet::new());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_pool_across_threads() {
        let (_, a, _) = two_shapes();
        let pool = IntersectionPool::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let mut set = pool.acquire();
                        set.push(Intersection::new(1.0, a));
                    }
                });
            }
        });
        assert!(pool.available() >= 1 && pool.available() <= 4);
    }
}
