//! Leaf primitives, all defined in their own object space.
//!
//! Every routine here works on a local-space ray; `Shapes` takes care of
//! moving rays and normals between spaces. Degenerate configurations
//! (rays parallel to a surface, zero-length directions) produce no hits.

use lumen_math::{Aabb, Interval, Ray, Vec3};

/// Threshold under which a direction component counts as zero.
const PARALLEL_EPSILON: f32 = 1e-5;

/// Leaf geometry kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// Unit sphere at the origin.
    Sphere,
    /// The XZ plane (normal +Y).
    Plane,
    /// Axis-aligned cube spanning -1..1 on each axis.
    Cube,
    /// Unit-radius cylinder around Y, truncated to `minimum..maximum`
    /// (exclusive) and optionally capped.
    Cylinder {
        minimum: f32,
        maximum: f32,
        closed: bool,
    },
}

impl Primitive {
    /// An infinite, open cylinder.
    pub fn cylinder() -> Self {
        Primitive::Cylinder {
            minimum: f32::NEG_INFINITY,
            maximum: f32::INFINITY,
            closed: false,
        }
    }

    /// Intersect a local-space ray, reporting each `t` through `hit`.
    ///
    /// Hits are reported in ascending order for a given primitive.
    pub fn local_intersect(&self, ray: &Ray, mut hit: impl FnMut(f32)) {
        match *self {
            Primitive::Sphere => {
                let a = ray.direction.length_squared();
                if a < PARALLEL_EPSILON * PARALLEL_EPSILON {
                    return;
                }
                let b = 2.0 * ray.direction.dot(ray.origin);
                let c = ray.origin.length_squared() - 1.0;
                let discriminant = b * b - 4.0 * a * c;
                if discriminant < 0.0 {
                    return;
                }
                let sqrtd = discriminant.sqrt();
                hit((-b - sqrtd) / (2.0 * a));
                hit((-b + sqrtd) / (2.0 * a));
            }
            Primitive::Plane => {
                if ray.direction.y.abs() < PARALLEL_EPSILON {
                    return;
                }
                hit(-ray.origin.y / ray.direction.y);
            }
            Primitive::Cube => {
                let (xmin, xmax) = check_axis(ray.origin.x, ray.direction.x);
                let (ymin, ymax) = check_axis(ray.origin.y, ray.direction.y);
                let (zmin, zmax) = check_axis(ray.origin.z, ray.direction.z);

                let tmin = xmin.max(ymin).max(zmin);
                let tmax = xmax.min(ymax).min(zmax);
                if tmin > tmax || tmin.is_nan() || tmax.is_nan() {
                    return;
                }
                hit(tmin);
                hit(tmax);
            }
            Primitive::Cylinder {
                minimum,
                maximum,
                closed,
            } => {
                let walls = Interval::new(minimum, maximum);
                let mut ts = [f32::NAN; 4];
                let mut count = 0;
                let mut push = |t: f32| {
                    ts[count] = t;
                    count += 1;
                };

                let a = ray.direction.x * ray.direction.x + ray.direction.z * ray.direction.z;
                if a.abs() >= PARALLEL_EPSILON {
                    let b = 2.0 * (ray.origin.x * ray.direction.x + ray.origin.z * ray.direction.z);
                    let c = ray.origin.x * ray.origin.x + ray.origin.z * ray.origin.z - 1.0;
                    let discriminant = b * b - 4.0 * a * c;
                    if discriminant >= 0.0 {
                        let sqrtd = discriminant.sqrt();
                        let t0 = (-b - sqrtd) / (2.0 * a);
                        let t1 = (-b + sqrtd) / (2.0 * a);
                        for t in [t0.min(t1), t0.max(t1)] {
                            if walls.surrounds(ray.origin.y + t * ray.direction.y) {
                                push(t);
                            }
                        }
                    }
                }

                if closed && ray.direction.y.abs() >= PARALLEL_EPSILON {
                    for cap in [minimum, maximum] {
                        let t = (cap - ray.origin.y) / ray.direction.y;
                        let x = ray.origin.x + t * ray.direction.x;
                        let z = ray.origin.z + t * ray.direction.z;
                        if cap.is_finite() && x * x + z * z <= 1.0 {
                            push(t);
                        }
                    }
                }

                let ts = &mut ts[..count];
                ts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                for &t in ts.iter() {
                    hit(t);
                }
            }
        }
    }

    /// Outward normal at a local-space point on the surface.
    pub fn local_normal_at(&self, point: Vec3) -> Vec3 {
        match *self {
            Primitive::Sphere => point,
            Primitive::Plane => Vec3::Y,
            Primitive::Cube => {
                let abs = point.abs();
                let max = abs.max_element();
                if max == abs.x {
                    Vec3::new(point.x, 0.0, 0.0)
                } else if max == abs.y {
                    Vec3::new(0.0, point.y, 0.0)
                } else {
                    Vec3::new(0.0, 0.0, point.z)
                }
            }
            Primitive::Cylinder {
                minimum, maximum, ..
            } => {
                let dist = point.x * point.x + point.z * point.z;
                if dist < 1.0 && point.y >= maximum - PARALLEL_EPSILON {
                    Vec3::Y
                } else if dist < 1.0 && point.y <= minimum + PARALLEL_EPSILON {
                    -Vec3::Y
                } else {
                    Vec3::new(point.x, 0.0, point.z)
                }
            }
        }
    }

    /// Object-space bounds.
    pub fn local_bounds(&self) -> Aabb {
        match *self {
            Primitive::Sphere | Primitive::Cube => {
                Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0))
            }
            Primitive::Plane => Aabb::new(Interval::UNIVERSE, Interval::new(0.0, 0.0), Interval::UNIVERSE),
            Primitive::Cylinder {
                minimum, maximum, ..
            } => Aabb::new(
                Interval::new(-1.0, 1.0),
                Interval::new(minimum, maximum),
                Interval::new(-1.0, 1.0),
            ),
        }
    }
}

/// Slab entry/exit along one axis of the unit cube.
fn check_axis(origin: f32, direction: f32) -> (f32, f32) {
    let tmin_numerator = -1.0 - origin;
    let tmax_numerator = 1.0 - origin;

    let (tmin, tmax) = if direction.abs() >= PARALLEL_EPSILON {
        (tmin_numerator / direction, tmax_numerator / direction)
    } else {
        (tmin_numerator * f32::INFINITY, tmax_numerator * f32::INFINITY)
    };

    if tmin > tmax {
        (tmax, tmin)
    } else {
        (tmin, tmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(primitive: Primitive, origin: Vec3, direction: Vec3) -> Vec<f32> {
        let mut out = Vec::new();
        primitive.local_intersect(&Ray::new(origin, direction), |t| out.push(t));
        out
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_sphere_two_hits() {
        let xs = hits(Primitive::Sphere, Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert_eq!(xs, vec![4.0, 6.0]);
    }

    #[test]
    fn test_sphere_tangent_and_miss() {
        let xs = hits(Primitive::Sphere, Vec3::new(0.0, 1.0, -5.0), Vec3::Z);
        assert_eq!(xs, vec![5.0, 5.0]);

        let xs = hits(Primitive::Sphere, Vec3::new(0.0, 2.0, -5.0), Vec3::Z);
        assert!(xs.is_empty());
    }

    #[test]
    fn test_sphere_ray_from_inside() {
        let xs = hits(Primitive::Sphere, Vec3::ZERO, Vec3::Z);
        assert_eq!(xs, vec![-1.0, 1.0]);
    }

    #[test]
    fn test_sphere_behind_ray() {
        let xs = hits(Primitive::Sphere, Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert_eq!(xs, vec![-6.0, -4.0]);
    }

    #[test]
    fn test_sphere_zero_direction_misses() {
        assert!(hits(Primitive::Sphere, Vec3::ZERO, Vec3::ZERO).is_empty());
    }

    #[test]
    fn test_sphere_normal_is_point() {
        let p = Vec3::splat(3f32.sqrt() / 3.0);
        assert_eq!(Primitive::Sphere.local_normal_at(p), p);
        assert_eq!(Primitive::Sphere.local_normal_at(Vec3::X), Vec3::X);
    }

    #[test]
    fn test_plane_parallel_and_coplanar_rays_miss() {
        assert!(hits(Primitive::Plane, Vec3::new(0.0, 10.0, 0.0), Vec3::Z).is_empty());
        assert!(hits(Primitive::Plane, Vec3::ZERO, Vec3::Z).is_empty());
    }

    #[test]
    fn test_plane_hits_from_above_and_below() {
        assert_eq!(hits(Primitive::Plane, Vec3::new(0.0, 1.0, 0.0), -Vec3::Y), vec![1.0]);
        assert_eq!(hits(Primitive::Plane, Vec3::new(0.0, -1.0, 0.0), Vec3::Y), vec![1.0]);
        assert_eq!(Primitive::Plane.local_normal_at(Vec3::new(10.0, 0.0, -10.0)), Vec3::Y);
    }

    #[test]
    fn test_cube_hits_each_face() {
        let cases = [
            (Vec3::new(5.0, 0.5, 0.0), -Vec3::X, [4.0, 6.0]),
            (Vec3::new(-5.0, 0.5, 0.0), Vec3::X, [4.0, 6.0]),
            (Vec3::new(0.5, 5.0, 0.0), -Vec3::Y, [4.0, 6.0]),
            (Vec3::new(0.5, -5.0, 0.0), Vec3::Y, [4.0, 6.0]),
            (Vec3::new(0.5, 0.0, 5.0), -Vec3::Z, [4.0, 6.0]),
            (Vec3::new(0.0, 0.5, 0.0), Vec3::Z, [-1.0, 1.0]),
        ];
        for (origin, direction, expected) in cases {
            assert_close(&hits(Primitive::Cube, origin, direction), &expected);
        }
    }

    #[test]
    fn test_cube_misses() {
        let cube = Primitive::Cube;
        let diagonal = Vec3::new(0.2673, 0.5345, 0.8018);
        assert!(hits(cube, Vec3::new(-2.0, 0.0, 0.0), diagonal).is_empty());
        assert!(hits(cube, Vec3::new(2.0, 0.0, 2.0), -Vec3::Z).is_empty());
        assert!(hits(cube, Vec3::new(2.0, 2.0, 0.0), -Vec3::X).is_empty());
    }

    #[test]
    fn test_cube_normals() {
        let cube = Primitive::Cube;
        assert_eq!(cube.local_normal_at(Vec3::new(1.0, 0.5, -0.8)), Vec3::X);
        assert_eq!(cube.local_normal_at(Vec3::new(-0.4, 1.0, -0.1)), Vec3::Y);
        assert_eq!(cube.local_normal_at(Vec3::new(0.3, -0.4, -1.0)), -Vec3::Z);
        // Corners resolve to the x face
        assert_eq!(cube.local_normal_at(Vec3::new(-1.0, -1.0, -1.0)), -Vec3::X);
    }

    #[test]
    fn test_cylinder_misses_along_axis() {
        let cyl = Primitive::cylinder();
        assert!(hits(cyl, Vec3::new(1.0, 0.0, 0.0), Vec3::Y).is_empty());
        assert!(hits(cyl, Vec3::ZERO, Vec3::Y).is_empty());
    }

    #[test]
    fn test_cylinder_hits_walls() {
        let cyl = Primitive::cylinder();
        assert_close(&hits(cyl, Vec3::new(1.0, 0.0, -5.0), Vec3::Z), &[5.0, 5.0]);
        assert_close(&hits(cyl, Vec3::new(0.0, 0.0, -5.0), Vec3::Z), &[4.0, 6.0]);
    }

    #[test]
    fn test_truncated_cylinder() {
        let cyl = Primitive::Cylinder {
            minimum: 1.0,
            maximum: 2.0,
            closed: false,
        };
        assert!(hits(cyl, Vec3::new(0.0, 3.0, -5.0), Vec3::Z).is_empty());
        assert!(hits(cyl, Vec3::new(0.0, 2.0, -5.0), Vec3::Z).is_empty());
        assert_eq!(hits(cyl, Vec3::new(0.0, 1.5, -2.0), Vec3::Z).len(), 2);
    }

    #[test]
    fn test_capped_cylinder() {
        let cyl = Primitive::Cylinder {
            minimum: 1.0,
            maximum: 2.0,
            closed: true,
        };
        assert_eq!(hits(cyl, Vec3::new(0.0, 3.0, 0.0), -Vec3::Y).len(), 2);
        assert_eq!(hits(cyl, Vec3::new(0.0, -1.0, -2.0), Vec3::new(0.0, 1.0, 1.0).normalize()).len(), 2);
        assert_eq!(cyl.local_normal_at(Vec3::new(0.5, 2.0, 0.0)), Vec3::Y);
        assert_eq!(cyl.local_normal_at(Vec3::new(0.0, 1.0, 0.5)), -Vec3::Y);
        assert_eq!(cyl.local_normal_at(Vec3::new(0.0, 1.5, -1.0)), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_bounds() {
        let b = Primitive::Sphere.local_bounds();
        assert_eq!(b.min(), Vec3::splat(-1.0));
        assert_eq!(b.max(), Vec3::splat(1.0));

        assert!(Primitive::Plane.local_bounds().is_unbounded());
        assert!(Primitive::cylinder().local_bounds().is_unbounded());
    }
}
