//! Collision detection and impulse response
//!
//! Narrow-phase tests between circles, axis-aligned rectangles and line
//! segments, plus the arcade impulse model shared by every bounce in the game.
//! Everything here is pure.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the obstacle surface (if hit)
    pub point: Vec2,
    /// Surface normal at contact, pointing from the obstacle toward the circle
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle-circle overlap (strict: touching is not overlapping)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}

/// Circle-circle contact with normal pointing from `b` toward `a`
pub fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> CollisionResult {
    if !circles_overlap(a, ra, b, rb) {
        return CollisionResult::miss();
    }
    let delta = a - b;
    let dist = delta.length();
    // Concentric circles: push straight up
    let normal = if dist > 1e-4 { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: b + normal * rb,
        normal,
        penetration: ra + rb - dist,
    }
}

/// Circle vs axis-aligned rectangle given by its min corner and size
///
/// Uses the closest point on the rectangle. When the circle center is inside
/// the rectangle the closest point degenerates, so the axis of minimum
/// penetration is used instead.
pub fn circle_rect(center: Vec2, radius: f32, rect_min: Vec2, rect_size: Vec2) -> CollisionResult {
    let rect_max = rect_min + rect_size;
    let closest = center.clamp(rect_min, rect_max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > 1e-8 {
        if dist_sq >= radius * radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center inside (or exactly on the boundary): exit through the nearest face
    let to_left = center.x - rect_min.x;
    let to_right = rect_max.x - center.x;
    let to_bottom = center.y - rect_min.y;
    let to_top = rect_max.y - center.y;

    let (depth, normal, point) = [
        (to_left, Vec2::NEG_X, Vec2::new(rect_min.x, center.y)),
        (to_right, Vec2::X, Vec2::new(rect_max.x, center.y)),
        (to_bottom, Vec2::NEG_Y, Vec2::new(center.x, rect_min.y)),
        (to_top, Vec2::Y, Vec2::new(center.x, rect_max.y)),
    ]
    .into_iter()
    .min_by(|a, b| a.0.total_cmp(&b.0))
    .unwrap_or((0.0, Vec2::Y, center));

    CollisionResult {
        hit: true,
        point,
        normal,
        penetration: depth + radius,
    }
}

/// Segment vs circle via the quadratic discriminant of the parametric segment
///
/// Returns the smallest segment parameter `t` in `[0, 1]` at which the segment
/// is inside the circle, or `None`. A segment entirely inside the circle hits
/// at `t = 0`.
pub fn line_circle(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let d = p1 - p0;
    let f = p0 - center;
    let a = d.dot(d);
    let c = f.dot(f) - radius * radius;

    if a < 1e-8 {
        // Degenerate segment is a point
        return (c <= 0.0).then_some(0.0);
    }

    let b = 2.0 * f.dot(d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);

    if (0.0..=1.0).contains(&t1) {
        Some(t1)
    } else if t1 < 0.0 && t2 >= 0.0 {
        // Segment starts inside the circle
        Some(0.0)
    } else {
        None
    }
}

/// Bounce off an immovable surface
///
/// `normal` points away from the surface. Velocities already leaving the
/// surface are returned unchanged.
pub fn static_bounce(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * vn * normal
}

/// Two-body impulse along the collision normal
///
/// Returns the new velocities of `a` and `b`, or `None` when the bodies are
/// already separating along the normal (no resolution needed).
pub fn elastic_impulse(
    pos_a: Vec2,
    vel_a: Vec2,
    mass_a: f32,
    pos_b: Vec2,
    vel_b: Vec2,
    mass_b: f32,
    restitution: f32,
) -> Option<(Vec2, Vec2)> {
    let normal = (pos_b - pos_a).normalize_or_zero();
    if normal == Vec2::ZERO {
        return None;
    }
    let relative = vel_b - vel_a;
    let vn = relative.dot(normal);
    if vn > 0.0 {
        return None;
    }

    let inv_a = 1.0 / mass_a.max(1e-4);
    let inv_b = 1.0 / mass_b.max(1e-4);
    let j = -(1.0 + restitution) * vn / (inv_a + inv_b);
    let impulse = normal * j;
    Some((vel_a - impulse * inv_a, vel_b + impulse * inv_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 10.0));
        assert!(!circles_overlap(Vec2::ZERO, 10.0, Vec2::new(20.0, 0.0), 10.0));
    }

    #[test]
    fn test_circle_rect_edge_contact() {
        // Rect spans x 5..15, y -5..5; closest point is (5, 0)
        let result = circle_rect(Vec2::ZERO, 10.0, Vec2::new(5.0, -5.0), Vec2::new(10.0, 10.0));
        assert!(result.hit);
        assert!((result.normal - Vec2::new(-1.0, 0.0)).length() < 1e-5);
        assert!((result.penetration - 5.0).abs() < 1e-5);
        assert_eq!(result.point, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_circle_rect_corner_contact() {
        // Rect spans 5..20 on both axes; corner (5, 5) is ~7.07 away
        let result = circle_rect(Vec2::ZERO, 10.0, Vec2::new(5.0, 5.0), Vec2::new(15.0, 15.0));
        assert!(result.hit);
        assert!(result.normal.x < 0.0 && result.normal.y < 0.0);
        let expected = 10.0 - 50.0_f32.sqrt();
        assert!((result.penetration - expected).abs() < 1e-4);
    }

    #[test]
    fn test_circle_rect_miss() {
        let result = circle_rect(Vec2::ZERO, 10.0, Vec2::new(20.0, 20.0), Vec2::new(10.0, 10.0));
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_rect_interior_fallback() {
        // Center inside, 2 from the top face: exits upward
        let result = circle_rect(Vec2::new(50.0, 18.0), 5.0, Vec2::ZERO, Vec2::new(100.0, 20.0));
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::Y);
        assert!((result.penetration - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_line_circle_hit_and_miss() {
        let p0 = Vec2::ZERO;
        let p1 = Vec2::new(100.0, 0.0);
        assert!(line_circle(p0, p1, Vec2::new(50.0, 5.0), 10.0).is_some());
        assert!(line_circle(p0, p1, Vec2::new(50.0, 50.0), 10.0).is_none());
    }

    #[test]
    fn test_line_circle_entry_parameter() {
        let t = line_circle(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(50.0, 0.0), 10.0).unwrap();
        assert!((t - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_line_circle_segment_inside() {
        let t = line_circle(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0), Vec2::ZERO, 10.0);
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_line_circle_beyond_segment_end() {
        // Line would hit at t > 1
        assert!(line_circle(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(50.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_static_bounce_ignores_separating() {
        let v = Vec2::new(0.0, 50.0);
        assert_eq!(static_bounce(v, Vec2::Y, 0.5), v);
        let bounced = static_bounce(Vec2::new(0.0, -100.0), Vec2::Y, 0.5);
        assert!((bounced.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_elastic_equal_masses_swap() {
        let (va, vb) = elastic_impulse(
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            1.0,
            Vec2::new(5.0, 0.0),
            Vec2::ZERO,
            1.0,
            1.0,
        )
        .unwrap();
        assert!(va.length() < 1e-4);
        assert!((vb.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_elastic_separating_is_none() {
        let result = elastic_impulse(
            Vec2::ZERO,
            Vec2::new(-10.0, 0.0),
            1.0,
            Vec2::new(5.0, 0.0),
            Vec2::ZERO,
            1.0,
            1.0,
        );
        assert!(result.is_none());
    }

    proptest! {
        #[test]
        fn prop_elastic_conserves_momentum(
            vax in -500.0f32..500.0, vay in -500.0f32..500.0,
            vbx in -500.0f32..500.0, vby in -500.0f32..500.0,
            ma in 0.5f32..5.0, mb in 0.5f32..5.0,
            e in 0.0f32..1.0,
        ) {
            let va = Vec2::new(vax, vay);
            let vb = Vec2::new(vbx, vby);
            if let Some((na, nb)) = elastic_impulse(Vec2::ZERO, va, ma, Vec2::new(10.0, 3.0), vb, mb, e) {
                let before = va * ma + vb * mb;
                let after = na * ma + nb * mb;
                prop_assert!((before - after).length() < 0.05 * (1.0 + before.length()));
            }
        }

        #[test]
        fn prop_circle_rect_normal_is_unit(
            cx in -50.0f32..50.0, cy in -50.0f32..50.0, r in 1.0f32..30.0,
        ) {
            let result = circle_rect(Vec2::new(cx, cy), r, Vec2::new(-10.0, -10.0), Vec2::new(20.0, 20.0));
            if result.hit {
                prop_assert!((result.normal.length() - 1.0).abs() < 1e-3);
                prop_assert!(result.penetration > 0.0);
            }
        }
    }
}
