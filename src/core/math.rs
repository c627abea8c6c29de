//! Mathematical primitives for 2D registration.
//!
//! Angle arithmetic plus the small dense 2x2 matrix machinery used by the
//! Kabsch rigid-transform solve.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

/// A general 2x2 matrix, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2 {
    pub m00: f32,
    pub m01: f32,
    pub m10: f32,
    pub m11: f32,
}

impl Mat2 {
    #[inline]
    pub fn new(m00: f32, m01: f32, m10: f32, m11: f32) -> Self {
        Self { m00, m01, m10, m11 }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn det(&self) -> f32 {
        self.m00 * self.m11 - self.m01 * self.m10
    }

    #[inline]
    pub fn transpose(&self) -> Mat2 {
        Mat2::new(self.m00, self.m10, self.m01, self.m11)
    }

    #[inline]
    pub fn mul(&self, rhs: &Mat2) -> Mat2 {
        Mat2::new(
            self.m00 * rhs.m00 + self.m01 * rhs.m10,
            self.m00 * rhs.m01 + self.m01 * rhs.m11,
            self.m10 * rhs.m00 + self.m11 * rhs.m10,
            self.m10 * rhs.m01 + self.m11 * rhs.m11,
        )
    }

    /// Flip the sign of the second column.
    ///
    /// Used to repair a reflection coming out of the SVD factorization.
    #[inline]
    pub fn flip_second_column(&self) -> Mat2 {
        Mat2::new(self.m00, -self.m01, self.m10, -self.m11)
    }
}

/// A proper 2D rotation (orthonormal, determinant +1).
///
/// Construction goes through an angle, so the determinant invariant holds by
/// construction; `from_matrix` re-projects an approximately-orthonormal
/// matrix onto the closest rotation via atan2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rot2 {
    cos: f32,
    sin: f32,
}

impl Rot2 {
    #[inline]
    pub fn identity() -> Self {
        Self { cos: 1.0, sin: 0.0 }
    }

    #[inline]
    pub fn from_angle(theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self { cos, sin }
    }

    /// Project a (nearly) orthonormal matrix onto a proper rotation.
    #[inline]
    pub fn from_matrix(m: &Mat2) -> Self {
        Self::from_angle(m.m10.atan2(m.m00))
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.sin.atan2(self.cos)
    }

    #[inline]
    pub fn matrix(&self) -> Mat2 {
        Mat2::new(self.cos, -self.sin, self.sin, self.cos)
    }

    /// Rotate a point.
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.cos * x - self.sin * y, self.sin * x + self.cos * y)
    }
}

/// Closed-form singular value decomposition of a 2x2 matrix.
///
/// Returns `(u, sigma, v)` with `m = u * diag(sigma) * v^T`, `sigma[0] >=
/// sigma[1] >= 0`, and `u`, `v` orthogonal. When the input has negative
/// determinant one of the factors carries the reflection; callers that need
/// a proper rotation must check the determinant of whatever they build from
/// `u` and `v`.
pub fn svd2x2(m: &Mat2) -> (Mat2, [f32; 2], Mat2) {
    let e = (m.m00 + m.m11) * 0.5;
    let f = (m.m00 - m.m11) * 0.5;
    let g = (m.m10 + m.m01) * 0.5;
    let h = (m.m10 - m.m01) * 0.5;

    let q = (e * e + h * h).sqrt();
    let r = (f * f + g * g).sqrt();

    let sx = q + r;
    let sy = q - r; // signed: negative when det(m) < 0

    let a1 = g.atan2(f);
    let a2 = h.atan2(e);
    let theta = (a2 - a1) * 0.5; // right factor angle
    let phi = (a2 + a1) * 0.5; // left factor angle

    let mut u = Rot2::from_angle(phi).matrix();
    // m = R(phi) * diag(sx, sy) * R(theta); V^T = R(theta) so V = R(theta)^T
    let v = Rot2::from_angle(theta).matrix().transpose();

    // Fold a negative second singular value into U's second column so that
    // sigma is non-negative.
    let sigma = if sy < 0.0 {
        u = u.flip_second_column();
        [sx, -sy]
    } else {
        [sx, sy]
    };

    (u, sigma, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: &Mat2, b: &Mat2, eps: f32) {
        assert_relative_eq!(a.m00, b.m00, epsilon = eps);
        assert_relative_eq!(a.m01, b.m01, epsilon = eps);
        assert_relative_eq!(a.m10, b.m10, epsilon = eps);
        assert_relative_eq!(a.m11, b.m11, epsilon = eps);
    }

    fn reconstruct(u: &Mat2, s: &[f32; 2], v: &Mat2) -> Mat2 {
        let sigma = Mat2::new(s[0], 0.0, 0.0, s[1]);
        u.mul(&sigma).mul(&v.transpose())
    }

    #[test]
    fn test_normalize_angle_wraps() {
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-3.0 * PI), -PI, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_rot2_is_proper() {
        for theta in [-2.5f32, -0.3, 0.0, 0.7, 3.1] {
            let r = Rot2::from_angle(theta).matrix();
            assert_relative_eq!(r.det(), 1.0, epsilon = 1e-6);
            // orthonormal columns
            assert_relative_eq!(r.m00 * r.m01 + r.m10 * r.m11, 0.0, epsilon = 1e-6);
            assert_relative_eq!(r.m00 * r.m00 + r.m10 * r.m10, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rot2_apply_quarter_turn() {
        let r = Rot2::from_angle(std::f32::consts::FRAC_PI_2);
        let (x, y) = r.apply(1.0, 0.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_svd_diagonal() {
        let m = Mat2::new(2.0, 0.0, 0.0, 1.0);
        let (u, s, v) = svd2x2(&m);
        assert_relative_eq!(s[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(s[1], 1.0, epsilon = 1e-5);
        assert_mat_eq(&reconstruct(&u, &s, &v), &m, 1e-5);
    }

    #[test]
    fn test_svd_rotation_input() {
        let m = Rot2::from_angle(0.9).matrix();
        let (u, s, v) = svd2x2(&m);
        assert_relative_eq!(s[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(s[1], 1.0, epsilon = 1e-5);
        assert_mat_eq(&reconstruct(&u, &s, &v), &m, 1e-5);
    }

    #[test]
    fn test_svd_reflection_input() {
        // det = -1: one factor must absorb the reflection while sigma stays
        // non-negative.
        let m = Mat2::new(1.0, 0.0, 0.0, -1.0);
        let (u, s, v) = svd2x2(&m);
        assert!(s[0] >= 0.0 && s[1] >= 0.0);
        assert_mat_eq(&reconstruct(&u, &s, &v), &m, 1e-5);
        assert!(u.det() * v.det() < 0.0);
    }

    #[test]
    fn test_svd_general_matrix() {
        let m = Mat2::new(0.8, -1.3, 2.1, 0.4);
        let (u, s, v) = svd2x2(&m);
        assert!(s[0] >= s[1] && s[1] >= 0.0);
        assert_mat_eq(&reconstruct(&u, &s, &v), &m, 1e-4);
        // factors stay orthogonal
        assert_relative_eq!(u.det().abs(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.det().abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_svd_rank_deficient() {
        let m = Mat2::new(0.0, 1.0, 0.0, 0.0);
        let (u, s, v) = svd2x2(&m);
        assert_relative_eq!(s[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(s[1], 0.0, epsilon = 1e-5);
        assert_mat_eq(&reconstruct(&u, &s, &v), &m, 1e-5);
    }
}
