//! Minimal 3-component vector helpers used by triangle validation.
//!
//! Triangles store plain `[f64; 3]` arrays so records can be copied in and out
//! of byte buffers without conversion; these helpers operate on that layout.

/// A 3D vector with f64 components
pub type Vec3 = [f64; 3];

/// Component-wise difference `a - b`
#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Computes the cross product `a x b`
#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Computes the dot product of two vectors
#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Computes the length of the vector
#[inline]
pub fn length(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// Returns a unit-length copy of `v`, or `None` for a zero (or non-finite) vector.
#[inline]
pub fn normalized(v: Vec3) -> Option<Vec3> {
    let len = length(v);
    if len == 0.0 || !len.is_finite() {
        return None;
    }
    Some([v[0] / len, v[1] / len, v[2] / len])
}
