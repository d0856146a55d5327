//! Triangle winding/normal validation and repair.
//!
//! The computed normal of a triangle is `(V1 - V0) x (V2 - V0)`. A zero result
//! means the vertices do not span a triangle. Otherwise the unit computed
//! normal is compared component-wise with the unit declared normal within
//! [`normal_tolerance`].
//!
//! Both encodings round what they store: binary narrows every value to f32
//! and ASCII prints six significant digits by default. The tolerance is
//! [`NORMAL_EPSILON`] plus a first-order bound on how far a relative rounding
//! of [`STORAGE_ROUNDING`] in every coordinate can move the two unit normals,
//! so a triangle written with a computed normal is accepted when read back.
//! ASCII output written with a precision below six digits may still fail.
//!
//! Parsers call [`validate`] on decode and writers call [`apply_normal_mode`]
//! on encode. With the `validation` feature disabled [`validate`] accepts every
//! triangle unchanged.

use log::{debug, warn};

use crate::callbacks::ErrorEvent;
use crate::error::{ErrorCode, Recovery, StlError, StlResult};
use crate::options::NormalMode;
use crate::triangle::Triangle;
use crate::vector::{self, Vec3};

/// Floor of the per-component tolerance between the two unit normals.
pub const NORMAL_EPSILON: f64 = f32::EPSILON as f64;

/// Relative error of a stored coordinate: half a unit in the sixth
/// significant digit. Covers f32 narrowing (2^-24) as well.
pub const STORAGE_ROUNDING: f64 = 5e-6;

/// Outcome of validating a triangle that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Deliver or serialize the (possibly repaired) triangle.
    Accept,
    /// Drop the triangle and continue with the next one.
    Skip,
}

/// Unit normal implied by the vertex winding, or `None` for a degenerate triangle.
pub fn computed_normal(triangle: &Triangle) -> Option<Vec3> {
    let [v0, v1, v2] = triangle.vertices;
    vector::normalized(vector::cross(vector::sub(v1, v0), vector::sub(v2, v0)))
}

/// Per-component tolerance used by [`check`] for a triangle with these vertices.
///
/// With every coordinate off by at most `r = STORAGE_ROUNDING` times the
/// largest coordinate magnitude `s`, each edge moves by at most `2 sqrt(3) r s`.
/// The cross product `c = e1 x e2` then moves by at most
/// `2 sqrt(3) r s (|e1| + |e2|)`, and its unit vector by twice that over `|c|`.
/// The declared normal, rounded the same way, adds `2 sqrt(3) r`. The result
/// is meaningless for degenerate vertices, which [`check`] rejects first.
pub fn normal_tolerance(vertices: &[Vec3; 3]) -> f64 {
    let [v0, v1, v2] = *vertices;
    let e1 = vector::sub(v1, v0);
    let e2 = vector::sub(v2, v0);
    let area = vector::length(vector::cross(e1, e2));
    let scale = vertices
        .iter()
        .flatten()
        .fold(0.0f64, |m, c| m.max(c.abs()));
    let spread = 2.0 * 3f64.sqrt() * STORAGE_ROUNDING;
    let leverage = 2.0 * scale * (vector::length(e1) + vector::length(e2)) / area;
    NORMAL_EPSILON + spread * (1.0 + leverage)
}

/// Checks a triangle without consulting any callback.
///
/// Always performs the geometric check, regardless of the `validation` feature.
pub fn check(triangle: &Triangle) -> Result<(), ErrorCode> {
    let computed = computed_normal(triangle).ok_or(ErrorCode::NotATriangle)?;
    let declared = vector::normalized(triangle.normal).ok_or(ErrorCode::VertexNormalMismatch)?;
    let tolerance = normal_tolerance(&triangle.vertices);
    let matches = computed
        .iter()
        .zip(declared.iter())
        .all(|(c, d)| (c - d).abs() <= tolerance);
    if matches {
        Ok(())
    } else {
        Err(ErrorCode::VertexNormalMismatch)
    }
}

/// Validates `triangle`, asking `on_error` how to recover from a failure.
///
/// `position` is reported to the callback and attached to the returned error.
pub fn validate(
    triangle: &mut Triangle,
    position: u64,
    on_error: &mut dyn FnMut(&ErrorEvent<'_>) -> Recovery,
) -> StlResult<Verdict> {
    if !cfg!(feature = "validation") {
        return Ok(Verdict::Accept);
    }
    let code = match check(triangle) {
        Ok(()) => return Ok(Verdict::Accept),
        Err(code) => code,
    };
    let recovery = on_error(&ErrorEvent {
        code,
        position,
        triangle: Some(&*triangle),
    });
    recover(triangle, code, recovery, position)
}

/// Applies a writer's [`NormalMode`] to the triangle about to be serialized.
pub fn apply_normal_mode(
    triangle: &mut Triangle,
    mode: NormalMode,
    position: u64,
    on_error: &mut dyn FnMut(&ErrorEvent<'_>) -> Recovery,
) -> StlResult<Verdict> {
    match mode {
        NormalMode::CheckNormals => validate(triangle, position, on_error),
        NormalMode::CopyNormals => Ok(Verdict::Accept),
        NormalMode::CalculateNormals => match computed_normal(triangle) {
            Some(normal) => {
                triangle.normal = normal;
                Ok(Verdict::Accept)
            }
            None => {
                let recovery = on_error(&ErrorEvent {
                    code: ErrorCode::NotATriangle,
                    position,
                    triangle: Some(&*triangle),
                });
                recover(triangle, ErrorCode::NotATriangle, recovery, position)
            }
        },
    }
}

fn recover(
    triangle: &mut Triangle,
    code: ErrorCode,
    recovery: Recovery,
    position: u64,
) -> StlResult<Verdict> {
    let fail = || Err(StlError::from_code(code).at(position));
    match (code, recovery) {
        (_, Recovery::Abort) => fail(),
        (_, Recovery::Keep) => {
            warn!("{code} at {position}: keeping triangle as is");
            Ok(Verdict::Accept)
        }
        (_, Recovery::Skip) => {
            warn!("{code} at {position}: skipping triangle");
            Ok(Verdict::Skip)
        }
        (ErrorCode::VertexNormalMismatch, Recovery::RepairOrder) => {
            debug!("{code} at {position}: swapping vertices 1 and 2");
            triangle.flip_winding();
            Ok(Verdict::Accept)
        }
        (ErrorCode::VertexNormalMismatch, Recovery::RepairNormal) => match computed_normal(triangle) {
            Some(normal) => {
                debug!("{code} at {position}: replacing declared normal");
                triangle.normal = normal;
                Ok(Verdict::Accept)
            }
            None => fail(),
        },
        // A degenerate triangle has no winding or normal to repair.
        _ => fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle(normal: Vec3) -> Triangle {
        Triangle::new(
            normal,
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        )
    }

    fn abort(_: &ErrorEvent<'_>) -> Recovery {
        Recovery::Abort
    }

    #[test]
    fn computed_normal_follows_right_hand_rule() {
        assert_eq!(computed_normal(&unit_triangle([0.0; 3])), Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn declared_normal_is_normalized_before_compare() {
        assert_eq!(check(&unit_triangle([0.0, 0.0, 5.0])), Ok(()));
    }

    /// Rounds to `digits` significant decimal digits, like `%g` output.
    fn round_digits(value: f64, digits: usize) -> f64 {
        format!("{:.*e}", digits - 1, value).parse().unwrap()
    }

    fn general_triangle() -> Triangle {
        let mut tri = Triangle::new(
            [0.0; 3],
            [[10.1, 20.2, 3.3], [11.7, 20.9, 3.1], [10.4, 22.3, 4.8]],
        );
        tri.normal = computed_normal(&tri).unwrap();
        tri
    }

    #[test]
    fn f32_narrowing_stays_within_tolerance() {
        let mut tri = general_triangle();
        for c in tri.normal.iter_mut().chain(tri.vertices.iter_mut().flatten()) {
            *c = f64::from(*c as f32);
        }
        assert_eq!(check(&tri), Ok(()));
    }

    #[test]
    fn six_digit_text_stays_within_tolerance() {
        let mut tri = general_triangle();
        for c in tri.normal.iter_mut().chain(tri.vertices.iter_mut().flatten()) {
            *c = round_digits(*c, 6);
        }
        assert_eq!(check(&tri), Ok(()));
    }

    #[test]
    fn tilted_normal_is_still_a_mismatch() {
        let tilt = 1e-3;
        assert!(normal_tolerance(&unit_triangle([0.0; 3]).vertices) < tilt);
        assert_eq!(
            check(&unit_triangle([tilt, 0.0, 1.0])),
            Err(ErrorCode::VertexNormalMismatch)
        );
    }

    #[test]
    fn tolerance_grows_with_distance_from_origin() {
        let near = normal_tolerance(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let far = normal_tolerance(&[[500.0, 0.0, 0.0], [501.0, 0.0, 0.0], [500.0, 1.0, 0.0]]);
        assert!(far > near * 100.0);
    }

    #[test]
    fn zero_declared_normal_is_a_mismatch() {
        assert_eq!(
            check(&unit_triangle([0.0, 0.0, 0.0])),
            Err(ErrorCode::VertexNormalMismatch)
        );
    }

    #[cfg(feature = "validation")]
    #[test]
    fn collinear_vertices_fail_without_callback() {
        let mut tri = Triangle::new(
            [0.0, 0.0, 1.0],
            [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
        );
        let err = validate(&mut tri, 7, &mut abort).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotATriangle);
        assert_eq!(err.position(), 7);
    }

    #[cfg(feature = "validation")]
    #[test]
    fn degenerate_cannot_be_repaired() {
        let mut tri = Triangle::new([0.0, 0.0, 1.0], [[1.0, 1.0, 1.0]; 3]);
        let err = validate(&mut tri, 0, &mut |_| Recovery::RepairNormal).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotATriangle);

        let verdict = validate(&mut tri, 0, &mut |_| Recovery::Skip).unwrap();
        assert_eq!(verdict, Verdict::Skip);
    }

    #[cfg(feature = "validation")]
    #[test]
    fn repair_order_fixes_antiparallel_normal() {
        let mut tri = unit_triangle([0.0, 0.0, -1.0]);
        let mut seen = None;
        let verdict = validate(&mut tri, 3, &mut |event| {
            seen = Some(event.code);
            Recovery::RepairOrder
        })
        .unwrap();
        assert_eq!(verdict, Verdict::Accept);
        assert_eq!(seen, Some(ErrorCode::VertexNormalMismatch));
        assert_eq!(check(&tri), Ok(()));
        assert_eq!(validate(&mut tri, 3, &mut abort).unwrap(), Verdict::Accept);
    }

    #[cfg(feature = "validation")]
    #[test]
    fn repair_normal_overwrites_declared_normal() {
        let mut tri = unit_triangle([1.0, 0.0, 0.0]);
        validate(&mut tri, 0, &mut |_| Recovery::RepairNormal).unwrap();
        assert_eq!(tri.normal, [0.0, 0.0, 1.0]);
    }

    #[cfg(feature = "validation")]
    #[test]
    fn keep_accepts_mismatch_unchanged() {
        let mut tri = unit_triangle([1.0, 0.0, 0.0]);
        assert_eq!(validate(&mut tri, 0, &mut |_| Recovery::Keep).unwrap(), Verdict::Accept);
        assert_eq!(tri.normal, [1.0, 0.0, 0.0]);
    }

    #[cfg(not(feature = "validation"))]
    #[test]
    fn disabled_validation_passes_everything() {
        let mut tri = Triangle::new([0.0; 3], [[1.0, 1.0, 1.0]; 3]);
        assert_eq!(validate(&mut tri, 0, &mut abort).unwrap(), Verdict::Accept);
    }

    #[test]
    fn calculate_mode_overwrites_normal() {
        let mut tri = unit_triangle([0.0, 1.0, 0.0]);
        let verdict =
            apply_normal_mode(&mut tri, NormalMode::CalculateNormals, 0, &mut abort).unwrap();
        assert_eq!(verdict, Verdict::Accept);
        assert_eq!(tri.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn copy_mode_never_checks() {
        let mut tri = Triangle::new([0.0; 3], [[1.0, 1.0, 1.0]; 3]);
        let verdict = apply_normal_mode(&mut tri, NormalMode::CopyNormals, 0, &mut abort).unwrap();
        assert_eq!(verdict, Verdict::Accept);
    }
}
