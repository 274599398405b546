//! Pure segment intersection routines
//!
//! These have no knowledge of meshes or estimators, and work on a segment
//! from `start` to `end` parameterised as `p(t) = start + t*(end - start)` for
//! `t` in `[0, 1]`.

// crate modules
use crate::ElementId;

// external crates
use nalgebra::Vector3;

/// Sub-lengths at or below this are treated as a miss
pub const GEOMETRIC_TOLERANCE: f64 = 1e-12;

/// Parametric interval of a segment inside an axis-aligned box
///
/// Slab method, so faces are inclusive. Returns `None` when the segment misses
/// the box or only touches it at a single point.
///
/// ```rust
/// # use ntally_geometry::segment_box_intersection;
/// let (t0, t1) = segment_box_intersection(
///     &[-1.0, 0.5, 0.5],
///     &[3.0, 0.5, 0.5],
///     &[0.0, 0.0, 0.0],
///     &[2.0, 1.0, 1.0],
/// ).unwrap();
///
/// assert_eq!((t0, t1), (0.25, 0.75));
/// ```
pub fn segment_box_intersection(
    start: &[f64; 3],
    end: &[f64; 3],
    lower: &[f64; 3],
    upper: &[f64; 3],
) -> Option<(f64, f64)> {
    let mut t_min: f64 = 0.0;
    let mut t_max: f64 = 1.0;

    for axis in 0..3 {
        let d = end[axis] - start[axis];

        if d == 0.0 {
            // parallel to this slab, either always inside or never
            if start[axis] < lower[axis] || start[axis] > upper[axis] {
                return None;
            }
            continue;
        }

        let t_lower = (lower[axis] - start[axis]) / d;
        let t_upper = (upper[axis] - start[axis]) / d;
        let (t_near, t_far) = if t_lower <= t_upper {
            (t_lower, t_upper)
        } else {
            (t_upper, t_lower)
        };

        t_min = t_min.max(t_near);
        t_max = t_max.min(t_far);

        if t_min > t_max {
            return None;
        }
    }

    (t_min < t_max || start == end).then_some((t_min, t_max))
}

/// Length of a segment inside a tetrahedron
///
/// The vertex order does not matter. See [segment_tet_interval] for the
/// clipping itself.
///
/// ```rust
/// # use ntally_geometry::segment_tet_intersection;
/// let tet = [
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ];
///
/// // along the z axis, which is an edge of the tet
/// let length = segment_tet_intersection(&[0.1, 0.1, -1.0], &[0.1, 0.1, 2.0], &tet);
/// assert!((length - 0.8).abs() < 1e-12);
///
/// // misses entirely
/// assert_eq!(segment_tet_intersection(&[2.0, 2.0, 2.0], &[3.0, 3.0, 3.0], &tet), 0.0);
/// ```
pub fn segment_tet_intersection(start: &[f64; 3], end: &[f64; 3], tet: &[[f64; 3]; 4]) -> f64 {
    match segment_tet_interval(start, end, tet) {
        Some((t_min, t_max)) => {
            (t_max - t_min) * (Vector3::from(*end) - Vector3::from(*start)).norm()
        }
        None => 0.0,
    }
}

/// Parametric interval of a segment inside a tetrahedron
///
/// Cyrus-Beck clipping of the segment against the four face half-spaces,
/// each face normal oriented away from the opposite vertex. Faces are
/// inclusive, so a segment lying in a face is inside. Returns `None` when
/// the segment misses or only touches the tet at a single point.
///
/// ```rust
/// # use ntally_geometry::segment_tet_interval;
/// let tet = [
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ];
///
/// let (t0, t1) = segment_tet_interval(&[0.2, 0.2, -1.0], &[0.2, 0.2, 1.0], &tet).unwrap();
/// assert!((t0 - 0.5).abs() < 1e-12);
/// assert!((t1 - 0.8).abs() < 1e-12);
/// ```
pub fn segment_tet_interval(
    start: &[f64; 3],
    end: &[f64; 3],
    tet: &[[f64; 3]; 4],
) -> Option<(f64, f64)> {
    let a = Vector3::from(*start);
    let d = Vector3::from(*end) - a;
    let v = tet.map(Vector3::from);

    let mut t_min: f64 = 0.0;
    let mut t_max: f64 = 1.0;

    // each face is the three vertices other than `opposite`
    for opposite in 0..4 {
        let face: Vec<&Vector3<f64>> = (0..4).filter(|i| *i != opposite).map(|i| &v[i]).collect();

        let mut normal = (face[1] - face[0]).cross(&(face[2] - face[0]));
        if normal.dot(&(v[opposite] - face[0])) > 0.0 {
            normal = -normal;
        }

        // inside where normal.(p - face[0]) <= 0
        let distance = normal.dot(&(a - face[0]));
        let rate = normal.dot(&d);

        if rate == 0.0 {
            if distance > 0.0 {
                return None;
            }
            continue;
        }

        let t = -distance / rate;
        if rate > 0.0 {
            t_max = t_max.min(t);
        } else {
            t_min = t_min.max(t);
        }

        if t_min >= t_max {
            return None;
        }
    }

    Some((t_min, t_max))
}

/// Add a length to an element, merging with any existing entry for it
pub(crate) fn accumulate_length(lengths: &mut Vec<(ElementId, f64)>, id: ElementId, length: f64) {
    match lengths.iter_mut().find(|(e, _)| *e == id) {
        Some((_, l)) => *l += length,
        None => lengths.push((id, length)),
    }
}
