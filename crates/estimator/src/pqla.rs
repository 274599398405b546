//! Polar quadrature linear approximation (PQLA) of the unit sphere
//!
//! Directions are projected onto the octahedron `|x| + |y| + |z| = 1`. Each
//! of the eight faces is cut into `order^2` equal triangles by lines of
//! constant `|x|`, `|y|` and `|z|`, which gives `8 * order^2` direction bins.
//!
//! Within an octant, triangles are numbered row by row in `|x|`, alternating
//! the upward and downward triangles along each row. Octants are numbered
//! with bit 0 set for negative x, bit 1 for negative y, bit 2 for negative z.

/// Number of direction bins for a quadrature order
///
/// ```rust
/// # use ntally_estimator::pqla;
/// assert_eq!(pqla::number_of_bins(1), 8);
/// assert_eq!(pqla::number_of_bins(2), 32);
/// ```
pub fn number_of_bins(order: u32) -> usize {
    8 * (order as usize).pow(2)
}

/// Direction bin of a vector
///
/// The vector does not need to be normalised. Returns `None` for a zero order
/// or a zero/undefined direction.
///
/// ```rust
/// # use ntally_estimator::pqla;
/// assert_eq!(pqla::bin_index([0.0, 0.0, 1.0], 2), Some(0));
/// assert_eq!(pqla::bin_index([0.0, 0.0, -1.0], 2), Some(16));
/// assert_eq!(pqla::bin_index([0.0, 0.0, 0.0], 2), None);
/// ```
pub fn bin_index(direction: [f64; 3], order: u32) -> Option<usize> {
    let [x, y, z] = direction;
    let sum = x.abs() + y.abs() + z.abs();
    if order == 0 || !(sum > 0.0 && sum.is_finite()) {
        return None;
    }

    let n = order as usize;
    let n_f = order as f64;
    let octant = (x < 0.0) as usize + 2 * (y < 0.0) as usize + 4 * (z < 0.0) as usize;

    // barycentric-like coordinates on the octahedron face
    let a = n_f * x.abs() / sum;
    let b = n_f * y.abs() / sum;

    let i = (a.floor() as usize).min(n - 1);
    let j = (b.floor() as usize).min(n - 1 - i);

    // the last cell of a row only has an upward triangle
    let down = (a - i as f64) + (b - j as f64) > 1.0 && i + j + 2 <= n;
    let triangle = i * (2 * n - i) + 2 * j + down as usize;

    Some(octant * n * n + triangle)
}

/// Octant and in-octant triangle of a bin
pub(crate) fn describe(bin: usize, order: u32) -> (usize, usize) {
    let per_octant = (order as usize).pow(2).max(1);
    (bin / per_octant, bin % per_octant)
}
