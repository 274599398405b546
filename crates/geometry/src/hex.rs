//! Structured hexahedral (rectilinear) meshes

// crate modules
use crate::error::{Error, Result};
use crate::intersect::{accumulate_length, segment_box_intersection, GEOMETRIC_TOLERANCE};
use crate::ElementId;

// ntally modules
use ntally_utils::{f, SliceExt};

// external crates
use log::trace;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Rectilinear mesh of hexahedral elements defined by x, y, and z planes
///
/// Elements are indexed with x varying fastest, so the element between planes
/// `x[i]..x[i+1]`, `y[j]..y[j+1]`, and `z[k]..z[k+1]` has the id
///
/// ```text
///     id = i + j*nx + k*nx*ny
/// ```
///
/// where `nx` and `ny` are the number of elements along x and y. This is also
/// the cell ordering of a VTK rectilinear grid.
///
/// ```rust
/// # use ntally_geometry::StructuredHexMesh;
/// let mesh = StructuredHexMesh::new(
///     vec![0.0, 1.0, 2.0],
///     vec![0.0, 1.0, 2.0],
///     vec![0.0, 1.0, 2.0],
/// ).unwrap();
///
/// assert_eq!(mesh.number_of_elements(), 8);
/// assert_eq!(mesh.element_index(1, 1, 1), 7);
/// assert_eq!(mesh.element_containing([1.5, 0.5, 0.5]), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HexPlanes", into = "HexPlanes")]
pub struct StructuredHexMesh {
    x_planes: Vec<f64>,
    y_planes: Vec<f64>,
    z_planes: Vec<f64>,
}

impl StructuredHexMesh {
    /// Create a mesh from plane locations along each axis
    ///
    /// Every axis needs at least two strictly increasing, finite planes.
    pub fn new(x_planes: Vec<f64>, y_planes: Vec<f64>, z_planes: Vec<f64>) -> Result<Self> {
        for (axis, planes) in [('x', &x_planes), ('y', &y_planes), ('z', &z_planes)] {
            if planes.len() < 2 {
                return Err(Error::InvalidPlanes {
                    axis,
                    reason: f!("at least 2 planes required, found {}", planes.len()),
                });
            }
            if !planes.is_strictly_increasing() {
                return Err(Error::InvalidPlanes {
                    axis,
                    reason: "planes must be finite and strictly increasing".to_string(),
                });
            }
        }

        Ok(Self {
            x_planes,
            y_planes,
            z_planes,
        })
    }

    /// Plane locations along x
    pub fn x_planes(&self) -> &[f64] {
        &self.x_planes
    }

    /// Plane locations along y
    pub fn y_planes(&self) -> &[f64] {
        &self.y_planes
    }

    /// Plane locations along z
    pub fn z_planes(&self) -> &[f64] {
        &self.z_planes
    }

    /// Number of elements along each axis
    pub fn dimensions(&self) -> [usize; 3] {
        [
            self.x_planes.len() - 1,
            self.y_planes.len() - 1,
            self.z_planes.len() - 1,
        ]
    }

    /// Total number of hexahedral elements
    pub fn number_of_elements(&self) -> usize {
        let [nx, ny, nz] = self.dimensions();
        nx * ny * nz
    }

    /// Iterator over every element id in order
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> {
        0..self.number_of_elements() as ElementId
    }

    /// Element id from (i,j,k) indices
    pub fn element_index(&self, i: usize, j: usize, k: usize) -> ElementId {
        let [nx, ny, _] = self.dimensions();
        (i + j * nx + k * nx * ny) as ElementId
    }

    /// (i,j,k) indices of an element id
    pub fn element_ijk(&self, id: ElementId) -> Result<[usize; 3]> {
        if id >= self.number_of_elements() as ElementId {
            return Err(Error::ElementOutOfRange(id));
        }

        let [nx, ny, _] = self.dimensions();
        let id = id as usize;
        Ok([id % nx, (id / nx) % ny, id / (nx * ny)])
    }

    /// Volume of a single element
    pub fn volume(&self, id: ElementId) -> Result<f64> {
        let [i, j, k] = self.element_ijk(id)?;
        Ok((self.x_planes[i + 1] - self.x_planes[i])
            * (self.y_planes[j + 1] - self.y_planes[j])
            * (self.z_planes[k + 1] - self.z_planes[k]))
    }

    /// Lower and upper corners of the mesh bounding box
    pub fn bounds(&self) -> ([f64; 3], [f64; 3]) {
        let [nx, ny, nz] = self.dimensions();
        (
            [self.x_planes[0], self.y_planes[0], self.z_planes[0]],
            [self.x_planes[nx], self.y_planes[ny], self.z_planes[nz]],
        )
    }

    /// Find the element containing a point
    ///
    /// Points on an interior plane belong to the element below it, and points
    /// on the outer boundary are inside the mesh. Returns `None` for points
    /// outside the mesh.
    pub fn element_containing(&self, point: [f64; 3]) -> Option<ElementId> {
        let i = self.x_planes.find_bin_inclusive(point[0]).ok()?;
        let j = self.y_planes.find_bin_inclusive(point[1]).ok()?;
        let k = self.z_planes.find_bin_inclusive(point[2]).ok()?;
        Some(self.element_index(i, j, k))
    }

    /// Lengths of a segment inside each element it crosses
    ///
    /// The segment is clipped to the mesh bounding box, then split at every
    /// plane it crosses. Each piece is assigned to the element containing its
    /// midpoint. An element appears at most once in the result, in the order
    /// the segment first enters it.
    ///
    /// ```rust
    /// # use ntally_geometry::StructuredHexMesh;
    /// let mesh = StructuredHexMesh::new(
    ///     vec![0.0, 1.0, 2.0],
    ///     vec![0.0, 1.0, 2.0],
    ///     vec![0.0, 1.0, 2.0],
    /// ).unwrap();
    ///
    /// // starts outside the mesh, only the portion inside is reported
    /// let lengths = mesh.track_lengths([-2.0, 0.5, 0.5], [2.0, 0.5, 0.5]);
    /// assert_eq!(lengths, vec![(0, 1.0), (1, 1.0)]);
    /// ```
    pub fn track_lengths(&self, start: [f64; 3], end: [f64; 3]) -> Vec<(ElementId, f64)> {
        let a = Vector3::from(start);
        let direction = Vector3::from(end) - a;
        let length = direction.norm();

        let (lower, upper) = self.bounds();
        let Some((t_min, t_max)) = segment_box_intersection(&start, &end, &lower, &upper) else {
            return Vec::new();
        };

        // every parametric plane crossing strictly inside the clipped interval
        let mut crossings = vec![t_min, t_max];
        for (axis, planes) in [&self.x_planes, &self.y_planes, &self.z_planes]
            .into_iter()
            .enumerate()
        {
            if direction[axis] == 0.0 {
                continue;
            }
            crossings.extend(
                planes
                    .iter()
                    .map(|p| (p - a[axis]) / direction[axis])
                    .filter(|t| *t > t_min && *t < t_max),
            );
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        let mut lengths = Vec::new();
        for pair in crossings.windows(2) {
            let sub_length = (pair[1] - pair[0]) * length;
            if sub_length <= GEOMETRIC_TOLERANCE {
                continue;
            }

            let midpoint = a + direction * (0.5 * (pair[0] + pair[1]));
            if let Some(id) = self.element_containing(midpoint.into()) {
                accumulate_length(&mut lengths, id, sub_length);
            }
        }

        trace!("Segment crossed {} hex elements", lengths.len());
        lengths
    }
}

/// Plain plane arrays used to validate deserialised meshes
#[derive(Serialize, Deserialize)]
struct HexPlanes {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl TryFrom<HexPlanes> for StructuredHexMesh {
    type Error = Error;

    fn try_from(planes: HexPlanes) -> Result<Self> {
        Self::new(planes.x, planes.y, planes.z)
    }
}

impl From<StructuredHexMesh> for HexPlanes {
    fn from(mesh: StructuredHexMesh) -> Self {
        Self {
            x: mesh.x_planes,
            y: mesh.y_planes,
            z: mesh.z_planes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn unit_mesh() -> StructuredHexMesh {
        StructuredHexMesh::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0],
        )
        .unwrap()
    }

    #[rstest]
    fn construction_errors() {
        assert!(StructuredHexMesh::new(vec![0.0], vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(StructuredHexMesh::new(vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]).is_err());
        assert!(
            StructuredHexMesh::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, f64::NAN]).is_err()
        );
    }

    #[rstest]
    fn indexing(unit_mesh: StructuredHexMesh) {
        assert_eq!(unit_mesh.dimensions(), [2, 2, 2]);
        for id in unit_mesh.element_ids() {
            let [i, j, k] = unit_mesh.element_ijk(id).unwrap();
            assert_eq!(unit_mesh.element_index(i, j, k), id);
        }
        assert!(unit_mesh.element_ijk(8).is_err());
    }

    #[rstest]
    fn volumes() {
        let mesh =
            StructuredHexMesh::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0], vec![0.0, 0.5]).unwrap();
        assert_eq!(mesh.volume(0).unwrap(), 1.0);
        assert_eq!(mesh.volume(1).unwrap(), 2.0);
        assert!(mesh.volume(2).is_err());
    }

    #[rstest]
    #[case([0.5, 0.5, 0.5], Some(0))]
    #[case([1.5, 0.5, 0.5], Some(1))]
    #[case([0.5, 1.5, 0.5], Some(2))]
    #[case([1.5, 1.5, 1.5], Some(7))]
    #[case([0.0, 0.0, 0.0], Some(0))]
    #[case([2.0, 2.0, 2.0], Some(7))]
    #[case([2.1, 0.5, 0.5], None)]
    fn containing(unit_mesh: StructuredHexMesh, #[case] p: [f64; 3], #[case] id: Option<u64>) {
        assert_eq!(unit_mesh.element_containing(p), id);
    }

    #[rstest]
    #[case([0.5, 0.5, 0.0], [0.5, 0.5, 2.0], vec![(0, 1.0), (4, 1.0)])]
    #[case([0.5, 1.5, 2.0], [0.5, 1.5, 0.0], vec![(6, 1.0), (2, 1.0)])]
    #[case([1.5, 0.5, -5.0], [1.5, 0.5, 5.0], vec![(1, 1.0), (5, 1.0)])]
    #[case([0.5, 0.5, 0.25], [0.5, 0.5, 0.75], vec![(0, 0.5)])]
    fn column_tracks(
        unit_mesh: StructuredHexMesh,
        #[case] start: [f64; 3],
        #[case] end: [f64; 3],
        #[case] expected: Vec<(u64, f64)>,
    ) {
        let lengths = unit_mesh.track_lengths(start, end);
        assert_eq!(lengths.len(), expected.len());
        for ((id, l), (e_id, e_l)) in lengths.iter().zip(expected.iter()) {
            assert_eq!(id, e_id);
            assert!((l - e_l).abs() < 1e-12);
        }
    }

    #[rstest]
    fn diagonal_track(unit_mesh: StructuredHexMesh) {
        let lengths = unit_mesh.track_lengths([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        let total: f64 = lengths.iter().map(|(_, l)| l).sum();

        // passes exactly through the shared corner, so only two elements
        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths[0].0, 0);
        assert_eq!(lengths[1].0, 7);
        assert!((total - 12.0_f64.sqrt()).abs() < 1e-12);
    }

    #[rstest]
    fn oblique_track_conserves_length(unit_mesh: StructuredHexMesh) {
        let start = [0.1, 0.3, 0.2];
        let end = [1.9, 1.6, 1.7];
        let lengths = unit_mesh.track_lengths(start, end);

        let expected = (Vector3::from(end) - Vector3::from(start)).norm();
        let total: f64 = lengths.iter().map(|(_, l)| l).sum();
        assert!((total - expected).abs() < 1e-12);

        // ids never repeat
        let mut ids: Vec<u64> = lengths.iter().map(|(id, _)| *id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), lengths.len());
    }

    #[rstest]
    #[case([3.0, 3.0, 3.0], [4.0, 4.0, 4.0])]
    #[case([-1.0, 0.5, 0.5], [-0.5, 0.5, 0.5])]
    #[case([0.5, 0.5, 0.5], [0.5, 0.5, 0.5])]
    fn misses(unit_mesh: StructuredHexMesh, #[case] start: [f64; 3], #[case] end: [f64; 3]) {
        assert!(unit_mesh.track_lengths(start, end).is_empty());
    }

    #[rstest]
    fn grazing_outer_face(unit_mesh: StructuredHexMesh) {
        // boundary points belong to the mesh, so the top layer is scored
        let lengths = unit_mesh.track_lengths([0.0, 0.5, 2.0], [2.0, 0.5, 2.0]);
        assert_eq!(lengths, vec![(4, 1.0), (5, 1.0)]);
    }
}
