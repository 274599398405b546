//! Unstructured tetrahedral meshes

// crate modules
use crate::error::{Error, Result};
use crate::intersect::{
    accumulate_length, segment_box_intersection, segment_tet_interval, GEOMETRIC_TOLERANCE,
};
use crate::ElementId;

// external crates
use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Tolerance on barycentric coordinates for point location
const BARYCENTRIC_TOLERANCE: f64 = 1e-6;

/// Mesh of linear tetrahedra
///
/// Element ids are the position of the tetrahedron in the connectivity list.
/// Volumes and bounding boxes are computed once on construction.
///
/// ```rust
/// # use ntally_geometry::TetMesh;
/// // a single corner of the unit cube
/// let mesh = TetMesh::new(
///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
///     vec![[0, 1, 2, 3]],
/// ).unwrap();
///
/// assert!((mesh.volume(0).unwrap() - 1.0 / 6.0).abs() < 1e-15);
/// assert_eq!(mesh.element_containing([0.1, 0.1, 0.1]), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TetConnectivity", into = "TetConnectivity")]
pub struct TetMesh {
    vertices: Vec<[f64; 3]>,
    tets: Vec<[usize; 4]>,
    volumes: Vec<f64>,
    boxes: Vec<([f64; 3], [f64; 3])>,
}

impl TetMesh {
    /// Create a mesh from vertex coordinates and four vertex indices per element
    ///
    /// Fails for indices that do not reference a vertex, and for degenerate
    /// elements with no volume.
    pub fn new(vertices: Vec<[f64; 3]>, tets: Vec<[usize; 4]>) -> Result<Self> {
        let mut volumes = Vec::with_capacity(tets.len());
        let mut boxes = Vec::with_capacity(tets.len());

        for (id, tet) in tets.iter().enumerate() {
            if let Some(vertex) = tet.iter().find(|v| **v >= vertices.len()) {
                return Err(Error::VertexOutOfRange {
                    element: id as ElementId,
                    vertex: *vertex,
                    available: vertices.len(),
                });
            }

            let corners = tet.map(|v| vertices[v]);
            let volume = tet_volume(&corners);
            if !(volume > 0.0) {
                return Err(Error::DegenerateElement(id as ElementId));
            }

            volumes.push(volume);
            boxes.push(bounding_box(&corners));
        }

        debug!("Tet mesh with {} elements", tets.len());
        Ok(Self {
            vertices,
            tets,
            volumes,
            boxes,
        })
    }

    /// Vertex coordinates
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// Vertex indices for every element
    pub fn connectivity(&self) -> &[[usize; 4]] {
        &self.tets
    }

    /// Total number of tetrahedral elements
    pub fn number_of_elements(&self) -> usize {
        self.tets.len()
    }

    /// Iterator over every element id in order
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> {
        0..self.number_of_elements() as ElementId
    }

    /// Coordinates of the four corners of an element
    pub fn corners(&self, id: ElementId) -> Result<[[f64; 3]; 4]> {
        let tet = self
            .tets
            .get(id as usize)
            .ok_or(Error::ElementOutOfRange(id))?;
        Ok(tet.map(|v| self.vertices[v]))
    }

    /// Volume of a single element
    pub fn volume(&self, id: ElementId) -> Result<f64> {
        self.volumes
            .get(id as usize)
            .copied()
            .ok_or(Error::ElementOutOfRange(id))
    }

    /// Find the element containing a point
    ///
    /// Uses the barycentric coordinates of the point, allowing a small
    /// tolerance so that points on shared faces are found. The first matching
    /// element is returned.
    pub fn element_containing(&self, point: [f64; 3]) -> Option<ElementId> {
        self.tets
            .iter()
            .zip(self.boxes.iter())
            .enumerate()
            .filter(|(_, (_, (lower, upper)))| {
                (0..3).all(|i| point[i] >= lower[i] && point[i] <= upper[i])
            })
            .find(|(_, (tet, _))| {
                let corners = tet.map(|v| self.vertices[v]);
                barycentric(&corners, &point)
                    .is_some_and(|b| b.iter().all(|c| *c >= -BARYCENTRIC_TOLERANCE))
            })
            .map(|(id, _)| id as ElementId)
    }

    /// Lengths of a segment inside each element it crosses
    ///
    /// Candidate elements are filtered on their bounding boxes before the exact
    /// segment-tetrahedron clip. The clipped intervals are then split at every
    /// entry and exit point, and each piece is given to the lowest element id
    /// that covers it. A segment running along a face shared by two elements
    /// is therefore only scored once. Each element appears at most once, in
    /// the order the segment first enters it.
    pub fn track_lengths(&self, start: [f64; 3], end: [f64; 3]) -> Vec<(ElementId, f64)> {
        let length = (Vector3::from(end) - Vector3::from(start)).norm();

        let intervals: Vec<(ElementId, f64, f64)> = self
            .boxes
            .iter()
            .enumerate()
            .filter(|(_, (lower, upper))| {
                segment_box_intersection(&start, &end, lower, upper).is_some()
            })
            .filter_map(|(id, _)| {
                let corners = self.tets[id].map(|v| self.vertices[v]);
                segment_tet_interval(&start, &end, &corners)
                    .map(|(t0, t1)| (id as ElementId, t0, t1))
            })
            .collect();

        let mut crossings: Vec<f64> = intervals.iter().flat_map(|(_, t0, t1)| [*t0, *t1]).collect();
        crossings.sort_by(|a, b| a.total_cmp(b));
        crossings.dedup();

        let mut lengths = Vec::new();
        for pair in crossings.windows(2) {
            let sub_length = (pair[1] - pair[0]) * length;
            if sub_length <= GEOMETRIC_TOLERANCE {
                continue;
            }

            // intervals are in id order, so the first match is the lowest id
            let owner = intervals
                .iter()
                .find(|(_, t0, t1)| *t0 <= pair[0] && pair[1] <= *t1);
            if let Some((id, _, _)) = owner {
                accumulate_length(&mut lengths, *id, sub_length);
            }
        }

        trace!("Segment crossed {} tet elements", lengths.len());
        lengths
    }
}

/// Volume of a tetrahedron from its corner coordinates
///
/// ```rust
/// # use ntally_geometry::tet_volume;
/// let corners = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 1.0]];
/// assert!((tet_volume(&corners) - 1.0).abs() < 1e-15);
/// ```
pub fn tet_volume(corners: &[[f64; 3]; 4]) -> f64 {
    edge_matrix(corners).determinant().abs() / 6.0
}

fn edge_matrix(corners: &[[f64; 3]; 4]) -> Matrix3<f64> {
    let origin = Vector3::from(corners[0]);
    Matrix3::from_columns(&[
        Vector3::from(corners[1]) - origin,
        Vector3::from(corners[2]) - origin,
        Vector3::from(corners[3]) - origin,
    ])
}

/// Barycentric coordinates of a point, `None` for degenerate elements
fn barycentric(corners: &[[f64; 3]; 4], point: &[f64; 3]) -> Option<[f64; 4]> {
    let inverse = edge_matrix(corners).try_inverse()?;
    let local = inverse * (Vector3::from(*point) - Vector3::from(corners[0]));
    Some([1.0 - local.sum(), local[0], local[1], local[2]])
}

fn bounding_box(corners: &[[f64; 3]; 4]) -> ([f64; 3], [f64; 3]) {
    let mut lower = corners[0];
    let mut upper = corners[0];
    for corner in &corners[1..] {
        for i in 0..3 {
            lower[i] = lower[i].min(corner[i]);
            upper[i] = upper[i].max(corner[i]);
        }
    }
    (lower, upper)
}

/// Vertices and connectivity used to validate deserialised meshes
#[derive(Serialize, Deserialize)]
struct TetConnectivity {
    vertices: Vec<[f64; 3]>,
    tets: Vec<[usize; 4]>,
}

impl TryFrom<TetConnectivity> for TetMesh {
    type Error = Error;

    fn try_from(raw: TetConnectivity) -> Result<Self> {
        Self::new(raw.vertices, raw.tets)
    }
}

impl From<TetMesh> for TetConnectivity {
    fn from(mesh: TetMesh) -> Self {
        Self {
            vertices: mesh.vertices,
            tets: mesh.tets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    /// Unit cube split into six tetrahedra around the main diagonal
    #[fixture]
    fn cube() -> TetMesh {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
        ];
        let tets = vec![
            [0, 1, 3, 7],
            [0, 3, 2, 7],
            [0, 2, 6, 7],
            [0, 6, 4, 7],
            [0, 4, 5, 7],
            [0, 5, 1, 7],
        ];
        TetMesh::new(vertices, tets).unwrap()
    }

    #[rstest]
    fn cube_volumes(cube: TetMesh) {
        let total: f64 = cube.element_ids().map(|id| cube.volume(id).unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-12);
        for id in cube.element_ids() {
            assert!((cube.volume(id).unwrap() - 1.0 / 6.0).abs() < 1e-12);
        }
        assert!(cube.volume(6).is_err());
    }

    #[rstest]
    fn construction_errors() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(matches!(
            TetMesh::new(vertices.clone(), vec![[0, 1, 2, 3]]),
            Err(Error::VertexOutOfRange { vertex: 3, .. })
        ));

        // flat element
        let mut flat = vertices;
        flat.push([1.0, 1.0, 0.0]);
        assert!(matches!(
            TetMesh::new(flat, vec![[0, 1, 2, 3]]),
            Err(Error::DegenerateElement(0))
        ));
    }

    #[rstest]
    fn point_location(cube: TetMesh) {
        // every interior point is in exactly one element
        let point = [0.7, 0.2, 0.1];
        let id = cube.element_containing(point).unwrap();
        let corners = cube.corners(id).unwrap();
        assert!(barycentric(&corners, &point)
            .unwrap()
            .iter()
            .all(|c| *c >= 0.0));

        assert_eq!(cube.element_containing([1.5, 0.5, 0.5]), None);
    }

    #[rstest]
    #[case([0.3, 0.6, -1.0], [0.3, 0.6, 2.0], 1.0)]
    #[case([0.2, 0.3, 0.1], [0.9, 0.8, 0.6], 0.99498743710662)]
    #[case([-1.0, 0.2, 0.4], [2.0, 0.2, 0.4], 1.0)]
    fn cube_track_lengths(
        cube: TetMesh,
        #[case] start: [f64; 3],
        #[case] end: [f64; 3],
        #[case] expected: f64,
    ) {
        let lengths = cube.track_lengths(start, end);
        let total: f64 = lengths.iter().map(|(_, l)| l).sum();
        assert!((total - expected).abs() < 1e-9);

        let mut ids: Vec<u64> = lengths.iter().map(|(id, _)| *id).collect();
        ids.dedup();
        assert_eq!(ids.len(), lengths.len());
    }

    #[rstest]
    fn outside_track(cube: TetMesh) {
        assert!(cube.track_lengths([2.0, 2.0, 2.0], [3.0, 3.0, 3.0]).is_empty());
    }
}
