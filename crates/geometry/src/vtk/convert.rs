// standard library
use std::ops::RangeInclusive;

// crate modules
use crate::vtk::MeshToVtkBuilder;
use crate::{Mesh, StructuredHexMesh, TetMesh};

// external crates
use log::warn;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, Coordinates, DataArray, DataSet,
    ElementType, Extent, IOBuffer, RangeExtent, RectilinearGridPiece, UnstructuredGridPiece,
    Version, VertexNumbers, Vtk,
};

/// A named array of per-element values with optional relative errors
///
/// Values are expected in element id order, one per mesh element.
#[derive(Debug, Clone, PartialEq)]
pub struct CellData {
    /// Name of the array in the VTK file
    pub name: String,
    /// One value per element
    pub values: Vec<f64>,
    /// Optional relative errors, one per element
    pub errors: Option<Vec<f64>>,
}

impl CellData {
    /// New array of values without errors
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            values,
            errors: None,
        }
    }

    /// Attach relative errors to the array
    pub fn with_errors(mut self, errors: Vec<f64>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Convert per-element mesh results to vtk formats for plotting
///
/// The fields remain public for direct use, but for convenience and style
/// preference a builder pattern is also implemented and recommended.
///
/// Most useful is the byte ordering, which is important for binary file
/// compatability with plotting software. ParaView does not care, but something
/// like Visit only likes big endian. This is the default for convenience.
///
/// ```rust
/// # use ntally_geometry::vtk::{CellData, MeshToVtk};
/// # use ntally_geometry::{Mesh, TetMesh};
/// let mesh = Mesh::Tet(TetMesh::new(
///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
///     vec![[0, 1, 2, 3]],
/// ).unwrap());
///
/// let vtk = MeshToVtk::new().convert(&mesh, &[CellData::new("flux", vec![1.0])]);
/// assert_eq!(vtk.title, "Mesh estimator results");
/// ```
#[derive(Debug, PartialEq)]
pub struct MeshToVtk {
    /// Title written to the file header
    pub title: String,
    /// Include relative error arrays in output files
    pub include_errors: bool,
    /// Byte ordering as big or little endian
    pub byte_order: ByteOrder,
}

// Public API
impl MeshToVtk {
    /// Start with the default configuration
    pub fn new() -> MeshToVtk {
        Default::default()
    }

    /// Get an instance of the [MeshToVtkBuilder]
    pub fn builder() -> MeshToVtkBuilder {
        MeshToVtkBuilder::default()
    }

    /// Convert a [Mesh] and its element data to a vtkio::Vtk object
    ///
    /// Arrays with the wrong number of values are skipped with a warning
    /// rather than producing a file that plotting tools refuse to open.
    pub fn convert(&self, mesh: &Mesh, data: &[CellData]) -> Vtk {
        let attributes = self.collect_attributes(mesh.number_of_elements(), data);

        let data = match mesh {
            Mesh::Hex(hex) => Self::rectilinear_grid(hex, attributes),
            Mesh::Tet(tet) => Self::unstructured_grid(tet, attributes),
        };

        Vtk {
            version: Version::Auto,
            title: self.title.clone(),
            byte_order: self.byte_order,
            file_path: None,
            data,
        }
    }
}

impl Default for MeshToVtk {
    fn default() -> Self {
        MeshToVtkBuilder::default().build()
    }
}

impl MeshToVtk {
    /// Collect the cell data arrays, with errors if requested
    fn collect_attributes(&self, n_elements: usize, data: &[CellData]) -> Attributes {
        let mut attributes = Attributes::new();

        for array in data {
            if array.values.len() != n_elements {
                warn!(
                    "Skipping \"{}\": {} values for {} elements",
                    array.name,
                    array.values.len(),
                    n_elements
                );
                continue;
            }
            attributes
                .cell
                .push(Self::scalar_array(array.name.clone(), &array.values));

            // do the same for the errors if they are to be included
            if let (true, Some(errors)) = (self.include_errors, &array.errors) {
                if errors.len() == n_elements {
                    attributes
                        .cell
                        .push(Self::scalar_array(array.name.clone() + ", error", errors));
                }
            }
        }

        attributes
    }

    fn scalar_array(name: String, values: &[f64]) -> Attribute {
        Attribute::DataArray(DataArray {
            name,
            elem: ElementType::Scalars {
                num_comp: 1,
                lookup_table: None,
            },
            data: IOBuffer::F64(values.to_vec()),
        })
    }

    /// Hex element ids already follow the rectilinear grid cell ordering
    fn rectilinear_grid(mesh: &StructuredHexMesh, attributes: Attributes) -> DataSet {
        let [nx, ny, nz] = mesh.dimensions();
        let range_ext: RangeExtent = [
            RangeInclusive::new(0, nx as i32),
            RangeInclusive::new(0, ny as i32),
            RangeInclusive::new(0, nz as i32),
        ];

        DataSet::inline(RectilinearGridPiece {
            extent: Extent::Ranges(range_ext),
            coords: Coordinates {
                x: IOBuffer::F64(mesh.x_planes().to_vec()),
                y: IOBuffer::F64(mesh.y_planes().to_vec()),
                z: IOBuffer::F64(mesh.z_planes().to_vec()),
            },
            data: attributes,
        })
    }

    /// Tets are written explicitly as vertices and connectivity
    fn unstructured_grid(mesh: &TetMesh, attributes: Attributes) -> DataSet {
        let points: Vec<f64> = mesh.vertices().iter().flatten().copied().collect();

        let connectivity: Vec<u64> = mesh
            .connectivity()
            .iter()
            .flatten()
            .map(|v| *v as u64)
            .collect();

        let offsets: Vec<u64> = (1..=mesh.number_of_elements() as u64)
            .map(|i| 4 * i)
            .collect();

        DataSet::inline(UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::XML {
                    connectivity,
                    offsets,
                },
                types: vec![CellType::Tetra; mesh.number_of_elements()],
            },
            data: attributes,
        })
    }
}
