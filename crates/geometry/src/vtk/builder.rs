// internal modules
use crate::vtk::MeshToVtk;

// external crates
use vtkio::model::ByteOrder;

/// Builder implementation for MeshToVtk configuration
///
/// The fields of [MeshToVtk] are left public for direct use but the module also
/// implements a builder.
///
/// To get the final [MeshToVtk] from the builder, call
/// [build()](MeshToVtkBuilder::build).
///
/// ```rust
/// # use ntally_geometry::vtk::{ByteOrder, MeshToVtk};
/// let converter = MeshToVtk::builder()
///     .title("Neutron flux")
///     .include_errors(true)
///     .byte_order(ByteOrder::LittleEndian)
///     .build();
///
/// assert!(converter.include_errors);
/// ```
#[derive(Debug)]
pub struct MeshToVtkBuilder {
    /// Title written to the file header
    title: String,
    /// Include relative error arrays in output files
    include_errors: bool,
    /// Byte ordering as big or little endian
    byte_order: ByteOrder,
}

impl MeshToVtkBuilder {
    /// Create a new instance of the builder with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the [MeshToVtk] type
    pub fn build(self) -> MeshToVtk {
        MeshToVtk {
            title: self.title,
            include_errors: self.include_errors,
            byte_order: self.byte_order,
        }
    }

    /// Title written to the file header
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Include relative error arrays in output files
    ///
    /// Errors are omitted by default to save space. If enabled, every array
    /// with errors attached gets a corresponding "<name>, error" array.
    pub fn include_errors(mut self, include: bool) -> Self {
        self.include_errors = include;
        self
    }

    /// Set the byte ordering
    ///
    /// Note that Visit only reads big endian, even though most systems are
    /// little endian. Defaults to big endian for convenience.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }
}

impl Default for MeshToVtkBuilder {
    fn default() -> Self {
        Self {
            title: "Mesh estimator results".to_string(),
            include_errors: false,
            byte_order: ByteOrder::BigEndian,
        }
    }
}
