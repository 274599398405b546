//! Consistency checks between the hex and tet mesh implementations

use ntally_geometry::{Mesh, StructuredHexMesh, TetMesh};
use rstest::{fixture, rstest};

/// A 1x1x2 box as a hex mesh of two cubes
#[fixture]
fn hex() -> Mesh {
    StructuredHexMesh::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0, 2.0])
        .unwrap()
        .into()
}

/// The same 1x1x2 box as two cubes of six tets each
#[fixture]
fn tet() -> Mesh {
    let mut vertices = Vec::new();
    for z in [0.0, 1.0, 2.0] {
        for y in [0.0, 1.0] {
            for x in [0.0, 1.0] {
                vertices.push([x, y, z]);
            }
        }
    }

    let mut tets = Vec::new();
    for layer in 0..2 {
        let o = layer * 4;
        let [v0, v1, v2, v3, v4, v5, v6, v7] = [o, o + 1, o + 2, o + 3, o + 4, o + 5, o + 6, o + 7];
        tets.extend([
            [v0, v1, v3, v7],
            [v0, v3, v2, v7],
            [v0, v2, v6, v7],
            [v0, v6, v4, v7],
            [v0, v4, v5, v7],
            [v0, v5, v1, v7],
        ]);
    }

    TetMesh::new(vertices, tets).unwrap().into()
}

fn total_length(mesh: &Mesh, start: [f64; 3], end: [f64; 3]) -> f64 {
    mesh.track_lengths(start, end).iter().map(|(_, l)| l).sum()
}

#[rstest]
fn same_total_volume(hex: Mesh, tet: Mesh) {
    let volume = |mesh: &Mesh| -> f64 {
        mesh.element_ids()
            .iter()
            .map(|id| mesh.volume(*id).unwrap())
            .sum()
    };

    assert_eq!(hex.number_of_elements(), 2);
    assert_eq!(tet.number_of_elements(), 12);
    assert!((volume(&hex) - 2.0).abs() < 1e-12);
    assert!((volume(&tet) - 2.0).abs() < 1e-12);
}

#[rstest]
#[case([0.3, 0.6, -1.0], [0.3, 0.6, 3.0])]
#[case([0.1, 0.7, 0.2], [0.8, 0.35, 1.9])]
#[case([-0.5, 0.25, 1.6], [1.5, 0.45, 1.2])]
#[case([0.2, 0.4, 0.5], [0.6, 0.3, 0.9])]
fn same_track_length(hex: Mesh, tet: Mesh, #[case] start: [f64; 3], #[case] end: [f64; 3]) {
    let h = total_length(&hex, start, end);
    let t = total_length(&tet, start, end);
    assert!(h > 0.0);
    assert!((h - t).abs() < 1e-9, "hex {h} != tet {t}");
}

#[rstest]
fn element_names(hex: Mesh, tet: Mesh) {
    assert_eq!(hex.element_name(), "hexahedral");
    assert_eq!(tet.element_name(), "tetrahedral");
}

#[rstest]
fn point_location(hex: Mesh, tet: Mesh) {
    assert_eq!(hex.element_containing([0.5, 0.5, 1.5]), Some(1));
    assert!(tet.element_containing([0.5, 0.4, 1.5]).unwrap() >= 6);
    assert_eq!(tet.element_containing([0.5, 0.5, 2.5]), None);
}

/// Unit cube split into six tets around the main diagonal
#[fixture]
fn diagonal_cube() -> TetMesh {
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
// within the x = y plane, which holds faces shared by pairs of tets
#[case([0.5, 0.5, -1.0], [0.5, 0.5, 2.0], 1.0, 2)]
#[case([-1.0, -1.0, 0.5], [2.0, 2.0, 0.5], 2f64.sqrt(), 2)]
// along the diagonal edge shared by every tet
#[case([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 3f64.sqrt(), 1)]
fn shared_faces_are_scored_once(
    diagonal_cube: TetMesh,
    #[case] start: [f64; 3],
    #[case] end: [f64; 3],
    #[case] expected: f64,
    #[case] elements: usize,
) {
    let lengths = diagonal_cube.track_lengths(start, end);
    let total: f64 = lengths.iter().map(|(_, l)| l).sum();
    assert!((total - expected).abs() < 1e-9, "total {total} != {expected}");
    assert_eq!(lengths.len(), elements);
}

#[rstest]
fn track_along_the_face_between_cubes(hex: Mesh, tet: Mesh) {
    let start = [0.2, 0.3, 1.0];
    let end = [0.8, 0.6, 1.0];
    let expected = (0.36f64 + 0.09).sqrt();

    assert!((total_length(&hex, start, end) - expected).abs() < 1e-9);
    assert!((total_length(&tet, start, end) - expected).abs() < 1e-9);
}
