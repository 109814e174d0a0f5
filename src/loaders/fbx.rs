use anyhow::{bail, Result};
use glam::Vec3;

use crate::scene::{Mesh, SceneNode};

const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary";

/// Extracts triangle geometry from binary FBX.
///
/// FBX is a closed container format; full scene fidelity needs the official
/// SDK. For preview purposes the geometry alone is enough: each `Geometry`
/// node stores a `Vertices` double array and a `PolygonVertexIndex` int
/// array, where a negative index (stored as `!index`) terminates a polygon.
/// Compressed property arrays are an unsupported sub-feature and surface as
/// a load error.
pub fn load_fbx(data: &[u8]) -> Result<SceneNode> {
    if !data.starts_with(BINARY_MAGIC) {
        bail!("only binary FBX is supported (ASCII FBX header not found)");
    }

    let mut root = SceneNode::group("fbx");
    let mut cursor = BINARY_MAGIC.len();

    while let Some(vertices_at) = find_property(data, cursor, b"Vertices") {
        let Some((vertices, after_vertices)) = parse_f64_array(data, vertices_at) else {
            bail!("FBX vertex array is compressed or malformed (unsupported)");
        };
        let Some(indices_at) = find_property(data, after_vertices, b"PolygonVertexIndex") else {
            break;
        };
        let Some((raw_indices, after_indices)) = parse_i32_array(data, indices_at) else {
            bail!("FBX index array is compressed or malformed (unsupported)");
        };

        let positions: Vec<Vec3> = vertices
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .collect();
        let indices = triangulate_polygons(&raw_indices, positions.len());

        if !positions.is_empty() && !indices.is_empty() {
            let mut mesh = Mesh::new(positions, Vec::new(), indices);
            mesh.compute_vertex_normals();
            let name = format!("geometry-{}", root.children.len());
            root.add_child(SceneNode::leaf(name, mesh));
        }

        cursor = after_indices;
    }

    if root.mesh_count() == 0 {
        bail!("no geometry found in FBX file");
    }
    Ok(root)
}

/// Position just past the next occurrence of a property name.
fn find_property(data: &[u8], from: usize, name: &[u8]) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(name.len())
        .position(|w| w == name)
        .map(|p| from + p + name.len())
}

/// Parse an uncompressed FBX double array (`d` type tag, count, encoding,
/// byte length, payload). Returns the values and the offset past them.
fn parse_f64_array(data: &[u8], at: usize) -> Option<(Vec<f64>, usize)> {
    let (count, payload) = array_header(data, at, b'd')?;
    let end = payload + count * 8;
    if end > data.len() {
        return None;
    }
    let values = data[payload..end]
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect();
    Some((values, end))
}

/// Parse an uncompressed FBX int array (`i` type tag).
fn parse_i32_array(data: &[u8], at: usize) -> Option<(Vec<i32>, usize)> {
    let (count, payload) = array_header(data, at, b'i')?;
    let end = payload + count * 4;
    if end > data.len() {
        return None;
    }
    let values = data[payload..end]
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    Some((values, end))
}

/// Validate an array property header at `at`: type tag, element count,
/// encoding (0 = raw, 1 = zlib). Returns (count, payload offset) for raw
/// arrays only.
fn array_header(data: &[u8], at: usize, type_tag: u8) -> Option<(usize, usize)> {
    if at + 13 > data.len() || data[at] != type_tag {
        return None;
    }
    let field = |o: usize| u32::from_le_bytes(data[o..o + 4].try_into().unwrap());
    let count = field(at + 1) as usize;
    let encoding = field(at + 5);
    if encoding != 0 || count == 0 || count > 50_000_000 {
        return None;
    }
    Some((count, at + 13))
}

/// Fan-triangulate FBX polygons. The last index of each polygon is stored
/// bitwise-negated; indices outside the vertex range drop the polygon.
fn triangulate_polygons(raw: &[i32], vertex_count: usize) -> Vec<u32> {
    let mut indices = Vec::new();
    let mut polygon: Vec<u32> = Vec::new();

    for &value in raw {
        let (index, terminal) = if value < 0 {
            ((!value) as u32, true)
        } else {
            (value as u32, false)
        };
        polygon.push(index);

        if terminal {
            let in_range = polygon.iter().all(|&i| (i as usize) < vertex_count);
            if in_range && polygon.len() >= 3 {
                for i in 1..polygon.len() - 1 {
                    indices.push(polygon[0]);
                    indices.push(polygon[i]);
                    indices.push(polygon[i + 1]);
                }
            }
            polygon.clear();
        }
    }

    indices
}
