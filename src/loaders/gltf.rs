use anyhow::{bail, Context, Result};
use glam::{Quat, Vec3};

use crate::scene::{Material, Mesh, SceneNode};

/// Parses glTF (text with embedded buffers, or binary GLB) into a container
/// node. The renderable root — the document's default scene — sits one level
/// inside the returned container, mirroring how the format itself nests
/// content; the dispatch layer unwraps it.
pub fn load_gltf(data: &[u8]) -> Result<SceneNode> {
    let (document, buffers, _images) =
        gltf::import_slice(data).context("failed to parse glTF")?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF file has no scene")?;

    let mut scene_root = SceneNode::group(scene.name().unwrap_or("scene"));
    for node in scene.nodes() {
        scene_root.add_child(build_node(&node, &buffers));
    }

    if scene_root.mesh_count() == 0 {
        bail!("glTF scene contains no mesh geometry");
    }

    let mut container = SceneNode::group("gltf");
    container.add_child(scene_root);
    Ok(container)
}

fn build_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let mut out = SceneNode::group(node.name().unwrap_or("node"));

    let (translation, rotation, scale) = node.transform().decomposed();
    out.transform.translation = Vec3::from_array(translation);
    out.transform.rotation = Quat::from_array(rotation);
    out.transform.scale = Vec3::from_array(scale);

    if let Some(mesh) = node.mesh() {
        for (index, primitive) in mesh.primitives().enumerate() {
            match build_primitive(&primitive, buffers) {
                Some(built) => {
                    let name = format!("{}/{}", mesh.name().unwrap_or("mesh"), index);
                    out.add_child(SceneNode::leaf(name, built));
                }
                None => log::warn!(
                    "skipping glTF primitive {} of {:?} with no positions",
                    index,
                    mesh.name()
                ),
            }
        }
    }

    for child in node.children() {
        out.add_child(build_node(&child, buffers));
    }

    out
}

fn build_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from_array).collect();
    if positions.is_empty() {
        return None;
    }

    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from_array).collect())
        .unwrap_or_default();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(raw) => raw.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    let mut mesh = Mesh::new(positions, normals, indices)
        .with_material(Material::new([base_color[0], base_color[1], base_color[2]]));
    if mesh.normals.len() != mesh.positions.len() {
        mesh.compute_vertex_normals();
    }
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal single-triangle glTF with an embedded base64 buffer:
    // positions (0,0,0) (1,0,0) (0,1,0), indices 0 1 2.
    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0, "translation": [2.0, 0.0, 0.0]}],
        "meshes": [{"primitives": [{
            "attributes": {"POSITION": 0},
            "indices": 1
        }]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6}
        ],
        "buffers": [{
            "byteLength": 42,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIA"
        }]
    }"#;

    #[test]
    fn test_renderable_root_is_one_level_inside() {
        let container = load_gltf(TRIANGLE_GLTF.as_bytes()).unwrap();
        assert!(container.mesh.is_none());
        assert_eq!(container.children.len(), 1);

        let scene_root = &container.children[0];
        assert_eq!(scene_root.mesh_count(), 1);
    }

    #[test]
    fn test_node_transform_applied() {
        let container = load_gltf(TRIANGLE_GLTF.as_bytes()).unwrap();
        let bounds = container.bounds();
        // Triangle spans x in [0,1], translated +2
        assert!((bounds.min.x - 2.0).abs() < 1e-6);
        assert!((bounds.max.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let container = load_gltf(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mut normal_count = 0;
        container.visit(&mut |node, _| {
            if let Some(mesh) = &node.mesh {
                assert_eq!(mesh.normals.len(), mesh.positions.len());
                normal_count += mesh.normals.len();
            }
        });
        assert_eq!(normal_count, 3);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(load_gltf(b"{\"asset\": bogus").is_err());
    }
}
