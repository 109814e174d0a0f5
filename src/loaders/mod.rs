//! Format capabilities that turn file bytes into a renderable scene node.

pub mod fbx;
pub mod gltf;
pub mod obj;
pub mod stl;

pub use fbx::load_fbx;
pub use gltf::load_gltf;
pub use obj::load_obj;
pub use stl::load_stl;

use anyhow::Result;

use crate::formats::MeshFormat;
use crate::scene::{Material, SceneNode, DEFAULT_MESH_COLOR};

/// Load a scene from raw file bytes using the resolved format capability.
///
/// Post-processing per format family:
/// - STL yields bare geometry, wrapped in a single mesh leaf colored with
///   the accent color or the default grey.
/// - glTF/GLB yield a container whose renderable root is one level inside;
///   the container is unwrapped here.
/// - OBJ and FBX scenes are used as returned.
/// For every family except STL, a supplied accent color is re-applied to
/// each mesh leaf by material replacement; with no accent set, the loaded
/// materials stand.
pub async fn load_scene(
    data: &[u8],
    format: MeshFormat,
    accent: Option<[f32; 3]>,
) -> Result<SceneNode> {
    let mut root = match format {
        MeshFormat::Stl => {
            let material = Material::new(accent.unwrap_or(DEFAULT_MESH_COLOR));
            let mesh = load_stl(data)?.with_material(material);
            SceneNode::leaf("stl", mesh)
        }
        MeshFormat::Obj => load_obj(data)?,
        MeshFormat::Fbx => load_fbx(data)?,
        MeshFormat::Gltf | MeshFormat::Glb => unwrap_container(load_gltf(data)?),
    };

    if !format.is_bare_geometry() {
        if let Some(color) = accent {
            root.apply_color(color);
        }
    }

    log::info!(
        "loaded {} scene: {} mesh leaves",
        format,
        root.mesh_count()
    );
    Ok(root)
}

/// Pull the renderable root out of a one-level container node.
fn unwrap_container(mut container: SceneNode) -> SceneNode {
    if container.mesh.is_none() && container.children.len() == 1 {
        container.children.remove(0)
    } else {
        container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use super::stl::binary_stl_fixture;

    fn block_on<T>(future: impl std::future::Future<Output = T>) -> T {
        pollster::block_on(future)
    }

    fn cube_stl() -> Vec<u8> {
        // Two triangles are enough to span the (-1,-1,-1)..(1,1,1) box
        binary_stl_fixture(&[
            [
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
            ],
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
        ])
    }

    #[test]
    fn test_stl_gets_default_grey_without_accent() {
        let root = block_on(load_scene(&cube_stl(), MeshFormat::Stl, None)).unwrap();
        let mesh = root.mesh.as_ref().unwrap();
        assert_eq!(mesh.material.base_color, DEFAULT_MESH_COLOR);
    }

    #[test]
    fn test_stl_accent_overrides_grey() {
        let accent = Some([0.1, 0.2, 0.3]);
        let root = block_on(load_scene(&cube_stl(), MeshFormat::Stl, accent)).unwrap();
        assert_eq!(root.mesh.as_ref().unwrap().material.base_color, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_obj_keeps_loaded_materials_without_accent() {
        let obj = b"o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let root = block_on(load_scene(obj, MeshFormat::Obj, None)).unwrap();
        let mesh = root.children[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.material, Material::default());
    }

    #[test]
    fn test_obj_accent_recolors_every_leaf() {
        let obj = b"o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n";
        let root =
            block_on(load_scene(obj, MeshFormat::Obj, Some([0.9, 0.8, 0.7]))).unwrap();
        let mut leaves = 0;
        root.visit(&mut |node, _| {
            if let Some(mesh) = &node.mesh {
                assert_eq!(mesh.material.base_color, [0.9, 0.8, 0.7]);
                leaves += 1;
            }
        });
        assert_eq!(leaves, 2);
    }

    #[test]
    fn test_load_failure_propagates() {
        let result = block_on(load_scene(b"garbage", MeshFormat::Stl, None));
        assert!(result.is_err());
    }
}
