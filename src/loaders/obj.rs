use std::io::{BufReader, Cursor};

use anyhow::{bail, Context, Result};
use glam::Vec3;

use crate::scene::{Mesh, SceneNode};

/// Parses Wavefront OBJ bytes into a scene node with one mesh leaf per
/// object group.
///
/// Material libraries are side files the upload form never provides, so the
/// MTL loader is a stub and every mesh starts with the default material; the
/// caller recolors by traversal when an accent color is set.
pub fn load_obj(data: &[u8]) -> Result<SceneNode> {
    let mut reader = BufReader::new(Cursor::new(data));
    let load_options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options, |_path| {
        Ok((Vec::new(), std::collections::HashMap::new()))
    })
    .context("failed to parse OBJ")?;

    if models.is_empty() {
        bail!("OBJ file contains no objects");
    }

    let mut root = SceneNode::group("obj");
    for model in models {
        let positions: Vec<Vec3> = model
            .mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();
        if positions.is_empty() {
            log::warn!("skipping OBJ object {:?} with no vertices", model.name);
            continue;
        }

        let normals: Vec<Vec3> = model
            .mesh
            .normals
            .chunks_exact(3)
            .map(|n| Vec3::new(n[0], n[1], n[2]))
            .collect();

        let mut mesh = Mesh::new(positions, normals, model.mesh.indices);
        if mesh.normals.len() != mesh.positions.len() {
            mesh.compute_vertex_normals();
        }
        root.add_child(SceneNode::leaf(model.name, mesh));
    }

    if root.mesh_count() == 0 {
        bail!("OBJ file contains no geometry");
    }
    Ok(root)
}
