//! Scene graph produced by the loaders and consumed by the normalizer and
//! the renderer.
//!
//! Nodes are plain data: a local transform, optional mesh geometry, and
//! children. Materials are owned per mesh, so recoloring a scene replaces
//! material values instead of mutating anything shared between instances.

use glam::{Mat4, Quat, Vec3};

use crate::math::Aabb;

/// Grey used for meshes when the caller supplies no accent color (#b3b3b3).
pub const DEFAULT_MESH_COLOR: [f32; 3] = [0.702, 0.702, 0.702];

/// Local translation/rotation/scale of a scene node.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: [f32; 3],
    pub wireframe: bool,
}

impl Material {
    pub fn new(base_color: [f32; 3]) -> Self {
        Self {
            base_color,
            wireframe: false,
        }
    }

    pub fn wireframe(base_color: [f32; 3]) -> Self {
        Self {
            base_color,
            wireframe: true,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(DEFAULT_MESH_COLOR)
    }
}

/// Triangle geometry with per-vertex normals.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals,
            indices,
            material: Material::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Area-weighted smooth normals from triangle windings. Used by loaders
    /// whose format carries no normals of its own.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks(3) {
            if tri.len() < 3 {
                continue;
            }
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }
            let face = (self.positions[i1] - self.positions[i0])
                .cross(self.positions[i2] - self.positions[i0]);
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    pub fn local_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for &p in &self.positions {
            bounds.grow(p);
        }
        bounds
    }

    /// Axis-aligned cuboid centered at the origin.
    pub fn cuboid(size: Vec3, material: Material) -> Self {
        let h = size * 0.5;
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (Vec3::X, [
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(h.x, -h.y, h.z),
            ]),
            (Vec3::NEG_X, [
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, -h.z),
                Vec3::new(-h.x, -h.y, -h.z),
            ]),
            (Vec3::Y, [
                Vec3::new(-h.x, h.y, -h.z),
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(h.x, h.y, -h.z),
            ]),
            (Vec3::NEG_Y, [
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, h.z),
            ]),
            (Vec3::Z, [
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
            ]),
            (Vec3::NEG_Z, [
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(-h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
            ]),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = positions.len() as u32;
            positions.extend_from_slice(&corners);
            normals.extend(std::iter::repeat(normal).take(4));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, normals, indices).with_material(material)
    }

    /// Horizontal square plane centered at the origin, facing +Y.
    pub fn plane(extent: f32, material: Material) -> Self {
        let h = extent * 0.5;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
        ];
        let normals = vec![Vec3::Y; 4];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Self::new(positions, normals, indices).with_material(material)
    }
}

/// A node in the scene tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Empty grouping node.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }

    /// Leaf node carrying geometry.
    pub fn leaf(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            mesh: Some(mesh),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Replace the material of every mesh in the subtree with a fresh one of
    /// the given color.
    pub fn apply_color(&mut self, color: [f32; 3]) {
        if let Some(mesh) = &mut self.mesh {
            mesh.material = Material::new(color);
        }
        for child in &mut self.children {
            child.apply_color(color);
        }
    }

    /// World-space bounds of the subtree. Empty when no mesh has geometry.
    pub fn bounds(&self) -> Aabb {
        self.bounds_with(&Mat4::IDENTITY)
    }

    fn bounds_with(&self, parent: &Mat4) -> Aabb {
        let world = *parent * self.transform.matrix();
        let mut bounds = match &self.mesh {
            Some(mesh) => mesh.local_bounds().transformed(&world),
            None => Aabb::empty(),
        };
        for child in &self.children {
            bounds = bounds.union(&child.bounds_with(&world));
        }
        bounds
    }

    /// Number of mesh leaves in the subtree.
    pub fn mesh_count(&self) -> usize {
        self.mesh.iter().count() + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }

    /// Visit every node, depth first, with its accumulated world matrix.
    pub fn visit(&self, f: &mut impl FnMut(&SceneNode, &Mat4)) {
        self.visit_with(&Mat4::IDENTITY, f);
    }

    fn visit_with(&self, parent: &Mat4, f: &mut impl FnMut(&SceneNode, &Mat4)) {
        let world = *parent * self.transform.matrix();
        f(self, &world);
        for child in &self.children {
            child.visit_with(&world, f);
        }
    }
}

/// Visual shown while the loader/normalizer pipeline is in flight: a grey
/// wireframe cube over a light ground plane. The orchestrator spins the cube.
pub fn placeholder_scene() -> SceneNode {
    let mut root = SceneNode::group("loading-placeholder");
    root.add_child(SceneNode::leaf(
        "spinner",
        Mesh::cuboid(Vec3::ONE, Material::wireframe([0.5, 0.5, 0.5])),
    ));
    let mut ground = SceneNode::leaf(
        "ground",
        Mesh::plane(5.0, Material::new([0.878, 0.878, 0.878])),
    );
    ground.transform.translation = Vec3::new(0.0, -1.5, 0.0);
    root.add_child(ground);
    root
}

/// Visual shown after a terminal failure: a red unit cube at the origin.
pub fn fallback_scene() -> SceneNode {
    SceneNode::leaf(
        "error-fallback",
        Mesh::cuboid(Vec3::ONE, Material::new([0.8, 0.1, 0.1])),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_leaf(name: &str) -> SceneNode {
        SceneNode::leaf(name, Mesh::cuboid(Vec3::ONE, Material::default()))
    }

    #[test]
    fn test_cuboid_bounds() {
        let mesh = Mesh::cuboid(Vec3::new(2.0, 4.0, 6.0), Material::default());
        let bounds = mesh.local_bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_empty_group_has_empty_bounds() {
        let root = SceneNode::group("empty");
        assert!(root.bounds().is_empty());
    }

    #[test]
    fn test_bounds_compose_child_transforms() {
        let mut root = SceneNode::group("root");
        let mut child = unit_leaf("child");
        child.transform.translation = Vec3::new(3.0, 0.0, 0.0);
        root.add_child(child);
        root.transform.scale = Vec3::splat(2.0);

        let bounds = root.bounds();
        assert_eq!(bounds.min, Vec3::new(5.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(7.0, 1.0, 1.0));
    }

    #[test]
    fn test_apply_color_replaces_every_material() {
        let mut root = SceneNode::group("root");
        root.add_child(unit_leaf("a"));
        let mut inner = SceneNode::group("inner");
        inner.add_child(unit_leaf("b"));
        root.add_child(inner);

        root.apply_color([0.2, 0.4, 0.6]);

        let mut seen = 0;
        root.visit(&mut |node, _| {
            if let Some(mesh) = &node.mesh {
                assert_eq!(mesh.material.base_color, [0.2, 0.4, 0.6]);
                seen += 1;
            }
        });
        assert_eq!(seen, 2);
        assert_eq!(root.mesh_count(), 2);
    }

    #[test]
    fn test_compute_vertex_normals_flat_quad() {
        let mut mesh = Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            Vec::new(),
            vec![0, 2, 1, 0, 3, 2],
        );
        mesh.compute_vertex_normals();
        assert_eq!(mesh.normals.len(), 4);
        for n in &mesh.normals {
            assert!((n.y - 1.0).abs() < 1e-6, "expected +Y normal, got {:?}", n);
        }
    }

    #[test]
    fn test_placeholder_and_fallback_shapes() {
        let placeholder = placeholder_scene();
        assert_eq!(placeholder.mesh_count(), 2);
        assert!(!placeholder.bounds().is_empty());

        let fallback = fallback_scene();
        assert_eq!(fallback.mesh_count(), 1);
        let bounds = fallback.bounds();
        assert_eq!(bounds.size(), Vec3::ONE);
    }
}
