//! Supported mesh file formats and extension resolution.

use std::fmt;

/// The closed set of file formats the preview can load.
///
/// Resolution is a tagged-variant dispatch rather than a runtime lookup
/// table, so a new format cannot be added without the compiler pointing at
/// every match that must learn about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Stereolithography, binary or ASCII
    Stl,
    /// Wavefront OBJ
    Obj,
    /// Autodesk FBX (binary)
    Fbx,
    /// glTF 2.0 text
    Gltf,
    /// glTF 2.0 binary
    Glb,
}

/// Every supported format, in resolution order.
pub const SUPPORTED_FORMATS: [MeshFormat; 5] = [
    MeshFormat::Stl,
    MeshFormat::Obj,
    MeshFormat::Fbx,
    MeshFormat::Gltf,
    MeshFormat::Glb,
];

impl MeshFormat {
    /// Resolve a file extension, case-insensitively. `None` means the
    /// extension is outside the supported set and nothing may be loaded.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "fbx" => Some(Self::Fbx),
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }

    /// Resolve from a file name, using everything after the last dot.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Fbx => "fbx",
            Self::Gltf => "gltf",
            Self::Glb => "glb",
        }
    }

    /// Formats that wrap the renderable root one level inside a container
    /// node (the glTF document's scene).
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Gltf | Self::Glb)
    }

    /// Formats that yield bare geometry with no material of their own.
    pub fn is_bare_geometry(&self) -> bool {
        matches!(self, Self::Stl)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
