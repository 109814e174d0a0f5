//! mesh-preview
//!
//! Live, normalized preview of user-supplied 3D mesh files. A file handle
//! goes through format resolution, asynchronous loading and geometry
//! normalization; the resulting scene is centered, scaled to a fixed
//! viewport box and measured in real-world millimeters, while an
//! auto-rotating orbit view pauses for user interaction and pointer state
//! drives cursor feedback.
//!
//! High-level modules
//! - `formats`: the closed set of supported file formats and extension
//!   resolution
//! - `loaders`: per-format capabilities turning bytes into a scene graph
//! - `scene`: the renderer-agnostic scene tree and built-in visuals
//! - `normalize`: bounding-volume centering, scaling and dimensions
//! - `rotation` / `pointer`: the two interaction state machines
//! - `preview`: the orchestrator owning one preview slot end to end
//! - `surface`: the rendering capability contract for the hosting form
//! - `camera` / `renderer` / `cli`: the bundled wgpu viewer

pub mod camera;
pub mod cli;
pub mod error;
pub mod formats;
pub mod handle;
pub mod loaders;
pub mod math;
pub mod normalize;
pub mod pointer;
pub mod preview;
pub mod renderer;
pub mod rotation;
pub mod scene;
pub mod surface;
pub mod timing;

pub use error::PreviewError;
pub use formats::MeshFormat;
pub use normalize::{Dimensions, NormalizedTransform};
pub use preview::{PreviewConfig, PreviewOrchestrator, PreviewPhase};
pub use surface::{RenderSurface, SurfaceEvent};
