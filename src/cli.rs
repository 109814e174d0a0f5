// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::preview::PreviewConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "mesh-preview")]
#[command(about = "Normalized 3D mesh preview", long_about = None)]
pub struct Cli {
    /// Model file to preview (stl, obj, fbx, gltf, glb)
    pub model: Option<PathBuf>,

    /// JSON file with preview settings (background, accent, grid, axes)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Background color, e.g. "#f0f0f0"
    #[arg(long)]
    pub background: Option<String>,

    /// Accent color applied to the model's materials, e.g. "#4a9eff"
    #[arg(long)]
    pub accent: Option<String>,

    /// Hide the ground grid
    #[arg(long = "no-grid", default_value = "false")]
    pub no_grid: bool,

    /// Hide the axes helper
    #[arg(long = "no-axes", default_value = "false")]
    pub no_axes: bool,
}

impl Cli {
    /// Resolve the preview configuration: config file first, then CLI flags
    /// on top.
    pub fn preview_config(&self) -> Result<PreviewConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {:?}", path))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse config {:?}", path))?
            }
            None => PreviewConfig::default(),
        };

        if let Some(hex) = &self.background {
            config.background = parse_hex_color(hex)?;
        }
        if let Some(hex) = &self.accent {
            config.accent = Some(parse_hex_color(hex)?);
        }
        if self.no_grid {
            config.show_grid = false;
        }
        if self.no_axes {
            config.show_axes = false;
        }

        Ok(config)
    }
}

/// Parse "#rrggbb" (leading '#' optional) into linear-ish [r, g, b] in 0..1.
pub fn parse_hex_color(text: &str) -> Result<[f32; 3]> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 {
        bail!("expected a color like #rrggbb, got {:?}", text);
    }
    let channel = |range: std::ops::Range<usize>| -> Result<f32> {
        let value = u8::from_str_radix(&hex[range], 16)
            .with_context(|| format!("invalid hex color {:?}", text))?;
        Ok(value as f32 / 255.0)
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        let grey = parse_hex_color("#b3b3b3").unwrap();
        assert!((grey[0] - 0.702).abs() < 1e-3);
        assert_eq!(grey[0], grey[1]);
        assert_eq!(grey[1], grey[2]);

        let red = parse_hex_color("ff0000").unwrap();
        assert_eq!(red, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("not-a-color").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli {
            model: None,
            config: None,
            background: Some("#000000".into()),
            accent: Some("#ff0000".into()),
            no_grid: true,
            no_axes: false,
        };
        let config = cli.preview_config().unwrap();
        assert_eq!(config.background, [0.0, 0.0, 0.0]);
        assert_eq!(config.accent, Some([1.0, 0.0, 0.0]));
        assert!(!config.show_grid);
        assert!(config.show_axes);
    }
}
