use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "vivify",
    author,
    version,
    about = "Real-time video enhancement overlay preview",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Preset to start with (e.g. `off`, `light`, `medium`, `strong`, or a
    /// name from the preset library).
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Debanding intensity override in [0, 1]; wins over the preset.
    #[arg(long, value_name = "INTENSITY")]
    pub debanding: Option<f32>,

    /// Smoothing intensity override in [0, 1]; wins over the preset.
    #[arg(long, value_name = "INTENSITY")]
    pub smoothing: Option<f32>,

    /// Sharpening intensity override in [0, 1]; wins over the preset.
    #[arg(long, value_name = "INTENSITY")]
    pub sharpening: Option<f32>,

    /// Use a still image as the frame source instead of the banded test
    /// pattern.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Override the window size (e.g. `1280x720`); defaults to the source's
    /// intrinsic size.
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Preset library TOML; defaults to `presets.toml` in the user config
    /// directory when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the resolved preset library as JSON and exit.
    #[arg(long)]
    pub list_presets: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_size_specs() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 640 X 360 ").unwrap(), (640, 360));
        assert_eq!(parse_surface_size("1920×1080").unwrap(), (1920, 1080));
    }

    #[test]
    fn rejects_malformed_size_specs() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("axb").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }
}
