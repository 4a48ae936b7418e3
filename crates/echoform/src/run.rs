use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig, ShaderSet};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const MIN_SCALE: f32 = 0.25;
const MAX_SCALE: f32 = 8.0;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let shader_set = ShaderSet::discover(&cli.shader_dir).with_context(|| {
        format!(
            "failed to load shader set from {}",
            cli.shader_dir.display()
        )
    })?;

    let mut config = RendererConfig::new(shader_set);

    if let Some(spec) = cli.size.as_deref() {
        config.surface_size = parse_surface_size(spec)?;
    }

    config.render_scale = clamp_scale(cli.scale);
    config.target_fps = cli.fps.filter(|fps| *fps > 0.0);
    config.window_title = cli.title;

    tracing::info!(
        shader_dir = %cli.shader_dir.display(),
        size = ?config.surface_size,
        scale = config.render_scale,
        "starting feedback renderer"
    );

    Renderer::new(config).run()
}

fn clamp_scale(scale: f32) -> f32 {
    if !scale.is_finite() || scale < MIN_SCALE || scale > MAX_SCALE {
        let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
        let clamped = if clamped.is_finite() { clamped } else { 2.0 };
        tracing::warn!(requested = scale, using = clamped, "render scale out of range");
        return clamped;
    }
    scale
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
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
    fn parses_size_spec() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 1920 X 1080 ").unwrap(), (1920, 1080));
    }

    #[test]
    fn rejects_malformed_size_spec() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("axb").is_err());
    }

    #[test]
    fn out_of_range_scale_is_clamped() {
        assert_eq!(clamp_scale(2.0), 2.0);
        assert_eq!(clamp_scale(0.0), MIN_SCALE);
        assert_eq!(clamp_scale(100.0), MAX_SCALE);
        assert_eq!(clamp_scale(f32::NAN), 2.0);
    }
}
