use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

/// Every pass can read up to three input texture channels (`iChannel0-2`).
pub const CHANNEL_COUNT: usize = 3;

/// File names the renderer expects inside a shader directory.
pub const BUFFER_A_FILE: &str = "bufferA.glsl";
pub const BUFFER_B_FILE: &str = "bufferB.glsl";
pub const IMAGE_FILE: &str = "image.glsl";

/// Paths to the three fragment programs that make up an artwork.
///
/// `BufferA` drives the primary feedback field, `BufferB` is shared by the
/// three derived feedback channels, and `Image` composites the result.
#[derive(Clone, Debug)]
pub struct ShaderSet {
    pub buffer_a: PathBuf,
    pub buffer_b: PathBuf,
    pub image: PathBuf,
}

impl ShaderSet {
    /// Locates the three shader files inside `dir`.
    ///
    /// Fails if any of them is missing; the pipeline never starts with a
    /// partial shader set.
    pub fn discover(dir: &Path) -> Result<Self> {
        let set = Self {
            buffer_a: dir.join(BUFFER_A_FILE),
            buffer_b: dir.join(BUFFER_B_FILE),
            image: dir.join(IMAGE_FILE),
        };
        for path in [&set.buffer_a, &set.buffer_b, &set.image] {
            if !path.is_file() {
                anyhow::bail!(
                    "shader file {} not found in {}",
                    path.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
                    dir.display()
                );
            }
        }
        Ok(set)
    }

    /// Reads all three sources up front.
    pub fn load(&self) -> Result<ShaderSources> {
        let read = |path: &Path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read shader at {}", path.display()))
        };
        Ok(ShaderSources {
            buffer_a: read(&self.buffer_a)?,
            buffer_b: read(&self.buffer_b)?,
            image: read(&self.image)?,
        })
    }
}

/// Fragment program sources loaded before the GPU state is built.
#[derive(Clone, Debug)]
pub struct ShaderSources {
    pub buffer_a: String,
    pub buffer_b: String,
    pub image: String,
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the CLI flags: which shader set to run, how large the window
/// should open, and how the offscreen targets relate to the surface.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Multiplier from surface size to offscreen target size.
    pub render_scale: f32,
    /// Optional FPS cap; None renders on every vsync callback.
    pub target_fps: Option<f32>,
    /// The three fragment programs to run.
    pub shader_set: ShaderSet,
    /// Window title for the preview surface.
    pub window_title: String,
}

impl RendererConfig {
    /// Builds a 720p configuration at the default 2x feedback resolution.
    pub fn new(shader_set: ShaderSet) -> Self {
        Self {
            surface_size: (1280, 720),
            render_scale: 2.0,
            target_fps: None,
            shader_set,
            window_title: "Echoform".to_string(),
        }
    }
}

/// Offscreen target size for a given surface size and resolution scale.
///
/// Rounded to the nearest pixel and clamped to at least 1x1 so resize events
/// with a collapsed window never allocate a zero-sized texture.
pub fn scaled_size(surface: PhysicalSize<u32>, scale: f32) -> PhysicalSize<u32> {
    let width = (surface.width as f32 * scale).round().max(1.0) as u32;
    let height = (surface.height as f32 * scale).round().max(1.0) as u32;
    PhysicalSize::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scaled_size_doubles_viewport() {
        let size = scaled_size(PhysicalSize::new(800, 600), 2.0);
        assert_eq!(size, PhysicalSize::new(1600, 1200));
    }

    #[test]
    fn scaled_size_never_collapses_to_zero() {
        let size = scaled_size(PhysicalSize::new(1, 1), 0.25);
        assert_eq!(size, PhysicalSize::new(1, 1));
    }

    #[test]
    fn discover_requires_all_three_programs() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(BUFFER_A_FILE), "void mainImage() {}").unwrap();
        fs::write(dir.path().join(BUFFER_B_FILE), "void mainImage() {}").unwrap();
        assert!(ShaderSet::discover(dir.path()).is_err());

        fs::write(dir.path().join(IMAGE_FILE), "void mainImage() {}").unwrap();
        let set = ShaderSet::discover(dir.path()).expect("complete set");
        let sources = set.load().expect("readable sources");
        assert!(sources.image.contains("mainImage"));
    }
}
