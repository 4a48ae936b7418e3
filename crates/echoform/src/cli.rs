use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "echoform",
    author,
    version,
    about = "Runs a multi-pass feedback artwork in a window"
)]
pub struct Cli {
    /// Directory containing bufferA.glsl, bufferB.glsl, and image.glsl.
    #[arg(value_name = "SHADER_DIR", default_value = "shaders")]
    pub shader_dir: PathBuf,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Multiplier from window size to feedback resolution.
    #[arg(long, value_name = "SCALE", default_value_t = 2.0)]
    pub scale: f32,

    /// Optional FPS cap (0 = uncapped, render on every vsync).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Window title.
    #[arg(long, value_name = "TITLE", default_value = "Echoform")]
    pub title: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_shaders_directory_at_double_scale() {
        let cli = Cli::try_parse_from(["echoform"]).expect("parse");
        assert_eq!(cli.shader_dir, PathBuf::from("shaders"));
        assert_eq!(cli.scale, 2.0);
        assert!(cli.size.is_none());
        assert!(cli.fps.is_none());
    }

    #[test]
    fn accepts_explicit_size_and_fps() {
        let cli = Cli::try_parse_from([
            "echoform",
            "art/ink",
            "--size",
            "1920x1080",
            "--scale",
            "1.5",
            "--fps",
            "60",
        ])
        .expect("parse");
        assert_eq!(cli.shader_dir, PathBuf::from("art/ink"));
        assert_eq!(cli.size.as_deref(), Some("1920x1080"));
        assert_eq!(cli.scale, 1.5);
        assert_eq!(cli.fps, Some(60.0));
    }
}
