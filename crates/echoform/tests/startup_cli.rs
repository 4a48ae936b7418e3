use std::fs;
use std::path::Path;
use std::process::Command;

use renderer::{RendererConfig, ShaderSet, BUFFER_A_FILE, BUFFER_B_FILE, IMAGE_FILE};
use tempfile::TempDir;

fn create_shader_dir(root: &Path) {
    fs::write(
        root.join(BUFFER_A_FILE),
        "void mainImage(out vec4 c, in vec2 f) { c = texture(iChannel0, f / iResolution.xy); }",
    )
    .unwrap();
    fs::write(
        root.join(BUFFER_B_FILE),
        "void mainImage(out vec4 c, in vec2 f) { c = texture(iChannel1, f / iResolution.xy); }",
    )
    .unwrap();
    fs::write(
        root.join(IMAGE_FILE),
        "void mainImage(out vec4 c, in vec2 f) { c = vec4(1.0); }",
    )
    .unwrap();
}

#[test]
fn discovers_shader_set_and_assembles_config() {
    let root = TempDir::new().unwrap();
    create_shader_dir(root.path());

    let set = ShaderSet::discover(root.path()).expect("complete shader directory");
    assert_eq!(set.buffer_a, root.path().join(BUFFER_A_FILE));
    assert_eq!(set.buffer_b, root.path().join(BUFFER_B_FILE));
    assert_eq!(set.image, root.path().join(IMAGE_FILE));

    let sources = set.load().expect("readable sources");
    assert!(sources.buffer_a.contains("mainImage"));
    assert!(sources.image.contains("mainImage"));

    let config = RendererConfig::new(set);
    assert_eq!(config.surface_size, (1280, 720));
    assert_eq!(config.render_scale, 2.0);
    assert!(config.target_fps.is_none());
}

#[test]
fn startup_fails_on_missing_shader_directory() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("does-not-exist");

    let output = Command::new(env!("CARGO_BIN_EXE_echoform"))
        .arg(&missing)
        .output()
        .expect("failed to run echoform");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("shader"), "stderr was: {stderr}");
}

#[test]
fn startup_fails_on_incomplete_shader_set() {
    let root = TempDir::new().unwrap();
    create_shader_dir(root.path());
    fs::remove_file(root.path().join(IMAGE_FILE)).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_echoform"))
        .arg(root.path())
        .status()
        .expect("failed to run echoform");

    assert!(!status.success());
}

#[test]
fn startup_rejects_degenerate_size_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    create_shader_dir(root.path());

    let output = Command::new(env!("CARGO_BIN_EXE_echoform"))
        .arg(root.path())
        .args(["--size", "0x720"])
        .output()
        .expect("failed to run echoform");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dimensions"), "stderr was: {stderr}");
}
