use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Compiles the fragment shader that blits the composited image to the
/// swapchain.
pub(crate) fn compile_blit_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("present blit fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(BLIT_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Wraps a `mainImage`-style pass program with our prelude and compiles it
/// as Vulkan GLSL through naga.
pub(crate) fn compile_pass_shader(
    device: &wgpu::Device,
    source: &str,
    label: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_pass_fragment(source);
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Produces a self-contained GLSL fragment shader from raw pass code.
///
/// Steps performed:
///
/// 1. Strip `#version` directives and uniform declarations for names we
///    inject ourselves, so pass authors may keep ShaderToy-style headers.
/// 2. Prepend [`HEADER`] which declares the frame uniform block, the three
///    channel texture/sampler pairs, and macro aliases.
/// 3. Append [`FOOTER`] which calls `mainImage` and writes `outColor`.
fn wrap_pass_fragment(source: &str) -> String {
    let mut sanitized = String::new();
    let mut skipped_version = false;
    for line in source.lines() {
        if !skipped_version && line.trim_start().starts_with("#version") {
            skipped_version = true;
            continue;
        }
        let trimmed = line.trim_start();
        let should_skip_uniform = trimmed.starts_with("uniform ")
            && (trimmed.contains("iResolution")
                || trimmed.contains("iTimeDelta")
                || trimmed.contains("iTime")
                || trimmed.contains("iFrame")
                || trimmed.contains("iMouse")
                || trimmed.contains("iChannel0")
                || trimmed.contains("iChannel1")
                || trimmed.contains("iChannel2"));
        if should_skip_uniform {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!("{HEADER}\n#line 1\n{sanitized}{FOOTER}")
}

/// GLSL prologue injected ahead of every pass program.
///
/// The uniform block layout must match `FrameUniforms` in `gpu/uniforms.rs`
/// field for field. `_iResolution.w` mirrors `iTime` so shaders that only
/// declare the resolution vector can still animate.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform FrameParams {
    vec4 _iResolution;
    float _iTime;
    float _iTimeDelta;
    int _iFrame;
    float _padding0;
    vec4 _iMouse;
} ubo;

// Map the conventional names to our UBO fields via macros to avoid clashes.
#define iResolution ubo._iResolution.xyz
#define iTime ubo._iTime
#define iTimeDelta ubo._iTimeDelta
#define iFrame ubo._iFrame
#define iMouse ubo._iMouse

layout(set = 1, binding = 0) uniform texture2D echoform_channel0_texture;
layout(set = 1, binding = 1) uniform sampler echoform_channel0_sampler;
layout(set = 1, binding = 2) uniform texture2D echoform_channel1_texture;
layout(set = 1, binding = 3) uniform sampler echoform_channel1_sampler;
layout(set = 1, binding = 4) uniform texture2D echoform_channel2_texture;
layout(set = 1, binding = 5) uniform sampler echoform_channel2_sampler;

#define iChannel0 sampler2D(echoform_channel0_texture, echoform_channel0_sampler)
#define iChannel1 sampler2D(echoform_channel1_texture, echoform_channel1_sampler)
#define iChannel2 sampler2D(echoform_channel2_texture, echoform_channel2_sampler)
";

/// GLSL epilogue that delegates to `mainImage`.
///
/// Texel row 0 of every offscreen target is presented at the bottom of the
/// window (the pointer uniform uses the same bottom-left convention), so
/// `gl_FragCoord` can be forwarded unchanged.
const FOOTER: &str = r"void main() {
    vec4 color = vec4(0.0);
    mainImage(color, gl_FragCoord.xy);
    outColor = color;
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Samples the composited image straight onto the swapchain.
const BLIT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D echoform_image_texture;
layout(set = 0, binding = 1) uniform sampler echoform_image_sampler;

void main() {
    outColor = texture(sampler2D(echoform_image_texture, echoform_image_sampler), v_uv);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_injected_uniforms() {
        let source = r#"
            #version 300 es
            uniform float iTime;
            uniform vec3 iResolution;
            void mainImage(out vec4 fragColor, in vec2 fragCoord) {
                fragColor = vec4(fragCoord, 0.0, 1.0);
            }
        "#;

        let wrapped = wrap_pass_fragment(source);
        assert!(!wrapped.contains("uniform float iTime"));
        assert!(!wrapped.contains("uniform vec3 iResolution"));
        assert!(wrapped.contains("mainImage"));
        assert!(wrapped.contains("echoform_channel2_sampler"));
    }

    #[test]
    fn wrap_keeps_user_code_intact() {
        let source = "void mainImage(out vec4 c, in vec2 f) { c = texture(iChannel1, f); }";
        let wrapped = wrap_pass_fragment(source);
        assert!(wrapped.contains("texture(iChannel1, f)"));
        assert!(wrapped.ends_with(FOOTER));
    }
}
