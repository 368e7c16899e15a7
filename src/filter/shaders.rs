//! GLSL sources for the preview filters.
//!
//! All filters share one vertex shader; they differ only in how the fragment
//! shader maps the sampled colour. Sources are assembled per [`ShaderDialect`]
//! so the same bodies run on GLES (external images) and desktop GL.

use gl::types::GLenum;
use serde::{Deserialize, Serialize};

use super::FilterKind;
use crate::gpu::TEXTURE_EXTERNAL_OES;

pub const POSITION_ATTRIBUTE: &str = "aPosition";
pub const TEXCOORD_ATTRIBUTE: &str = "aTexCoord";
pub const TEXTURE_UNIFORM: &str = "uTexture";
pub const TRANSFORM_UNIFORM: &str = "uTransform";

/// Shading language flavour, tied to the texture target frames arrive in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderDialect {
    /// GLSL ES 1.00 sampling an `OES_EGL_image_external` texture
    GlesExternal,
    /// GLSL 1.20 sampling a plain 2D texture fed by uploads
    #[default]
    Desktop,
}

impl ShaderDialect {
    pub fn texture_target(self) -> GLenum {
        match self {
            ShaderDialect::GlesExternal => TEXTURE_EXTERNAL_OES,
            ShaderDialect::Desktop => gl::TEXTURE_2D,
        }
    }

    fn vertex_header(self) -> &'static str {
        match self {
            ShaderDialect::GlesExternal => "#version 100\n",
            ShaderDialect::Desktop => "#version 120\n",
        }
    }

    fn fragment_header(self) -> &'static str {
        match self {
            ShaderDialect::GlesExternal => concat!(
                "#version 100\n",
                "#extension GL_OES_EGL_image_external : require\n",
                "precision mediump float;\n",
                "uniform samplerExternalOES uTexture;\n",
            ),
            ShaderDialect::Desktop => concat!("#version 120\n", "uniform sampler2D uTexture;\n"),
        }
    }
}

const VERTEX_BODY: &str = r#"
attribute vec4 aPosition;
attribute vec4 aTexCoord;
uniform mat4 uTransform;
varying vec2 vTexCoord;

void main() {
    gl_Position = aPosition;
    vTexCoord = (uTransform * aTexCoord).xy;
}
"#;

const NORMAL_BODY: &str = r#"
varying vec2 vTexCoord;

void main() {
    gl_FragColor = texture2D(uTexture, vTexCoord);
}
"#;

const GRAY_BODY: &str = r#"
varying vec2 vTexCoord;

void main() {
    vec4 color = texture2D(uTexture, vTexCoord);
    float luma = dot(color.rgb, vec3(0.299, 0.587, 0.114));
    gl_FragColor = vec4(vec3(luma), color.a);
}
"#;

const SEPIA_BODY: &str = r#"
varying vec2 vTexCoord;

void main() {
    vec4 color = texture2D(uTexture, vTexCoord);
    vec3 sepia = vec3(
        dot(color.rgb, vec3(0.393, 0.769, 0.189)),
        dot(color.rgb, vec3(0.349, 0.686, 0.168)),
        dot(color.rgb, vec3(0.272, 0.534, 0.131))
    );
    gl_FragColor = vec4(min(sepia, vec3(1.0)), color.a);
}
"#;

pub fn fragment_body(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Normal => NORMAL_BODY,
        FilterKind::Gray => GRAY_BODY,
        FilterKind::Sepia => SEPIA_BODY,
    }
}

pub fn vertex_source(dialect: ShaderDialect) -> String {
    format!("{}{}", dialect.vertex_header(), VERTEX_BODY)
}

pub fn fragment_source(dialect: ShaderDialect, kind: FilterKind) -> String {
    format!("{}{}", dialect.fragment_header(), fragment_body(kind))
}
