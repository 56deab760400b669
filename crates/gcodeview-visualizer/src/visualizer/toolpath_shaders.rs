//! # OpenGL Shaders for Toolpath Rendering
//!
//! One program serves the three vertex formats: the normal attribute is absent for
//! points, a single x component for lines and a full vector for extrusions.

pub const TOOLPATH_VERTEX_SHADER: &str = r#"
#version 330 core

layout (location = 0) in vec3 position;
layout (location = 1) in vec3 normal;

uniform mat4 view_projection;

out vec3 frag_normal;

void main() {
    frag_normal = normal;
    gl_Position = view_projection * vec4(position, 1.0);
}
"#;

pub const TOOLPATH_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec3 frag_normal;

uniform vec4 uniform_color;
uniform vec3 light_direction;

out vec4 out_color;

void main() {
    float intensity = 1.0;
    if (length(frag_normal) > 0.0) {
        // ambient + diffuse
        intensity = 0.3 + 0.7 * abs(dot(normalize(frag_normal), -light_direction));
    }
    out_color = vec4(uniform_color.rgb * intensity, uniform_color.a);
}
"#;
