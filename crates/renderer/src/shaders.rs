use crate::types::ShaderSource;

/// Uniform carrying the rotation angle in radians.
pub const ANGLE_UNIFORM: &str = "angle";

/// Vertex attribute carrying the 2D quad corner.
pub const POINT_ATTRIBUTE: &str = "point";

/// Rotates each corner by `angle` and shrinks the quad to 75% of clip space.
pub const VERTEX: ShaderSource = ShaderSource::vertex(
    r"#version 450
layout(location = 0) in vec2 point;

layout(std140, set = 0, binding = 0) uniform Params {
    float angle;
};

void main() {
    mat2 rotate = mat2(cos(angle), -sin(angle),
                       sin(angle), cos(angle));
    gl_Position = vec4(0.75 * rotate * point, 0.0, 1.0);
}
",
);

/// Paints every fragment opaque red.
pub const FRAGMENT: ShaderSource = ShaderSource::fragment(
    r"#version 450
layout(location = 0) out vec4 color;

void main() {
    color = vec4(1.0, 0.0, 0.0, 1.0);
}
",
);
