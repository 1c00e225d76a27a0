//! WGSL programs for the simulation kernel and the four fluid passes.
//!
//! Sources are assembled from shared snippets (camera block, fullscreen
//! triangle, view-space reconstruction) so every pass agrees on layouts.

use bytemuck::{Pod, Zeroable};

use crate::particle::Particle;
use crate::simulator::SimUniforms;

/// Threads per simulation workgroup.
pub const WORKGROUP_SIZE: u32 = 256;

/// Camera block shared by the depth, normal and shading passes.
pub const CAMERA_WGSL: &str = r#"struct Camera {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    inv_view: mat4x4<f32>,
    viewport: vec4<f32>,
    particle_radius: f32,
    near: f32,
    far: f32,
    _pad: f32,
};"#;

const FULLSCREEN_WGSL: &str = r#"@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    return vec4<f32>(positions[vertex_index], 0.0, 1.0);
}"#;

// Inverse of a symmetric perspective projection for a pixel and its view z.
const VIEW_POSITION_WGSL: &str = r#"fn view_position(coord: vec2<i32>, view_z: f32) -> vec3<f32> {
    let uv = (vec2<f32>(coord) + vec2<f32>(0.5)) * camera.viewport.zw;
    let ndc = vec2<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    return vec3<f32>(
        ndc.x * -view_z / camera.proj[0][0],
        ndc.y * -view_z / camera.proj[1][1],
        view_z
    );
}"#;

/// Uniform block of one bilateral direction.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    /// `(1, 0)` for the horizontal pass, `(0, 1)` for the vertical one.
    pub direction: [f32; 2],
    pub radius: f32,
    pub sigma: f32,
    pub depth_falloff: f32,
    pub _pad: [f32; 3],
}

/// Uniform block of the shading pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ShadingUniforms {
    /// `rgb` metallic tint, `a` Fresnel F0.
    pub base_color: [f32; 4],
    /// `xyz` world direction toward the key light, `w` shininess.
    pub key_light: [f32; 4],
    /// `xyz` world direction toward the fill light, `w` intensity.
    pub fill_light: [f32; 4],
    pub environment_mix: f32,
    pub specular_strength: f32,
    /// 1.0 when a real environment texture is bound.
    pub has_environment: f32,
    pub _pad: f32,
}

/// Particle step kernel. Reads `particles_in`, writes `particles_out`.
pub fn simulation_shader() -> String {
    let walls: String = ["x", "y", "z"]
        .iter()
        .map(|c| {
            format!(
                r#"    if p.position.{c} < -bounds.{c} {{
        p.position.{c} = -bounds.{c};
        p.velocity.{c} = -p.velocity.{c} * sim.bounce;
    }} else if p.position.{c} > bounds.{c} {{
        p.position.{c} = bounds.{c};
        p.velocity.{c} = -p.velocity.{c} * sim.bounce;
    }}
"#
            )
        })
        .collect();

    format!(
        r#"{particle}

{uniforms}

@group(0) @binding(0)
var<storage, read> particles_in: array<Particle>;

@group(0) @binding(1)
var<storage, read_write> particles_out: array<Particle>;

@group(0) @binding(2)
var<uniform> sim: SimUniforms;

@group(0) @binding(3)
var shape_targets: texture_2d<f32>;

@compute @workgroup_size({workgroup})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= sim.particle_count {{
        return;
    }}

    var p = particles_in[index];
    let dt = sim.delta_time;
    let eps = sim.epsilon;

    // Gravity
    let gravity_len = length(sim.gravity);
    if gravity_len > eps {{
        p.velocity += (sim.gravity / gravity_len) * sim.gravity_strength * dt;
    }}

    // Shape attraction
    if sim.attraction > 0.0 {{
        let side = max(sim.target_side, 1u);
        let goal = textureLoad(shape_targets, vec2<u32>(p.id % side, p.id / side), 0).xyz;
        let to_goal = goal - p.position;
        let dist = length(to_goal);
        if dist > eps {{
            p.velocity += (to_goal / dist) * sim.attraction * sim.spring_gain * dt;
        }}
    }}

    // Touch magnets
    for (var i = 0u; i < 5u; i = i + 1u) {{
        let touch = sim.touches[i];
        if touch.w <= 0.0 {{
            continue;
        }}
        let delta = touch.xyz - p.position;
        let dist2 = dot(delta, delta);
        let dist = sqrt(dist2);
        if dist > eps {{
            p.velocity += (delta / dist) * touch.w * sim.touch_gain / (dist2 + eps) * dt;
        }}
    }}

    p.velocity *= sim.damping;
    p.position += p.velocity * dt;

    // Walls
    let bounds = sim.half_bounds;
{walls}
    particles_out[index] = p;
}}
"#,
        particle = Particle::WGSL_STRUCT,
        uniforms = SimUniforms::WGSL_STRUCT,
        workgroup = WORKGROUP_SIZE,
        walls = walls,
    )
}

/// Stage A: sphere-sliced point splats into view depth + hardware depth.
pub fn depth_shader() -> String {
    format!(
        r#"{camera}

@group(0) @binding(0)
var<uniform> camera: Camera;

struct SplatVertex {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) view_center: vec3<f32>,
}};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) particle_pos: vec3<f32>,
) -> SplatVertex {{
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );

    let corner = corners[vertex_index];
    // Billboard in view space so the footprint shrinks with distance
    let view_center = (camera.view * vec4<f32>(particle_pos, 1.0)).xyz;
    let view_corner = view_center + vec3<f32>(corner * camera.particle_radius, 0.0);

    var out: SplatVertex;
    out.clip_position = camera.proj * vec4<f32>(view_corner, 1.0);
    out.corner = corner;
    out.view_center = view_center;
    return out;
}}

struct SplatFragment {{
    @location(0) view_depth: f32,
    @builtin(frag_depth) depth: f32,
}};

@fragment
fn fs_main(in: SplatVertex) -> SplatFragment {{
    let r2 = dot(in.corner, in.corner);
    if r2 > 1.0 {{
        discard;
    }}

    let nz = sqrt(1.0 - r2);
    let surface = in.view_center + vec3<f32>(in.corner, nz) * camera.particle_radius;
    let clip = camera.proj * vec4<f32>(surface, 1.0);

    var out: SplatFragment;
    out.view_depth = surface.z;
    out.depth = clip.z / clip.w;
    return out;
}}
"#,
        camera = CAMERA_WGSL,
    )
}

/// Stage B: one direction of the separable bilateral filter.
pub fn bilateral_shader() -> String {
    format!(
        r#"struct BlurParams {{
    direction: vec2<f32>,
    radius: f32,
    sigma: f32,
    depth_falloff: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}};

@group(0) @binding(0)
var source_depth: texture_2d<f32>;

@group(0) @binding(1)
var<uniform> blur: BlurParams;

{fullscreen}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) f32 {{
    let dims = vec2<i32>(textureDimensions(source_depth));
    let center = vec2<i32>(frag_coord.xy);
    let center_depth = textureLoad(source_depth, center, 0).r;
    if center_depth == 0.0 {{
        return 0.0;
    }}

    let offset = vec2<i32>(blur.direction);
    let radius = i32(blur.radius);
    let inv_two_sigma2 = 1.0 / (2.0 * blur.sigma * blur.sigma);
    var sum = 0.0;
    var weight_sum = 0.0;
    for (var i = -radius; i <= radius; i = i + 1) {{
        let coord = center + offset * i;
        if any(coord < vec2<i32>(0)) || any(coord >= dims) {{
            continue;
        }}
        let sample_depth = textureLoad(source_depth, coord, 0).r;
        if sample_depth == 0.0 {{
            continue;
        }}
        let spatial = exp(-f32(i * i) * inv_two_sigma2);
        let delta = sample_depth - center_depth;
        let similarity = exp(-delta * delta * blur.depth_falloff);
        let weight = spatial * similarity;
        sum += sample_depth * weight;
        weight_sum += weight;
    }}

    // The center tap always contributes with weight 1
    return sum / weight_sum;
}}
"#,
        fullscreen = FULLSCREEN_WGSL,
    )
}

/// Stage C: view-space normals from the smoothed depth field.
pub fn normal_shader() -> String {
    format!(
        r#"{camera}

@group(0) @binding(0)
var smoothed_depth: texture_2d<f32>;

@group(0) @binding(1)
var<uniform> camera: Camera;

{view_position}

{fullscreen}

fn neighbour_depth(coord: vec2<i32>, fallback: f32) -> f32 {{
    let dims = vec2<i32>(textureDimensions(smoothed_depth));
    if any(coord < vec2<i32>(0)) || any(coord >= dims) {{
        return fallback;
    }}
    let depth = textureLoad(smoothed_depth, coord, 0).r;
    if depth == 0.0 {{
        return fallback;
    }}
    return depth;
}}

fn neighbour(coord: vec2<i32>, fallback: f32) -> vec3<f32> {{
    return view_position(coord, neighbour_depth(coord, fallback));
}}

fn flatter(forward: vec3<f32>, backward: vec3<f32>) -> vec3<f32> {{
    if abs(backward.z) < abs(forward.z) {{
        return backward;
    }}
    return forward;
}}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {{
    let center = vec2<i32>(frag_coord.xy);
    let depth = textureLoad(smoothed_depth, center, 0).r;
    if depth == 0.0 {{
        return vec4<f32>(0.0);
    }}

    let p = view_position(center, depth);
    let dx = vec2<i32>(1, 0);
    let dy = vec2<i32>(0, 1);
    let ddx = flatter(neighbour(center + dx, depth) - p, p - neighbour(center - dx, depth));
    let ddy = flatter(neighbour(center + dy, depth) - p, p - neighbour(center - dy, depth));

    let c = cross(ddx, ddy);
    let area = length(c);
    if area < 1e-12 {{
        return vec4<f32>(0.0, 0.0, 1.0, 1.0);
    }}
    var n = c / area;
    if dot(n, -p) < 0.0 {{
        n = -n;
    }}
    return vec4<f32>(n, 1.0);
}}
"#,
        camera = CAMERA_WGSL,
        view_position = VIEW_POSITION_WGSL,
        fullscreen = FULLSCREEN_WGSL,
    )
}

/// Stage D: Fresnel-weighted metallic reflection composited over the frame.
pub fn shade_shader() -> String {
    format!(
        r#"{camera}

struct Shading {{
    base_color: vec4<f32>,
    key_light: vec4<f32>,
    fill_light: vec4<f32>,
    environment_mix: f32,
    specular_strength: f32,
    has_environment: f32,
    _pad: f32,
}};

@group(0) @binding(0)
var normals: texture_2d<f32>;

@group(0) @binding(1)
var smoothed_depth: texture_2d<f32>;

@group(0) @binding(2)
var environment: texture_2d<f32>;

@group(0) @binding(3)
var environment_sampler: sampler;

@group(0) @binding(4)
var<uniform> camera: Camera;

@group(0) @binding(5)
var<uniform> shading: Shading;

const PI: f32 = 3.14159265;

{view_position}

{fullscreen}

// Procedural photo studio: dark floor, bright ceiling, softboxes.
fn studio(dir: vec3<f32>) -> vec3<f32> {{
    let height = dir.y * 0.5 + 0.5;
    var color = mix(vec3<f32>(0.05, 0.05, 0.06), vec3<f32>(0.75, 0.77, 0.8), smoothstep(0.2, 0.9, height));
    color *= 1.0 - 0.5 * exp(-abs(dir.y) * 30.0);
    color += vec3<f32>(2.5) * smoothstep(0.88, 0.95, dir.y);
    let strips = smoothstep(0.9, 0.97, abs(dir.x)) * smoothstep(-0.3, 0.2, dir.y) * (1.0 - smoothstep(0.6, 0.8, dir.y));
    color += vec3<f32>(1.8) * strips;
    return color;
}}

fn environment_lookup(dir: vec3<f32>) -> vec3<f32> {{
    let u = atan2(dir.z, dir.x) / (2.0 * PI) + 0.5;
    let v = acos(clamp(dir.y, -1.0, 1.0)) / PI;
    return textureSampleLevel(environment, environment_sampler, vec2<f32>(u, v), 0.0).rgb;
}}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {{
    let coord = vec2<i32>(frag_coord.xy);
    let encoded = textureLoad(normals, coord, 0);
    if encoded.a == 0.0 {{
        discard;
    }}

    let depth = textureLoad(smoothed_depth, coord, 0).r;
    let p = view_position(coord, depth);
    let view_dir = normalize(-p);
    let n = normalize(encoded.xyz);

    // Schlick
    let cos_theta = clamp(dot(n, view_dir), 0.0, 1.0);
    let f0 = shading.base_color.a;
    let fresnel = f0 + (1.0 - f0) * pow(1.0 - cos_theta, 5.0);

    let r_view = reflect(-view_dir, n);
    let r_world = normalize((camera.inv_view * vec4<f32>(r_view, 0.0)).xyz);
    var reflection = studio(r_world);
    if shading.has_environment > 0.5 {{
        reflection = mix(reflection, environment_lookup(r_world), shading.environment_mix);
    }}

    var color = mix(shading.base_color.rgb * reflection, reflection, fresnel);

    let key = normalize(shading.key_light.xyz);
    let fill = normalize(shading.fill_light.xyz);
    let key_spec = pow(max(dot(r_world, key), 0.0), shading.key_light.w);
    let fill_spec = pow(max(dot(r_world, fill), 0.0), shading.key_light.w * 0.5) * shading.fill_light.w;
    color += vec3<f32>(key_spec + fill_spec) * shading.specular_strength;

    return vec4<f32>(color, encoded.a);
}}
"#,
        camera = CAMERA_WGSL,
        view_position = VIEW_POSITION_WGSL,
        fullscreen = FULLSCREEN_WGSL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_simulation_shader_valid() {
        let src = simulation_shader();
        assert!(src.contains("particles_out[index] = p;"));
        assert!(src.contains("p.velocity.z = -p.velocity.z * sim.bounce;"));
        validate_wgsl(&src).expect("simulation kernel should be valid");
    }

    #[test]
    fn test_depth_shader_valid() {
        let src = depth_shader();
        assert!(src.contains("frag_depth"));
        validate_wgsl(&src).expect("depth pass should be valid");
    }

    #[test]
    fn test_bilateral_shader_valid() {
        validate_wgsl(&bilateral_shader()).expect("bilateral pass should be valid");
    }

    #[test]
    fn test_normal_shader_valid() {
        validate_wgsl(&normal_shader()).expect("normal pass should be valid");
    }

    #[test]
    fn test_shade_shader_valid() {
        validate_wgsl(&shade_shader()).expect("shading pass should be valid");
    }

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 32);
        assert_eq!(std::mem::size_of::<ShadingUniforms>(), 64);
    }
}
