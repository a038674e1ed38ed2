//! Shells as small lit octahedra, one instance per flying shell.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use super::{GrowableBuffer, DEPTH_FORMAT, UNIFORMS_WGSL};
use crate::scene::Scene;
use crate::visuals::BlendMode;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Per-shell instance data: the model matrix columns.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShellInstance {
    pub model: [[f32; 4]; 4],
}

pub const SHELL_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
) -> VertexOutput {
    let model = mat4x4<f32>(model_0, model_1, model_2, model_3);
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * model * vec4<f32>(position, 1.0);
    out.normal = normalize((model * vec4<f32>(normal, 0.0)).xyz);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light = normalize(vec3<f32>(0.3, 1.0, 0.5));
    let diffuse = max(dot(normalize(in.normal), light), 0.0);
    let base = vec3<f32>(1.0, 0.75, 0.45);
    return vec4<f32>(base * (0.35 + 0.65 * diffuse), 1.0);
}
"#;

/// Flat-shaded unit octahedron, 8 faces.
fn octahedron() -> Vec<MeshVertex> {
    let tips = [Vec3::Y, Vec3::NEG_Y];
    let ring = [Vec3::X, Vec3::Z, Vec3::NEG_X, Vec3::NEG_Z];
    let mut vertices = Vec::with_capacity(24);
    for tip in tips {
        for i in 0..4 {
            let (a, b) = (ring[i], ring[(i + 1) % 4]);
            // Counter-clockwise seen from outside
            let (a, b) = if tip.y > 0.0 { (b, a) } else { (a, b) };
            let normal = (a + b + tip).normalize();
            for p in [tip, a, b] {
                vertices.push(MeshVertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                });
            }
        }
    }
    vertices
}

pub struct ShellPass {
    pipeline: wgpu::RenderPipeline,
    mesh: wgpu::Buffer,
    mesh_vertices: u32,
    instances: GrowableBuffer,
    count: u32,
}

impl ShellPass {
    pub fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let mesh_data = octahedron();
        let mesh = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shell Mesh Buffer"),
            contents: bytemuck::cast_slice(&mesh_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shell Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{}{}", UNIFORMS_WGSL, SHELL_SHADER).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shell Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        let blend_mode = BlendMode::Opaque;
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shell Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<ShellInstance>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4
                        ],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: blend_mode.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: blend_mode.writes_depth(),
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            mesh,
            mesh_vertices: mesh_data.len() as u32,
            instances: GrowableBuffer::new(
                device,
                "Shell Instance Buffer",
                wgpu::BufferUsages::VERTEX,
                64 * std::mem::size_of::<ShellInstance>() as u64,
            ),
            count: 0,
        }
    }

    /// Upload one instance per flying shell.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        let instances: Vec<ShellInstance> = scene
            .shells()
            .map(|shell| ShellInstance {
                model: shell.model_matrix().to_cols_array_2d(),
            })
            .collect();
        self.instances.write(device, queue, bytemuck::cast_slice(&instances));
        self.count = instances.len() as u32;
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, self.mesh.slice(..));
        render_pass.set_vertex_buffer(1, self.instances.buffer().slice(..));
        render_pass.draw(0..self.mesh_vertices, 0..self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::validate_wgsl;

    #[test]
    fn test_shell_shader_validates() {
        validate_wgsl(&format!("{}{}", UNIFORMS_WGSL, SHELL_SHADER)).unwrap();
    }

    #[test]
    fn test_octahedron_faces_point_outward() {
        let mesh = octahedron();
        assert_eq!(mesh.len(), 24);
        for tri in mesh.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|v| Vec3::from(v.position));
            let winding = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(winding.dot(centroid) > 0.0);
            assert!(Vec3::from(tri[0].normal).dot(centroid) > 0.0);
        }
    }
}
