//! Star clusters as additive point sprites.
//!
//! Each cluster uploads its initial velocities once, when it is first seen.
//! Per frame only a 48-byte [`ClusterUniforms`] block changes; the vertex
//! shader evaluates `origin + v0 t + g t^2 / 2` for every star and expands
//! it into a screen-aligned quad of `point_size` pixels.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{DEPTH_FORMAT, UNIFORMS_WGSL};
use crate::arena::Index;
use crate::cluster::Cluster;
use crate::scene::Scene;
use crate::visuals::BlendMode;

/// Per-cluster values the star shader needs.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ClusterUniforms {
    pub origin: [f32; 3],
    /// Seconds since the explosion.
    pub age: f32,
    pub color: [f32; 3],
    /// `age / lifetime`, 0 at the explosion and 1 at expiry.
    pub normalized_age: f32,
    pub gravity: [f32; 3],
    /// Sprite edge in pixels.
    pub point_size: f32,
}

impl ClusterUniforms {
    pub fn new(cluster: &Cluster, point_size: f32) -> Self {
        Self {
            origin: cluster.origin().to_array(),
            age: cluster.age(),
            color: cluster.color().rgb().to_array(),
            normalized_age: cluster.normalized_age(),
            gravity: cluster.gravity().to_array(),
            point_size,
        }
    }
}

pub const CLUSTER_SHADER: &str = r#"
struct ClusterUniforms {
    origin: vec3<f32>,
    age: f32,
    color: vec3<f32>,
    normalized_age: f32,
    gravity: vec3<f32>,
    point_size: f32,
};

@group(1) @binding(0)
var<uniform> cluster: ClusterUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) v0: vec3<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];

    let t = cluster.age;
    let position = cluster.origin + v0 * t + 0.5 * cluster.gravity * t * t;
    var clip = uniforms.view_proj * vec4<f32>(position, 1.0);
    clip = vec4<f32>(clip.xy + corner * cluster.point_size / uniforms.viewport * clip.w, clip.zw);

    var out: VertexOutput;
    out.clip_position = clip;
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let r2 = dot(in.uv, in.uv);
    if r2 > 1.0 {
        discard;
    }
    let falloff = 1.0 - r2;
    let fade = 1.0 - clamp(cluster.normalized_age, 0.0, 1.0);
    // Hot white core early on, settling into the cluster color
    let core = mix(cluster.color, vec3<f32>(1.0), falloff * falloff * fade);
    return vec4<f32>(core, falloff * fade);
}
"#;

struct ClusterBuffers {
    velocities: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    star_count: u32,
    seen: bool,
}

pub struct ClusterPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    point_size: f32,
    clusters: HashMap<Index, ClusterBuffers>,
    /// Draw order for this frame.
    order: Vec<Index>,
}

impl ClusterPass {
    pub fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        point_size: f32,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cluster Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cluster Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{}{}", UNIFORMS_WGSL, CLUSTER_SHADER).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cluster Pipeline Layout"),
            bind_group_layouts: &[uniform_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });

        let blend_mode = BlendMode::Additive;
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cluster Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
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
                cull_mode: None,
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
            bind_group_layout,
            point_size,
            clusters: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Number of clusters with buffers on the GPU.
    pub fn resident(&self) -> usize {
        self.clusters.len()
    }

    /// Upload new clusters, refresh per-cluster uniforms and release
    /// buffers of clusters that are gone.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        for buffers in self.clusters.values_mut() {
            buffers.seen = false;
        }
        self.order.clear();

        for (index, cluster) in scene.clusters() {
            let uniforms = ClusterUniforms::new(cluster, self.point_size);
            match self.clusters.get_mut(&index) {
                Some(buffers) => {
                    queue.write_buffer(&buffers.uniforms, 0, bytemuck::bytes_of(&uniforms));
                    buffers.seen = true;
                }
                None => {
                    let buffers = self.upload(device, cluster, &uniforms);
                    self.clusters.insert(index, buffers);
                }
            }
            if cluster.star_count() > 0 {
                self.order.push(index);
            }
        }

        self.clusters.retain(|_, buffers| buffers.seen);
    }

    fn upload(&self, device: &wgpu::Device, cluster: &Cluster, uniforms: &ClusterUniforms) -> ClusterBuffers {
        let v0: Vec<[f32; 3]> = cluster.velocities().iter().map(|v| v.to_array()).collect();
        // Zero-sized buffers are not allowed; empty clusters keep one unused star
        let contents: &[u8] = if v0.is_empty() {
            bytemuck::bytes_of(&[0.0f32; 3])
        } else {
            bytemuck::cast_slice(&v0)
        };
        let velocities = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cluster Velocity Buffer"),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cluster Uniform Buffer"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cluster Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        ClusterBuffers {
            velocities,
            uniforms: uniform_buffer,
            bind_group,
            star_count: v0.len() as u32,
            seen: true,
        }
    }

    /// One instanced draw per non-empty cluster.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.order.is_empty() {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        for index in &self.order {
            let Some(buffers) = self.clusters.get(index) else {
                continue;
            };
            render_pass.set_bind_group(1, &buffers.bind_group, &[]);
            render_pass.set_vertex_buffer(0, buffers.velocities.slice(..));
            render_pass.draw(0..6, 0..buffers.star_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::validate_wgsl;
    use crate::visuals::StarColor;
    use glam::Vec3;

    #[test]
    fn test_cluster_shader_validates() {
        validate_wgsl(&format!("{}{}", UNIFORMS_WGSL, CLUSTER_SHADER)).unwrap();
    }

    #[test]
    fn test_uniform_block_size() {
        assert_eq!(std::mem::size_of::<ClusterUniforms>(), 48);
    }

    #[test]
    fn test_uniforms_track_cluster() {
        let mut cluster = Cluster::new(
            Vec3::new(1.0, 50.0, -2.0),
            vec![Vec3::X],
            Vec3::new(0.0, -9.806, 0.0),
            2.0,
            StarColor::Gold,
        );
        cluster.update(0.5);
        let uniforms = ClusterUniforms::new(&cluster, 6.0);
        assert_eq!(uniforms.origin, [1.0, 50.0, -2.0]);
        assert_eq!(uniforms.age, 0.5);
        assert_eq!(uniforms.normalized_age, 0.25);
        assert_eq!(uniforms.color, StarColor::Gold.rgb().to_array());
        assert_eq!(uniforms.point_size, 6.0);
    }
}
