//! 2D overlay: spectrum trace and FPS graph.

use super::{GrowableBuffer, UNIFORMS_WGSL};
use crate::overlay::{OverlayBatch, OverlayVertex};
use crate::visuals::BlendMode;

pub const OVERLAY_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
) -> VertexOutput {
    // Pixels with a bottom-left origin to NDC
    let ndc = position / uniforms.viewport * 2.0 - vec2<f32>(1.0, 1.0);
    var out: VertexOutput;
    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

pub struct OverlayPass {
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    triangles: GrowableBuffer,
    lines: GrowableBuffer,
    triangle_count: u32,
    line_count: u32,
}

impl OverlayPass {
    pub fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{}{}", UNIFORMS_WGSL, OVERLAY_SHADER).into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: BlendMode::Alpha.blend_state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let vertex_size = std::mem::size_of::<OverlayVertex>() as u64;
        Self {
            triangle_pipeline: pipeline("Overlay Triangle Pipeline", wgpu::PrimitiveTopology::TriangleList),
            line_pipeline: pipeline("Overlay Line Pipeline", wgpu::PrimitiveTopology::LineList),
            triangles: GrowableBuffer::new(
                device,
                "Overlay Triangle Buffer",
                wgpu::BufferUsages::VERTEX,
                1024 * vertex_size,
            ),
            lines: GrowableBuffer::new(
                device,
                "Overlay Line Buffer",
                wgpu::BufferUsages::VERTEX,
                1024 * vertex_size,
            ),
            triangle_count: 0,
            line_count: 0,
        }
    }

    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, batch: &OverlayBatch) {
        self.triangles
            .write(device, queue, bytemuck::cast_slice(&batch.triangles));
        self.lines.write(device, queue, bytemuck::cast_slice(&batch.lines));
        self.triangle_count = batch.triangles.len() as u32;
        self.line_count = batch.lines.len() as u32;
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.triangle_count > 0 {
            render_pass.set_pipeline(&self.triangle_pipeline);
            render_pass.set_vertex_buffer(0, self.triangles.buffer().slice(..));
            render_pass.draw(0..self.triangle_count, 0..1);
        }
        if self.line_count > 0 {
            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_vertex_buffer(0, self.lines.buffer().slice(..));
            render_pass.draw(0..self.line_count, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::validate_wgsl;

    #[test]
    fn test_overlay_shader_validates() {
        validate_wgsl(&format!("{}{}", UNIFORMS_WGSL, OVERLAY_SHADER)).unwrap();
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<OverlayVertex>(), 24);
    }
}
