//! Render pipelines for the three kinds of draw calls: textured quads,
//! filled rectangles and lines.
//!
//! Pipelines depend on the colour format of the target they draw into, so
//! they are built lazily per format and cached in a [`PipelineCache`] shared
//! by every clone of [`crate::context::Gpu`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub mod shape;
pub mod texture;

/// Uniform block shared by every pipeline.
///
/// Shape pipelines only read `projection` and `geo`; the colour matrix is
/// identity for them.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub projection: [[f32; 4]; 4],
    pub geo: [[f32; 4]; 4],
    pub color_body: [[f32; 4]; 4],
    pub color_translation: [f32; 4],
}

impl DrawUniform {
    pub fn new(
        projection: cgmath::Matrix4<f32>,
        geo: &crate::math::GeoM,
        color: &crate::math::ColorM,
    ) -> Self {
        let (color_body, color_translation) = color.to_uniform();
        Self {
            projection: projection.into(),
            geo: geo.to_matrix4().into(),
            color_body,
            color_translation,
        }
    }
}

/// All pipelines targeting one colour format.
#[derive(Debug)]
pub struct Pipelines {
    pub format: wgpu::TextureFormat,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub texture: wgpu::RenderPipeline,
    pub rects: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        log::debug!("Building pipelines for {:?}", format);
        let uniform_layout = mk_uniform_layout(device);
        let texture_layout = texture::mk_texture_bind_group_layout(device);
        let texture = texture::mk_texture_pipeline(device, format, &uniform_layout, &texture_layout);
        let rects = shape::mk_shape_pipeline(
            device,
            format,
            &uniform_layout,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let lines = shape::mk_shape_pipeline(
            device,
            format,
            &uniform_layout,
            wgpu::PrimitiveTopology::LineList,
        );
        Self {
            format,
            uniform_layout,
            texture_layout,
            texture,
            rects,
            lines,
        }
    }

    /// Upload a uniform block and wrap it in a bind group for slot 0.
    pub fn uniform_bind_group(&self, device: &wgpu::Device, uniform: &DrawUniform) -> wgpu::BindGroup {
        use wgpu::util::DeviceExt;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("draw_uniform_bind_group"),
        })
    }
}

/// Lazily populated map from target format to its pipelines.
#[derive(Debug, Default)]
pub struct PipelineCache {
    pipelines: Mutex<HashMap<wgpu::TextureFormat, Arc<Pipelines>>>,
}

impl PipelineCache {
    pub fn get(&self, device: &wgpu::Device, format: wgpu::TextureFormat) -> Arc<Pipelines> {
        let mut pipelines = self
            .pipelines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pipelines
            .entry(format)
            .or_insert_with(|| Arc::new(Pipelines::new(device, format)))
            .clone()
    }
}

fn mk_uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("draw_uniform_bind_group_layout"),
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Negative scales mirror quads; keep both windings.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}
