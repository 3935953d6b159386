//! Sun and moon shadow maps: one depth layer per directional light, drawn
//! from the light before the main pass and sampled with a comparison sampler.

use std::num::NonZeroU64;

use wgpu::*;

use crate::config::ShadowConfig;
use crate::controller::frame_loop::ShadowUniform;
use crate::utils::{MeshBuffer, Vertex};
use crate::view::draw_list::{DrawList, Topology};
use crate::view::render::{object_offsets, DEPTH_FORMAT};

pub const LAYERS: u32 = 2;

/// Dynamic-offset stride between the per-layer light matrices.
const LIGHT_STRIDE: u64 = 256;

/// Byte offset of `layer`'s light matrix in the pass uniform buffer.
pub fn light_offset(layer: u32) -> u32 {
    (layer as u64 * LIGHT_STRIDE) as u32
}

pub struct ShadowMap {
    pub size: u32,
    layer_views: Vec<TextureView>,
    /// All layers, for sampling in the main pass.
    pub array_view: TextureView,
    pub sampler: Sampler,
    light_buffer: Buffer,
    light_bind_group: BindGroup,
    triangles: RenderPipeline,
    lines: RenderPipeline,
}

impl ShadowMap {
    pub fn new(device: &Device, object_layout: &BindGroupLayout, config: &ShadowConfig) -> Self {
        let size = config.map_size.max(1);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("shadow_map"),
            size: Extent3d { width: size, height: size, depth_or_array_layers: LAYERS },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let layer_views = (0..LAYERS)
            .map(|layer| {
                texture.create_view(&TextureViewDescriptor {
                    label: Some("shadow_layer"),
                    dimension: Some(TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let array_view = texture.create_view(&TextureViewDescriptor {
            label: Some("shadow_array"),
            dimension: Some(TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            compare: Some(CompareFunction::LessEqual),
            ..Default::default()
        });

        let light_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("shadow_lights"),
            size: LAYERS as u64 * LIGHT_STRIDE,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("shadow_light_layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(64),
                },
                count: None,
            }],
        });
        let light_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("shadow_light_bind_group"),
            layout: &light_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: &light_buffer,
                    offset: 0,
                    size: NonZeroU64::new(64),
                }),
            }],
        });

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: ShaderSource::Wgsl(include_str!("../shaders/shadow.wgsl").into()),
        });
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[&light_layout, object_layout],
            push_constant_ranges: &[],
        });
        let pipeline = |label: &str, topology: PrimitiveTopology| {
            device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: None,
                primitive: PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: CompareFunction::Less,
                    stencil: StencilState::default(),
                    bias: DepthBiasState { constant: 2, slope_scale: 2.0, clamp: 0.0 },
                }),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let triangles = pipeline("shadow_triangles", PrimitiveTopology::TriangleList);
        let lines = pipeline("shadow_lines", PrimitiveTopology::LineList);

        tracing::debug!(size, layers = LAYERS, "shadow map created");
        Self { size, layer_views, array_view, sampler, light_buffer, light_bind_group, triangles, lines }
    }

    pub fn write_lights(&self, queue: &Queue, shadows: &ShadowUniform) {
        for layer in 0..LAYERS {
            queue.write_buffer(
                &self.light_buffer,
                light_offset(layer) as u64,
                bytemuck::bytes_of(shadows.layer(layer)),
            );
        }
    }

    /// Clear every layer and, when `enabled`, draw the casters into it.
    /// Object slots in `objects` must already hold `list`.
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        list: &DrawList,
        meshes: &[Option<MeshBuffer>],
        objects: &BindGroup,
        enabled: bool,
    ) {
        for (layer, view) in self.layer_views.iter().enumerate() {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if !enabled {
                continue;
            }

            pass.set_bind_group(0, &self.light_bind_group, &[light_offset(layer as u32)]);
            for (slot, item) in list.casters() {
                let Some(Some(mesh)) = meshes.get(item.mesh.0) else { continue };
                pass.set_pipeline(match item.topology {
                    Topology::Triangles => &self.triangles,
                    Topology::Lines => &self.lines,
                });
                pass.set_bind_group(1, objects, &object_offsets(slot, item));
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_matrices_sit_on_dynamic_offset_boundaries() {
        assert_eq!(light_offset(ShadowUniform::SUN_LAYER), 0);
        assert_eq!(light_offset(ShadowUniform::MOON_LAYER), 256);
        assert!(ShadowUniform::MOON_LAYER < LAYERS);
        assert_eq!(std::mem::size_of::<[[f32; 4]; 4]>() as u64, 64);
    }
}
