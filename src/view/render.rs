use std::num::NonZeroU64;

use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::config::ShadowConfig;
use crate::controller::frame_loop::{CameraUniform, LightingUniform, ShadowUniform};
use crate::controller::Simulation;
use crate::model::material::{Material, Resources, TextureId, Wrap};
use crate::model::StarField;
use crate::utils::{MeshBuffer, Vertex};
use crate::view::draw_list::{DrawItem, DrawList, Topology, MAX_JOINTS};
use crate::view::shadow_map::ShadowMap;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Dynamic-offset stride for per-object model matrices.
const OBJECT_STRIDE: u64 = 256;
const PALETTE_SIZE: u64 = (MAX_JOINTS * 64) as u64;
/// Model matrix plus a flags vec4 (x = receives shadows).
const OBJECT_SIZE: u64 = 80;

/// Dynamic offsets of an item's model slot and joint palette.
pub(crate) fn object_offsets(slot: usize, item: &DrawItem) -> [u32; 2] {
    [(slot as u64 * OBJECT_STRIDE) as u32, (item.palette as u64 * PALETTE_SIZE) as u32]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub uv_repeat: [f32; 2],
    /// 0 lit, 1 unlit, 2 matcap
    pub shading: f32,
    pub alpha_test: f32,
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        Self {
            color: material.color,
            uv_repeat: material.uv_repeat,
            shading: material.shading.code(),
            alpha_test: material.alpha_test,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteUniform {
    pub offset: [f32; 4],
    /// x = world size, y = viewport aspect
    pub params: [f32; 4],
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages, dynamic: bool) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_buffer(device: &Device, label: &str, size: u64) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

// Shared graphics setup: frame uniforms and shadow maps at group 0
pub struct FrameResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub shadow_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub bind_group: BindGroup,
}

pub fn create_frame_resources(device: &Device, shadow_map: &ShadowMap) -> FrameResources {
    let camera_buffer = uniform_buffer(device, "camera_buffer", std::mem::size_of::<CameraUniform>() as u64);
    let lighting_buffer = uniform_buffer(device, "lighting_buffer", std::mem::size_of::<LightingUniform>() as u64);
    let shadow_buffer = uniform_buffer(device, "shadow_buffer", std::mem::size_of::<ShadowUniform>() as u64);

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("frame_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX_FRAGMENT, false),
            uniform_entry(1, ShaderStages::FRAGMENT, false),
            uniform_entry(2, ShaderStages::FRAGMENT, false),
            BindGroupLayoutEntry {
                binding: 3,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Depth,
                    view_dimension: TextureViewDimension::D2Array,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 4,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Comparison),
                count: None,
            },
        ],
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("frame_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
            BindGroupEntry { binding: 2, resource: shadow_buffer.as_entire_binding() },
            BindGroupEntry { binding: 3, resource: BindingResource::TextureView(&shadow_map.array_view) },
            BindGroupEntry { binding: 4, resource: BindingResource::Sampler(&shadow_map.sampler) },
        ],
    });

    FrameResources { camera_buffer, lighting_buffer, shadow_buffer, bind_group_layout, bind_group }
}

/// Per-object model matrices and joint palettes, addressed by dynamic offset.
struct ObjectBuffers {
    model_buffer: Buffer,
    palette_buffer: Buffer,
    bind_group: BindGroup,
    objects: u64,
    palettes: u64,
}

impl ObjectBuffers {
    fn new(device: &Device, layout: &BindGroupLayout, objects: u64, palettes: u64) -> Self {
        let model_buffer = uniform_buffer(device, "object_models", objects * OBJECT_STRIDE);
        let palette_buffer = uniform_buffer(device, "object_palettes", palettes * PALETTE_SIZE);
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::Buffer(BufferBinding {
                        buffer: &model_buffer,
                        offset: 0,
                        size: NonZeroU64::new(OBJECT_SIZE),
                    }),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Buffer(BufferBinding {
                        buffer: &palette_buffer,
                        offset: 0,
                        size: NonZeroU64::new(PALETTE_SIZE),
                    }),
                },
            ],
        });
        Self { model_buffer, palette_buffer, bind_group, objects, palettes }
    }
}

struct GpuTexture {
    revision: u32,
    view: TextureView,
    wrap: Wrap,
}

struct GpuMaterial {
    uniform: MaterialUniform,
    buffer: Buffer,
    bind_group: BindGroup,
    /// Texture revisions the bind group was built against.
    revisions: (u32, u32),
}

struct PipelineSet {
    opaque: RenderPipeline,
    transparent: RenderPipeline,
    lines: RenderPipeline,
    sprites: RenderPipeline,
}

fn create_pipelines(
    device: &Device,
    format: TextureFormat,
    frame_layout: &BindGroupLayout,
    object_layout: &BindGroupLayout,
    sprite_layout: &BindGroupLayout,
    material_layout: &BindGroupLayout,
) -> PipelineSet {
    let scene_shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });
    let sprite_shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("sprite_shader"),
        source: ShaderSource::Wgsl(include_str!("../shaders/sprite.wgsl").into()),
    });

    let scene_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[frame_layout, object_layout, material_layout],
        push_constant_ranges: &[],
    });
    let sprite_pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("sprite_pipeline_layout"),
        bind_group_layouts: &[frame_layout, sprite_layout, material_layout],
        push_constant_ranges: &[],
    });

    let scene_pipeline = |label: &str, topology: PrimitiveTopology, blend: BlendState, depth_write: bool| {
        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&scene_layout),
            vertex: VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState { format, blend: Some(blend), write_mask: ColorWrites::ALL })],
                compilation_options: Default::default(),
            }),
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
                depth_write_enabled: depth_write,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
            cache: None,
        })
    };

    let opaque = scene_pipeline("opaque_pipeline", PrimitiveTopology::TriangleList, BlendState::REPLACE, true);
    let transparent =
        scene_pipeline("transparent_pipeline", PrimitiveTopology::TriangleList, BlendState::ALPHA_BLENDING, false);
    let lines = scene_pipeline("line_pipeline", PrimitiveTopology::LineList, BlendState::REPLACE, true);

    let sprites = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("sprite_pipeline"),
        layout: Some(&sprite_pipeline_layout),
        vertex: VertexState {
            module: &sprite_shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexBufferLayout {
                array_stride: 12,
                step_mode: VertexStepMode::Instance,
                attributes: &[VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 }],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &sprite_shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(BlendState::REPLACE), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    PipelineSet { opaque, transparent, lines, sprites }
}

fn upload_image(device: &Device, queue: &Queue, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureView {
    let texture = device.create_texture_with_data(
        queue,
        &TextureDescriptor {
            label: Some(label),
            size: Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        },
        util::TextureDataOrder::LayerMajor,
        rgba,
    );
    texture.create_view(&TextureViewDescriptor::default())
}

///////////////////////////////////////////////////////////////////////////////

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    // wgpu resources
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub clear_color: [f32; 3],
    depth_view: TextureView,

    // Pipelines and layouts
    pipelines: PipelineSet,
    frame: FrameResources,
    shadow_map: ShadowMap,
    object_layout: BindGroupLayout,
    material_layout: BindGroupLayout,
    objects: ObjectBuffers,

    // Samplers and fallback
    sampler_clamp: Sampler,
    sampler_repeat: Sampler,
    white: TextureView,

    // Caches indexed by resource id
    meshes: Vec<Option<MeshBuffer>>,
    textures: Vec<Option<GpuTexture>>,
    materials: Vec<Option<GpuMaterial>>,

    // Stars
    sprite_buffer: Buffer,
    sprite_bind_group: BindGroup,
    star_instances: Option<(Buffer, u32)>,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn new(
        device: &Device,
        queue: &Queue,
        config: &SurfaceConfiguration,
        clear_color: [f32; 3],
        shadows: &ShadowConfig,
    ) -> Self {
        let object_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX_FRAGMENT, true),
                uniform_entry(1, ShaderStages::VERTEX, true),
            ],
        });
        let shadow_map = ShadowMap::new(device, &object_layout, shadows);
        let frame = create_frame_resources(device, &shadow_map);
        let sprite_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("sprite_bind_group_layout"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX, false)],
        });
        let material_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX_FRAGMENT, false),
                texture_entry(1),
                texture_entry(2),
                BindGroupLayoutEntry {
                    binding: 3,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipelines = create_pipelines(
            device,
            config.format,
            &frame.bind_group_layout,
            &object_layout,
            &sprite_layout,
            &material_layout,
        );
        let objects = ObjectBuffers::new(device, &object_layout, 64, 4);

        let sampler = |label: &str, mode: AddressMode| {
            device.create_sampler(&SamplerDescriptor {
                label: Some(label),
                address_mode_u: mode,
                address_mode_v: mode,
                address_mode_w: mode,
                mag_filter: FilterMode::Linear,
                min_filter: FilterMode::Linear,
                mipmap_filter: FilterMode::Nearest,
                ..Default::default()
            })
        };
        let sampler_clamp = sampler("sampler_clamp", AddressMode::ClampToEdge);
        let sampler_repeat = sampler("sampler_repeat", AddressMode::Repeat);
        let white = upload_image(device, queue, "white", 1, 1, &[255, 255, 255, 255]);

        let sprite_buffer = uniform_buffer(device, "sprite_buffer", std::mem::size_of::<SpriteUniform>() as u64);
        let sprite_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("sprite_bind_group"),
            layout: &sprite_layout,
            entries: &[BindGroupEntry { binding: 0, resource: sprite_buffer.as_entire_binding() }],
        });

        let (_, depth_view) = create_depth_texture(device, config.width, config.height);
        let egui_renderer = egui_wgpu::Renderer::new(device, config.format, egui_wgpu::RendererOptions::default());

        Self {
            format: config.format,
            alpha_mode: config.alpha_mode,
            width: config.width,
            height: config.height,
            pixel_ratio: 1.0,
            clear_color,
            depth_view,
            pipelines,
            frame,
            shadow_map,
            object_layout,
            material_layout,
            objects,
            sampler_clamp,
            sampler_repeat,
            white,
            meshes: Vec::new(),
            textures: Vec::new(),
            materials: Vec::new(),
            sprite_buffer,
            sprite_bind_group,
            star_instances: None,
            egui_renderer,
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        }
    }

    fn surface_config(&self) -> SurfaceConfiguration {
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width,
            height: self.height,
            present_mode: PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Reconfigure the surface and recreate the depth buffer.
    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        surface.configure(device, &self.surface_config());
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    pub fn write_frame_uniforms(
        &self,
        queue: &Queue,
        camera: &CameraUniform,
        lighting: &LightingUniform,
        shadows: &ShadowUniform,
    ) {
        queue.write_buffer(&self.frame.camera_buffer, 0, bytemuck::bytes_of(camera));
        queue.write_buffer(&self.frame.lighting_buffer, 0, bytemuck::bytes_of(lighting));
        queue.write_buffer(&self.frame.shadow_buffer, 0, bytemuck::bytes_of(shadows));
        self.shadow_map.write_lights(queue, shadows);
    }

    fn sync_meshes(&mut self, device: &Device, resources: &Resources) {
        for (i, mesh) in resources.meshes.iter().enumerate().skip(self.meshes.len()) {
            debug_assert_eq!(i, self.meshes.len());
            self.meshes.push((!mesh.is_empty()).then(|| mesh.upload(device)));
        }
    }

    fn sync_textures(&mut self, device: &Device, queue: &Queue, resources: &Resources) {
        self.textures.resize_with(resources.textures.len(), || None);
        for (slot, gpu) in resources.textures.iter().zip(self.textures.iter_mut()) {
            let Some(image) = &slot.image else { continue };
            if gpu.as_ref().is_some_and(|t| t.revision == slot.revision) {
                continue;
            }
            tracing::debug!(source = %slot.source, width = image.width, height = image.height, "texture upload");
            let view = upload_image(device, queue, &slot.source, image.width, image.height, &image.rgba);
            *gpu = Some(GpuTexture { revision: slot.revision, view, wrap: slot.wrap });
        }
    }

    fn texture_revision(&self, id: Option<TextureId>) -> u32 {
        id.and_then(|id| self.textures.get(id.0))
            .and_then(|t| t.as_ref())
            .map_or(0, |t| t.revision)
    }

    fn sync_materials(&mut self, device: &Device, queue: &Queue, resources: &Resources) {
        self.materials.resize_with(resources.materials.len(), || None);
        for (i, material) in resources.materials.iter().enumerate() {
            let uniform = MaterialUniform::from_material(material);
            let revisions = (self.texture_revision(material.map), self.texture_revision(material.alpha_map));

            if let Some(gpu) = &mut self.materials[i] {
                if gpu.uniform != uniform {
                    queue.write_buffer(&gpu.buffer, 0, bytemuck::bytes_of(&uniform));
                    gpu.uniform = uniform;
                }
                if gpu.revisions == revisions {
                    continue;
                }
            }

            let view = |id: Option<TextureId>| {
                id.and_then(|id| self.textures.get(id.0))
                    .and_then(|t| t.as_ref())
                    .map_or(&self.white, |t| &t.view)
            };
            let wrap = material
                .map
                .and_then(|id| self.textures.get(id.0))
                .and_then(|t| t.as_ref())
                .map_or(Wrap::Clamp, |t| t.wrap);
            let sampler = match wrap {
                Wrap::Repeat => &self.sampler_repeat,
                Wrap::Clamp => &self.sampler_clamp,
            };

            let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
                label: Some(&material.name),
                contents: bytemuck::bytes_of(&uniform),
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&BindGroupDescriptor {
                label: Some(&material.name),
                layout: &self.material_layout,
                entries: &[
                    BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() },
                    BindGroupEntry { binding: 1, resource: BindingResource::TextureView(view(material.map)) },
                    BindGroupEntry { binding: 2, resource: BindingResource::TextureView(view(material.alpha_map)) },
                    BindGroupEntry { binding: 3, resource: BindingResource::Sampler(sampler) },
                ],
            });
            self.materials[i] = Some(GpuMaterial { uniform, buffer, bind_group, revisions });
        }
    }

    fn sync_stars(&mut self, device: &Device, queue: &Queue, stars: &StarField, aspect: f32) {
        if self.star_instances.as_ref().map_or(true, |(_, n)| *n as usize != stars.points.len()) {
            let points: Vec<[f32; 3]> = stars.points.iter().map(|p| p.to_array()).collect();
            let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
                label: Some("star_instances"),
                contents: bytemuck::cast_slice(&points),
                usage: BufferUsages::VERTEX,
            });
            self.star_instances = Some((buffer, points.len() as u32));
        }
        let uniform = SpriteUniform {
            offset: stars.offset.extend(0.0).to_array(),
            params: [stars.size, aspect, 0.0, 0.0],
        };
        queue.write_buffer(&self.sprite_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Write model matrices and palettes, growing the buffers when needed.
    fn write_objects(&mut self, device: &Device, queue: &Queue, list: &DrawList) {
        let objects = list.items.len().max(1) as u64;
        let palettes = list.palettes.len() as u64;
        if objects > self.objects.objects || palettes > self.objects.palettes {
            let objects = objects.next_power_of_two().max(self.objects.objects);
            let palettes = palettes.next_power_of_two().max(self.objects.palettes);
            tracing::debug!(objects, palettes, "growing object buffers");
            self.objects = ObjectBuffers::new(device, &self.object_layout, objects, palettes);
        }

        let mut models = vec![0u8; (list.items.len() as u64 * OBJECT_STRIDE) as usize];
        for (i, item) in list.items.iter().enumerate() {
            let start = i * OBJECT_STRIDE as usize;
            models[start..start + 64].copy_from_slice(bytemuck::cast_slice(&item.model.to_cols_array()));
            models[start + 64..start + OBJECT_SIZE as usize]
                .copy_from_slice(bytemuck::cast_slice(&object_flags(item)));
        }
        if !models.is_empty() {
            queue.write_buffer(&self.objects.model_buffer, 0, &models);
        }

        let mut joints = vec![Mat4::IDENTITY; list.palettes.len() * MAX_JOINTS];
        for (i, palette) in list.palettes.iter().enumerate() {
            joints[i * MAX_JOINTS..i * MAX_JOINTS + palette.len()].copy_from_slice(palette);
        }
        let joints: Vec<[f32; 16]> = joints.iter().map(|m| m.to_cols_array()).collect();
        queue.write_buffer(&self.objects.palette_buffer, 0, bytemuck::cast_slice(&joints));
    }

    pub fn draw_frame(&mut self, device: &Device, queue: &Queue, surface: &Surface, sim: &Simulation) {
        let (egui_primitives, egui_full_output) = match (self.egui_primitives.take(), self.egui_full_output.take()) {
            (Some(prim), Some(output)) => (prim, output),
            _ => return, // No UI to render
        };

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: self.egui_dpr,
        };

        // Texture deltas are applied even when the frame is skipped
        for (id, image_delta) in &egui_full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                surface.configure(device, &self.surface_config());
                return;
            }
            Err(e) => {
                tracing::warn!(error = ?e, "frame skipped");
                return;
            }
        };

        self.sync_meshes(device, &sim.resources);
        self.sync_textures(device, queue, &sim.resources);
        self.sync_materials(device, queue, &sim.resources);
        self.sync_stars(device, queue, &sim.stars, sim.camera.aspect);
        let list = DrawList::build(&sim.scene, &sim.resources, sim.camera.eye);
        self.write_objects(device, queue, &list);

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        self.shadow_map
            .encode(&mut encoder, &list, &self.meshes, &self.objects.bind_group, sim.config.shadows.enabled);

        {
            let [r, g, b] = self.clear_color.map(|c| srgb_to_linear(c as f64));
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color { r, g, b, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.frame.bind_group, &[]);

            // DRAW SCENE
            for (i, item) in list.items.iter().enumerate() {
                let (Some(Some(mesh)), Some(Some(material))) =
                    (self.meshes.get(item.mesh.0), self.materials.get(item.material.0))
                else {
                    continue;
                };
                let pipeline = match (item.topology, item.transparent) {
                    (Topology::Lines, _) => &self.pipelines.lines,
                    (Topology::Triangles, true) => &self.pipelines.transparent,
                    (Topology::Triangles, false) => &self.pipelines.opaque,
                };
                rp.set_pipeline(pipeline);
                rp.set_bind_group(1, &self.objects.bind_group, &object_offsets(i, item));
                rp.set_bind_group(2, &material.bind_group, &[]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            // DRAW STARS
            if let (Some((instances, count)), Some(Some(material))) =
                (&self.star_instances, self.materials.get(sim.star_material.0))
            {
                rp.set_pipeline(&self.pipelines.sprites);
                rp.set_bind_group(1, &self.sprite_bind_group, &[]);
                rp.set_bind_group(2, &material.bind_group, &[]);
                rp.set_vertex_buffer(0, instances.slice(..));
                rp.draw(0..6, 0..*count);
            }
        }

        // Update egui buffers
        self.egui_renderer
            .update_buffers(device, queue, &mut encoder, &egui_primitives, &screen_descriptor);

        // Render egui overlay
        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &egui_primitives, &screen_descriptor);
        }

        // Free egui textures
        for id in &egui_full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn object_flags(item: &DrawItem) -> [f32; 4] {
    let flag = |on: bool| if on { 1.0 } else { 0.0 };
    [flag(item.shadows.receive), flag(item.shadows.cast), 0.0, 0.0]
}

/// Clear colours are given sRGB-encoded; the render target expects linear.
fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
