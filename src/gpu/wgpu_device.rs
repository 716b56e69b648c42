//! [`GraphicsDevice`] backed by `wgpu`.
//!
//! GL-style calls update the recorded [`Frame`]; [`WgpuDevice::render`] then
//! replays it into a single render pass. Buffers and textures are real wgpu
//! resources from the moment their data is set, programs keep their compiled
//! modules, and one render pipeline is cached per program, vertex layout and
//! topology.

use std::{cell::RefCell, collections::HashMap, iter};

use anyhow::anyhow;
use instant::Duration;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::{
    error::GpuError,
    gpu::{
        BufferId, BufferTarget, DataType, DrawMode, GraphicsDevice, ProgramId, SamplerParams,
        ShaderId, ShaderStage, TextureFilter, TextureId, TextureWrap, UniformLocation,
        UniformValue,
        reflect::{self, BindingKind, ProgramReflection, StageReflection},
    },
    pipelines::mk_render_pipeline,
    render::{DrawCall, DrawRange, Frame, RenderState, VertexAttribute},
};

/// A sampled 2D colour texture.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub params: SamplerParams,
}

impl GpuTexture {
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        params: SamplerParams,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, params);
        Self {
            texture,
            view,
            sampler,
            params,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, params: SamplerParams) -> wgpu::Sampler {
    let address_mode = match params.wrap {
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
        TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    };
    let min_filter = match params.min_filter {
        TextureFilter::Linear => wgpu::FilterMode::Linear,
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter,
        ..Default::default()
    })
}

pub fn vertex_format(
    data_type: DataType,
    size: u32,
    normalized: bool,
) -> Result<wgpu::VertexFormat, GpuError> {
    use wgpu::VertexFormat as F;
    let format = match (data_type, size, normalized) {
        (DataType::Float, 1, _) => F::Float32,
        (DataType::Float, 2, _) => F::Float32x2,
        (DataType::Float, 3, _) => F::Float32x3,
        (DataType::Float, 4, _) => F::Float32x4,
        (DataType::Int, 1, _) => F::Sint32,
        (DataType::Int, 2, _) => F::Sint32x2,
        (DataType::Int, 3, _) => F::Sint32x3,
        (DataType::Int, 4, _) => F::Sint32x4,
        (DataType::UnsignedInt, 1, _) => F::Uint32,
        (DataType::UnsignedInt, 2, _) => F::Uint32x2,
        (DataType::UnsignedInt, 3, _) => F::Uint32x3,
        (DataType::UnsignedInt, 4, _) => F::Uint32x4,
        (DataType::Short, 2, false) => F::Sint16x2,
        (DataType::Short, 4, false) => F::Sint16x4,
        (DataType::Short, 2, true) => F::Snorm16x2,
        (DataType::Short, 4, true) => F::Snorm16x4,
        (DataType::UnsignedShort, 2, false) => F::Uint16x2,
        (DataType::UnsignedShort, 4, false) => F::Uint16x4,
        (DataType::UnsignedShort, 2, true) => F::Unorm16x2,
        (DataType::UnsignedShort, 4, true) => F::Unorm16x4,
        (DataType::Byte, 2, false) => F::Sint8x2,
        (DataType::Byte, 4, false) => F::Sint8x4,
        (DataType::Byte, 2, true) => F::Snorm8x2,
        (DataType::Byte, 4, true) => F::Snorm8x4,
        (DataType::UnsignedByte, 2, false) => F::Uint8x2,
        (DataType::UnsignedByte, 4, false) => F::Uint8x4,
        (DataType::UnsignedByte, 2, true) => F::Unorm8x2,
        (DataType::UnsignedByte, 4, true) => F::Unorm8x4,
        _ => return Err(GpuError::UnsupportedFormat { data_type, size }),
    };
    Ok(format)
}

fn index_format(data_type: DataType) -> Result<wgpu::IndexFormat, GpuError> {
    match data_type {
        DataType::UnsignedShort => Ok(wgpu::IndexFormat::Uint16),
        DataType::UnsignedInt => Ok(wgpu::IndexFormat::Uint32),
        _ => Err(GpuError::UnsupportedFormat { data_type, size: 1 }),
    }
}

fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

struct WgpuProgram {
    reflection: ProgramReflection,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    attributes: Vec<(u32, u32, DataType, bool, u32, u32)>,
    mode: DrawMode,
    index: Option<DataType>,
}

impl PipelineKey {
    fn new(draw: &DrawCall) -> Self {
        let index = match draw.range {
            DrawRange::Elements { index_type, .. } => Some(index_type),
            DrawRange::Arrays { .. } => None,
        };
        Self {
            program: draw.program,
            attributes: draw
                .attributes
                .iter()
                .map(|a| (a.location, a.size, a.data_type, a.normalized, a.stride, a.offset))
                .collect(),
            mode: draw.mode,
            index,
        }
    }
}

enum BoundResource {
    Buffer(wgpu::Buffer),
    View(wgpu::TextureView),
    Sampler(wgpu::Sampler),
}

struct PreparedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_groups: Vec<(u32, wgpu::BindGroup)>,
    vertex: wgpu::Buffer,
    index: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    range: DrawRange,
}

pub struct WgpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    state: RefCell<RenderState>,
    buffers: RefCell<SlotMap<BufferId, Option<wgpu::Buffer>>>,
    shaders: RefCell<SlotMap<ShaderId, StageReflection>>,
    programs: RefCell<SlotMap<ProgramId, WgpuProgram>>,
    textures: RefCell<SlotMap<TextureId, GpuTexture>>,
    pipelines: RefCell<HashMap<PipelineKey, wgpu::RenderPipeline>>,
    fallback: GpuTexture,
}

impl WgpuDevice {
    /// Wraps an existing device rendering into targets of `format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let fallback = GpuTexture::from_rgba(
            &device,
            &queue,
            1,
            1,
            &[255, 255, 255, 255],
            SamplerParams::default(),
            Some("fallback texture"),
        );
        Self {
            device,
            queue,
            format,
            state: RefCell::new(RenderState::default()),
            buffers: RefCell::new(SlotMap::with_key()),
            shaders: RefCell::new(SlotMap::with_key()),
            programs: RefCell::new(SlotMap::with_key()),
            textures: RefCell::new(SlotMap::with_key()),
            pipelines: RefCell::new(HashMap::new()),
            fallback,
        }
    }

    /// Requests an adapter without a surface, rendering into `Rgba8Unorm` targets.
    pub async fn new_headless() -> anyhow::Result<Self> {
        let mut descriptor = wgpu::InstanceDescriptor::new_without_display_handle();
        descriptor.backends = if cfg!(target_arch = "wasm32") {
            wgpu::Backends::GL
        } else {
            wgpu::Backends::PRIMARY
        };
        let instance = wgpu::Instance::new(descriptor);
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("zone-ngin device"),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await?;
        Ok(Self::new(device, queue, wgpu::TextureFormat::Rgba8Unorm))
    }

    pub fn frame(&self) -> Frame {
        self.state.borrow().frame().clone()
    }

    fn pipeline(&self, draw: &DrawCall, program: &WgpuProgram) -> Result<wgpu::RenderPipeline, GpuError> {
        let key = PipelineKey::new(draw);
        if let Some(pipeline) = self.pipelines.borrow().get(&key) {
            return Ok(pipeline.clone());
        }

        let attributes = draw
            .attributes
            .iter()
            .map(|a: &VertexAttribute| {
                Ok(wgpu::VertexAttribute {
                    format: vertex_format(a.data_type, a.size, a.normalized)?,
                    offset: a.offset as wgpu::BufferAddress,
                    shader_location: a.location,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;
        let stride = draw.attributes.first().map(|a| a.stride).unwrap_or(0);
        let layout = wgpu::VertexBufferLayout {
            array_stride: stride as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };
        let strip_index_format = match (draw.mode, key.index) {
            (DrawMode::LineStrip | DrawMode::TriangleStrip, Some(index)) => Some(index_format(index)?),
            _ => None,
        };

        let pipeline = mk_render_pipeline(
            &self.device,
            None,
            [
                (&program.vertex, program.reflection.vertex.entry_point.as_str()),
                (&program.fragment, program.reflection.fragment.entry_point.as_str()),
            ],
            self.format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            &[layout],
            topology(draw.mode),
            strip_index_format,
        );
        self.pipelines.borrow_mut().insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn texture_on_unit(&self, draw: &DrawCall, location: UniformLocation) -> GpuTexture {
        let unit = match draw.uniform(location) {
            Some(UniformValue::Int(unit)) => *unit as u32,
            _ => 0,
        };
        draw.textures
            .get(&unit)
            .and_then(|id| self.textures.borrow().get(*id).cloned())
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn prepare(&self, draw: &DrawCall) -> Result<Option<PreparedDraw>, GpuError> {
        let buffers = self.buffers.borrow();
        let Some(Some(vertex)) = buffers.get(draw.vertex_buffer).cloned() else {
            log::warn!("You tried to draw a buffer that holds no data");
            return Ok(None);
        };
        let index = match (draw.index_buffer, draw.range) {
            (Some(id), DrawRange::Elements { index_type, .. }) => match buffers.get(id).cloned() {
                Some(Some(buffer)) => Some((buffer, index_format(index_type)?)),
                _ => {
                    log::warn!("You tried to draw with an index buffer that holds no data");
                    return Ok(None);
                }
            },
            _ => None,
        };
        drop(buffers);

        let programs = self.programs.borrow();
        let program = programs
            .get(draw.program)
            .ok_or(GpuError::UnknownHandle("program"))?;
        let pipeline = self.pipeline(draw, program)?;
        let reflection = &program.reflection;

        let mut bind_groups = Vec::new();
        for group in reflection.groups() {
            let resources: Vec<(u32, BoundResource)> = reflection
                .bindings
                .iter()
                .filter(|b| b.location.group == group)
                .map(|b| {
                    let resource = match b.kind {
                        BindingKind::Buffer => {
                            let contents = draw
                                .uniform(b.location)
                                .map(|v| v.to_bytes())
                                .unwrap_or_else(|| vec![0; 64]);
                            BoundResource::Buffer(self.device.create_buffer_init(
                                &wgpu::util::BufferInitDescriptor {
                                    label: Some(&b.name),
                                    contents: &contents,
                                    usage: wgpu::BufferUsages::UNIFORM,
                                },
                            ))
                        }
                        BindingKind::Texture => {
                            BoundResource::View(self.texture_on_unit(draw, b.location).view)
                        }
                        BindingKind::Sampler => {
                            let texture = match reflection.texture_for_sampler(b) {
                                Some(texture) => self.texture_on_unit(draw, texture.location),
                                None => self.fallback.clone(),
                            };
                            BoundResource::Sampler(texture.sampler)
                        }
                    };
                    (b.location.binding, resource)
                })
                .collect();
            let entries: Vec<wgpu::BindGroupEntry> = resources
                .iter()
                .map(|(binding, resource)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: match resource {
                        BoundResource::Buffer(buffer) => buffer.as_entire_binding(),
                        BoundResource::View(view) => wgpu::BindingResource::TextureView(view),
                        BoundResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                    },
                })
                .collect();
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &pipeline.get_bind_group_layout(group),
                entries: &entries,
            });
            bind_groups.push((group, bind_group));
        }

        Ok(Some(PreparedDraw {
            pipeline,
            bind_groups,
            vertex,
            index,
            range: draw.range,
        }))
    }

    /// Replays the current frame into `view`.
    pub fn render(&self, view: &wgpu::TextureView) -> Result<(), GpuError> {
        let frame = self.frame();
        let mut prepared = Vec::new();
        for draw in frame.draws.iter() {
            if let Some(draw) = self.prepare(draw)? {
                prepared.push(draw);
            }
        }
        let [r, g, b, a] = frame.clear_color.map(f64::from);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for draw in prepared.iter() {
                render_pass.set_pipeline(&draw.pipeline);
                for (group, bind_group) in draw.bind_groups.iter() {
                    render_pass.set_bind_group(*group, bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, draw.vertex.slice(..));
                match (draw.range, &draw.index) {
                    (DrawRange::Arrays { first, count }, _) => {
                        render_pass.draw(first..first + count, 0..1)
                    }
                    (DrawRange::Elements { count, offset, .. }, Some((index, format))) => {
                        render_pass.set_index_buffer(index.slice(..), *format);
                        let first = offset / index_stride(*format);
                        render_pass.draw_indexed(first..first + count, 0, 0..1);
                    }
                    (DrawRange::Elements { .. }, None) => (),
                }
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }

    /// Renders the current frame offscreen and reads it back.
    ///
    /// `width * 4` must be a multiple of 256 bytes.
    pub async fn render_to_image(&self, width: u32, height: u32) -> anyhow::Result<image::RgbaImage> {
        let u32_size = std::mem::size_of::<u32>() as u32;
        if (u32_size * width) % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT != 0 {
            anyhow::bail!("width {width} doesn't give a 256 byte aligned row");
        }
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        self.render(&target.create_view(&wgpu::TextureViewDescriptor::default()))?;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            size: (u32_size * width * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: None,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(u32_size * width),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );
        self.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow!("readback channel closed"))??;
        let data = buffer_slice.get_mapped_range().to_vec();
        output_buffer.unmap();

        image::RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("readback buffer doesn't match {width}x{height}"))
    }
}

fn index_stride(format: wgpu::IndexFormat) -> u32 {
    match format {
        wgpu::IndexFormat::Uint16 => 2,
        wgpu::IndexFormat::Uint32 => 4,
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(&self) -> BufferId {
        self.buffers.borrow_mut().insert(None)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        if let Some(Some(buffer)) = self.buffers.borrow_mut().remove(buffer) {
            buffer.destroy();
        }
        self.state.borrow_mut().forget_buffer(buffer);
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.state.borrow_mut().bind_buffer(target, buffer);
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) -> Result<(), GpuError> {
        let bound = self
            .state
            .borrow()
            .bound(target)
            .ok_or(GpuError::UnknownHandle("buffer"))?;
        let mut buffers = self.buffers.borrow_mut();
        let slot = buffers
            .get_mut(bound)
            .ok_or(GpuError::UnknownHandle("buffer"))?;
        let usage = match target {
            BufferTarget::Array => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        };
        if let Some(old) = slot.take() {
            old.destroy();
        }
        if !data.is_empty() {
            *slot = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("GlBuffer"),
                contents: data,
                usage,
            }));
        }
        Ok(())
    }

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        data_type: DataType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        self.state.borrow_mut().attrib_pointer(VertexAttribute {
            location,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.state.borrow_mut().set_attrib_enabled(location, true);
    }

    fn disable_vertex_attrib_array(&self, location: u32) {
        self.state.borrow_mut().set_attrib_enabled(location, false);
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let reflection = reflect::compile(stage, source)?;
        Ok(self.shaders.borrow_mut().insert(reflection))
    }

    fn create_program(&self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let shaders = self.shaders.borrow();
        let (Some(vs), Some(fs)) = (shaders.get(vertex), shaders.get(fragment)) else {
            return Err("unknown shader handle".to_string());
        };
        let reflection = reflect::link(vs, fs)?;
        let module = |label: &str, source: &str| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.to_string().into()),
                })
        };
        let program = WgpuProgram {
            vertex: module("Vertex Shader", &reflection.vertex.source),
            fragment: module("Fragment Shader", &reflection.fragment.source),
            reflection,
        };
        Ok(self.programs.borrow_mut().insert(program))
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.shaders.borrow_mut().remove(shader);
    }

    fn delete_program(&self, program: ProgramId) {
        self.programs.borrow_mut().remove(program);
        self.pipelines.borrow_mut().retain(|key, _| key.program != program);
        self.state.borrow_mut().forget_program(program);
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<(String, u32)> {
        self.programs
            .borrow()
            .get(program)
            .map(|p| p.reflection.attributes().to_vec())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<(String, UniformLocation)> {
        self.programs
            .borrow()
            .get(program)
            .map(|p| {
                p.reflection
                    .bindings
                    .iter()
                    .map(|b| (b.name.clone(), b.location))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().use_program(program);
    }

    fn uniform(&self, location: UniformLocation, value: UniformValue) {
        self.state.borrow_mut().uniform(location, value);
    }

    fn create_texture(&self) -> TextureId {
        self.textures.borrow_mut().insert(self.fallback.clone())
    }

    fn tex_image_2d(
        &self,
        texture: TextureId,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), GpuError> {
        let mut textures = self.textures.borrow_mut();
        let slot = textures
            .get_mut(texture)
            .ok_or(GpuError::UnknownHandle("texture"))?;
        *slot = GpuTexture::from_rgba(
            &self.device,
            &self.queue,
            width,
            height,
            rgba,
            slot.params,
            None,
        );
        Ok(())
    }

    fn tex_parameters(&self, texture: TextureId, params: SamplerParams) {
        if let Some(slot) = self.textures.borrow_mut().get_mut(texture) {
            slot.sampler = create_sampler(&self.device, params);
            slot.params = params;
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) {
        self.state.borrow_mut().bind_texture(unit, texture);
    }

    fn delete_texture(&self, texture: TextureId) {
        self.textures.borrow_mut().remove(texture);
        self.state.borrow_mut().forget_texture(texture);
    }

    fn clear(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear(color);
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) -> Result<(), GpuError> {
        self.state
            .borrow_mut()
            .record(mode, DrawRange::Arrays { first, count })
    }

    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        index_type: DataType,
        offset: u32,
    ) -> Result<(), GpuError> {
        self.state.borrow_mut().record(
            mode,
            DrawRange::Elements {
                count,
                index_type,
                offset,
            },
        )
    }
}
