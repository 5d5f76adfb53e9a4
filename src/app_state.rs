use std::{collections::HashMap, sync::Arc};
use winit::window::Window;
use instant::Instant;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraUniform};
use crate::error::FxError;
use crate::frame::FrameBatch;
use crate::models::{CircleInstance, LineVertex, Vertex2D};
use crate::scene::text_label::{LabelFamily, TextAnchor, TextLabel};

const LINES_WGSL: &str = include_str!("./shaders/lines.wgsl");
const CIRCLES_WGSL: &str = include_str!("./shaders/circles.wgsl");

const INITIAL_CIRCLE_CAPACITY: usize = 1024;
const INITIAL_LINE_CAPACITY: usize = 256;
/// Distinct (text, size) pairs kept shaped before the cache is flushed.
const TEXT_CACHE_LIMIT: usize = 2048;
const BUNDLED_MONOSPACE_FAMILY: &str = "DejaVu Sans Mono";
const BUNDLED_SANS_FAMILY: &str = "DejaVu Sans";

/// A shaped label plus the measurements needed to anchor it.
struct ShapedText {
    buffer: glyphon::Buffer,
    width: f32,
    baseline: f32,
    height: f32,
}

/// Shaped labels by font size in quarter pixels, then by content.
#[derive(Default)]
struct TextCache {
    by_size: HashMap<u32, HashMap<String, ShapedText>>,
    len: usize,
}

/// Font system seeded with the bundled faces, since browsers expose no
/// system fonts.
fn bundled_font_system() -> glyphon::FontSystem {
    let mut font_system = glyphon::FontSystem::new_with_fonts([
        glyphon::fontdb::Source::Binary(Arc::new(include_bytes!(
            "../assets/fonts/DejaVuSansMono.ttf"
        ))),
        glyphon::fontdb::Source::Binary(Arc::new(include_bytes!(
            "../assets/fonts/DejaVuSans.ttf"
        ))),
    ]);
    font_system.db_mut().set_monospace_family(BUNDLED_MONOSPACE_FAMILY);
    font_system.db_mut().set_sans_serif_family(BUNDLED_SANS_FAMILY);
    font_system
}

fn size_key(font_size: f32) -> u32 {
    (font_size * 4.0).round().max(1.0) as u32
}

impl TextCache {
    fn get(&self, label: &TextLabel) -> Option<&ShapedText> {
        self.by_size.get(&size_key(label.font_size))?.get(label.content.as_ref())
    }

    fn contains(&self, label: &TextLabel) -> bool {
        self.get(label).is_some()
    }

    fn insert(&mut self, label: &TextLabel, shaped: ShapedText) {
        let bucket = self.by_size.entry(size_key(label.font_size)).or_default();
        if bucket.insert(label.content.to_string(), shaped).is_none() {
            self.len += 1;
        }
    }

    fn clear(&mut self) {
        self.by_size.clear();
        self.len = 0;
    }
}

/// GPU side of one effect surface.
pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,

    pub glyphon_font_system: glyphon::FontSystem,
    pub glyphon_viewport: glyphon::Viewport,
    pub glyphon_swash_cache: glyphon::SwashCache,
    pub glyphon_atlas: glyphon::TextAtlas,
    pub glyphon_renderer: glyphon::TextRenderer,
    label_family: LabelFamily,
    text_cache: TextCache,

    pub camera: Camera,
    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    pub camera_uniform: CameraUniform,
    pub camera_needs_update: bool,

    pub line_render_pipeline: wgpu::RenderPipeline,
    pub circle_render_pipeline: wgpu::RenderPipeline,

    circle_instances: Vec<CircleInstance>,
    /// Instances before this index draw under the text, the rest on top.
    overlay_start: u32,
    pub circle_instance_buffer: wgpu::Buffer,
    pub quad_vertex_buffer: wgpu::Buffer,
    pub quad_index_buffer: wgpu::Buffer,

    line_vertices: Vec<LineVertex>,
    pub line_vertex_buffer: wgpu::Buffer,
    clear_color: wgpu::Color,

    pub last_frame_instant: Instant,
    pub frame_count_in_second: u32,
    pub current_fps: u32,
}

impl State {
    pub async fn new(window_arc: Arc<Window>, label_family: LabelFamily) -> anyhow::Result<State> {
        let size = window_arc.inner_size();
        let scale_factor = window_arc.scale_factor();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        // Surface itself is !Send on WASM due to HtmlCanvasElement
        let surface = gpu
            .create_surface(window_arc)
            .map_err(|e| FxError::renderer(format!("create surface: {e}")))?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| FxError::renderer(format!("request adapter: {e}")))?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| FxError::renderer(format!("request device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(FxError::renderer("surface reports no texture formats").into());
        };
        let texture_format = surface_caps.formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!("No sRGB surface format found, falling back to {:?}", first_format);
                first_format
            });

        let needs_shader_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_shader_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // --- Glyphon Initialization ---
        let glyphon_font_system = bundled_font_system();
        let glyphon_swash_cache = glyphon::SwashCache::new();
        let glyphon_cache = glyphon::Cache::new(&device);
        let glyphon_viewport = glyphon::Viewport::new(&device, &glyphon_cache);
        let mut glyphon_atlas = glyphon::TextAtlas::new(&device, &queue, &glyphon_cache, texture_format);
        let glyphon_renderer = glyphon::TextRenderer::new(&mut glyphon_atlas, &device, wgpu::MultisampleState::default(), None);

        let camera = Camera::new(config.width, config.height, scale_factor);
        let camera_uniform = CameraUniform {
            view_proj: camera.build_view_projection_matrix().to_cols_array_2d(),
            needs_srgb_output_conversion: needs_shader_srgb_output_conversion as u32,
            _padding: [0; 3],
        };

        let camera_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }
        );

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }
            ],
            label: Some("Camera Bind Group Layout"),
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                }
            ],
            label: Some("Camera Bind Group"),
        });

        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let circles_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Circles Shader"),
            source: wgpu::ShaderSource::Wgsl(CIRCLES_WGSL.into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
            ],
            immediate_size: 0,
        });

        let line_render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &lines_shader_module,
                entry_point: Some("vs_main"),
                buffers: &[
                    LineVertex::layout(),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &lines_shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        // The y-down projection flips winding, so nothing is culled.
        let circle_render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Circle Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &circles_shader_module,
                entry_point: Some("vs_main"),
                buffers: &[
                    Vertex2D::layout(),
                    CircleInstance::layout(),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &circles_shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        let circle_instance_buffer = create_vertex_buffer::<CircleInstance>(
            &device,
            "Circle Instance Buffer",
            INITIAL_CIRCLE_CAPACITY,
        );

        let quad_vertex_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
                usage: wgpu::BufferUsages::VERTEX,
            }
        );

        let quad_index_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Index Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
                usage: wgpu::BufferUsages::INDEX,
            }
        );

        let line_vertex_buffer = create_vertex_buffer::<LineVertex>(
            &device,
            "Line Vertex Buffer",
            INITIAL_LINE_CAPACITY,
        );

        Ok( Self {
            surface, device, queue, config, is_surface_configured: false,
            glyphon_font_system, glyphon_swash_cache, glyphon_viewport,
            glyphon_atlas, glyphon_renderer, label_family, text_cache: TextCache::default(),
            camera, camera_buffer, camera_bind_group, camera_uniform, camera_needs_update: true,
            line_render_pipeline, circle_render_pipeline,
            circle_instances: Vec::new(), overlay_start: 0,
            circle_instance_buffer, quad_vertex_buffer, quad_index_buffer,
            line_vertices: Vec::new(), line_vertex_buffer,
            clear_color: wgpu::Color::TRANSPARENT,
            last_frame_instant: Instant::now(), frame_count_in_second: 0, current_fps: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {} (scale {})", width, height, scale_factor);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            self.camera.update_viewport(width, height, scale_factor);
            self.camera_needs_update = true;
            self.is_surface_configured = true;
        }
    }

    /// Adds a font and makes it the monospace or sans-serif family, whichever
    /// it is. Shaped text is dropped so labels pick it up.
    pub fn load_font(&mut self, bytes: Vec<u8>) {
        let db = self.glyphon_font_system.db_mut();
        let ids = db.load_font_source(glyphon::fontdb::Source::Binary(Arc::new(bytes)));
        let Some(face) = ids.first().and_then(|id| db.face(*id)) else {
            log::warn!("Font data contained no usable faces");
            return;
        };
        let monospaced = face.monospaced;
        let Some(family) = face.families.first().map(|(name, _)| name.clone()) else {
            log::warn!("Loaded font has no family name");
            return;
        };
        if monospaced {
            db.set_monospace_family(family.as_str());
        } else {
            db.set_sans_serif_family(family.as_str());
        }
        log::info!("Font family `{}` loaded, {} faces available", family, db.len());
        self.text_cache.clear();
    }

    pub fn update(&mut self) -> bool {
        if self.camera_needs_update {
            self.camera_uniform.view_proj = self.camera.build_view_projection_matrix().to_cols_array_2d();
            self.queue.write_buffer(
                &self.camera_buffer,
                0,
                bytemuck::cast_slice(&[self.camera_uniform]),
            );
            self.camera_needs_update = false;
            return true;
        }
        false
    }

    /// Copies a frame's geometry into GPU buffers and shapes any new text.
    pub fn upload(&mut self, batch: &FrameBatch) {
        self.clear_color = batch.clear_color.into_linear_wgpu_color();

        self.circle_instances.clear();
        self.circle_instances.extend_from_slice(&batch.circles);
        self.overlay_start = self.circle_instances.len() as u32;
        self.circle_instances.extend_from_slice(&batch.overlay_circles);
        self.line_vertices.clear();
        self.line_vertices.extend_from_slice(&batch.lines);
        self.update_gpu_buffers();

        if self.text_cache.len > TEXT_CACHE_LIMIT {
            log::debug!("Flushing {} shaped labels", self.text_cache.len);
            self.text_cache.clear();
        }
        for label in &batch.labels {
            if !self.text_cache.contains(label) {
                let shaped = shape_text(&mut self.glyphon_font_system, self.label_family, label);
                self.text_cache.insert(label, shaped);
            }
        }
    }

    fn update_gpu_buffers(&mut self) {
        write_or_grow(
            &self.device,
            &self.queue,
            &mut self.circle_instance_buffer,
            "Circle Instance Buffer (Resized)",
            &self.circle_instances,
        );
        write_or_grow(
            &self.device,
            &self.queue,
            &mut self.line_vertex_buffer,
            "Line Vertex Buffer (Resized)",
            &self.line_vertices,
        );
    }

    pub fn render(&mut self, batch: &FrameBatch) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        let width = self.config.width;
        let height = self.config.height;
        self.glyphon_viewport.update(&self.queue, glyphon::Resolution { width, height });

        // --- FPS Calculation ---
        self.frame_count_in_second += 1;
        let now = Instant::now();
        let elapsed = (now - self.last_frame_instant).as_secs_f32();

        if elapsed >= 1.0 {
            self.current_fps = self.frame_count_in_second;
            self.frame_count_in_second = 0;
            self.last_frame_instant = now;
            log::trace!("{} fps", self.current_fps);
        }

        // --- Prepare Glyphon Text Areas ---
        let scale = self.camera.scale_factor;
        let text_areas = batch.labels.iter().filter_map(|label| {
            let shaped = self.text_cache.get(label)?;
            let [x, y] = label.position;
            let (left, top) = match label.anchor {
                TextAnchor::Baseline => (x, y - shaped.baseline),
                TextAnchor::Center => (x - shaped.width / 2.0, y - shaped.height / 2.0),
                TextAnchor::MiddleLeft => (x, y - shaped.height / 2.0),
            };
            let [r, g, b, a] = label.color;
            let origin = self.camera.logical_to_physical(glam::Vec2::new(left, top));
            Some(glyphon::TextArea {
                buffer: &shaped.buffer,
                left: origin.x,
                top: origin.y,
                scale,
                bounds: glyphon::TextBounds::default(),
                default_color: glyphon::Color::rgba(r, g, b, a),
                custom_glyphs: &[],
            })
        });

        if let Err(e) = self.glyphon_renderer.prepare(
            &self.device,
            &self.queue,
            &mut self.glyphon_font_system,
            &mut self.glyphon_atlas,
            &self.glyphon_viewport,
            text_areas,
            &mut self.glyphon_swash_cache,
        ) {
            log::error!("Text prepare failed: {:?}", e);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            if !self.line_vertices.is_empty() {
                render_pass.set_pipeline(&self.line_render_pipeline);
                render_pass.set_vertex_buffer(0, self.line_vertex_buffer.slice(..));
                render_pass.draw(0..self.line_vertices.len() as u32, 0..1);
            }

            self.draw_circles(&mut render_pass, 0..self.overlay_start);

            if let Err(e) = self.glyphon_renderer.render(&self.glyphon_atlas, &self.glyphon_viewport, &mut render_pass) {
                log::error!("Text render failed: {:?}", e);
            }

            // Glyphon swapped pipeline and bindings; restore ours for the overlay.
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            self.draw_circles(&mut render_pass, self.overlay_start..self.circle_instances.len() as u32);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.glyphon_atlas.trim();

        Ok(())
    }

    fn draw_circles(&self, render_pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        if instances.is_empty() {
            return;
        }
        render_pass.set_pipeline(&self.circle_render_pipeline);
        render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.circle_instance_buffer.slice(..));
        render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..Vertex2D::QUAD_INDICES.len() as u32, 0, instances);
    }
}

fn shape_text(
    font_system: &mut glyphon::FontSystem,
    family: LabelFamily,
    label: &TextLabel,
) -> ShapedText {
    let font_size = label.font_size.max(1.0);
    let line_height = font_size * 1.2;
    let family = match family {
        LabelFamily::Monospace => glyphon::Family::Monospace,
        LabelFamily::SansSerif => glyphon::Family::SansSerif,
    };
    let attrs = glyphon::Attrs::new().family(family);

    let mut buffer = glyphon::Buffer::new(font_system, glyphon::Metrics::new(font_size, line_height));
    buffer.set_size(font_system, None, None);
    buffer.set_text(font_system, &label.content, &attrs, glyphon::Shaping::Advanced, None);
    buffer.shape_until_scroll(font_system, false);

    let (width, baseline) = buffer
        .layout_runs()
        .fold((0.0f32, None), |(width, baseline), run| {
            (width.max(run.line_w), baseline.or(Some(run.line_y)))
        });

    ShapedText {
        buffer,
        width,
        baseline: baseline.unwrap_or(font_size * 0.8),
        height: line_height,
    }
}

fn create_vertex_buffer<T>(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (capacity.max(1) * std::mem::size_of::<T>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Writes `items` into `buffer`, reallocating with headroom when they no
/// longer fit.
fn write_or_grow<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &mut wgpu::Buffer,
    label: &str,
    items: &[T],
) {
    if items.is_empty() {
        return;
    }
    let data: &[u8] = bytemuck::cast_slice(items);
    if buffer.size() < data.len() as u64 {
        let capacity = items.len().next_power_of_two();
        log::debug!("Growing {} to {} items", label, capacity);
        *buffer = create_vertex_buffer::<T>(device, label, capacity);
    }
    queue.write_buffer(buffer, 0, data);
}
