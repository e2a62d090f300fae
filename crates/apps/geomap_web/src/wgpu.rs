use gpu::{DrawItem, DrawList};
use scene::{Geometry, Material, ResourceStore};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// World-space vertices for one frame: a triangle list and a line list.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SceneBatches {
    pub triangles: Vec<ColorVertex>,
    pub lines: Vec<ColorVertex>,
}

fn rgba(material: &Material) -> [f32; 4] {
    [
        material.color.r,
        material.color.g,
        material.color.b,
        material.opacity.clamp(0.0, 1.0),
    ]
}

/// Flattens a draw list into vertex batches, keeping its order within each batch.
///
/// Fully transparent items are dropped; textures are not sampled by this backend.
pub fn build_batches(list: &DrawList, resources: &ResourceStore) -> SceneBatches {
    let mut batches = SceneBatches::default();
    for item in &list.items {
        let Some(material) = resources.material(item.material()) else {
            continue;
        };
        if material.opacity <= 0.0 {
            continue;
        }
        let color = rgba(material);

        match item {
            DrawItem::Triangles {
                transform,
                geometry,
                start,
                count,
                ..
            } => {
                let Some(mesh) = resources.geometry(*geometry).and_then(Geometry::as_mesh) else {
                    continue;
                };
                let start = *start as usize;
                let end = (start + *count as usize).min(mesh.indices.len());
                for &index in mesh.indices.get(start..end).unwrap_or_default() {
                    let Some(p) = mesh.positions.get(index as usize) else {
                        continue;
                    };
                    let p = transform.apply(*p);
                    batches.triangles.push(ColorVertex {
                        position: [p.x as f32, p.y as f32, p.z as f32],
                        color,
                    });
                }
            }
            DrawItem::Lines {
                transform,
                geometry,
                ..
            } => {
                let Some(Geometry::Lines(lines)) = resources.geometry(*geometry) else {
                    continue;
                };
                for strip in &lines.strips {
                    for pair in strip.windows(2) {
                        for p in pair {
                            let p = transform.apply(*p);
                            batches.lines.push(ColorVertex {
                                position: [p.x as f32, p.y as f32, p.z as f32],
                                color,
                            });
                        }
                    }
                }
            }
        }
    }
    batches
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use gpu::{DrawList, RenderError, RenderLayer, RenderView, Renderer, Viewport};
    use std::borrow::Cow;
    use wasm_bindgen::prelude::*;

    use super::{ColorVertex, build_batches};

    const SCENE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VsOut {
    return VsOut(globals.view_proj * vec4<f32>(position, 1.0), color);
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    return fs_in.color;
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
    }

    pub struct WgpuContext {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        canvas: web_sys::HtmlCanvasElement,
        triangle_pipeline: ::wgpu::RenderPipeline,
        line_pipeline: ::wgpu::RenderPipeline,
        uniform_buffer: ::wgpu::Buffer,
        uniform_bind_group: ::wgpu::BindGroup,
        depth_view: ::wgpu::TextureView,
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("geomap-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn create_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        shader: &::wgpu::ShaderModule,
        format: ::wgpu::TextureFormat,
        topology: ::wgpu::PrimitiveTopology,
        label: &str,
    ) -> ::wgpu::RenderPipeline {
        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ColorVertex>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x4,
                            offset: 12,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                // Region materials are double sided.
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: true,
                depth_compare: ::wgpu::CompareFunction::LessEqual,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    pub async fn init_wgpu(canvas: web_sys::HtmlCanvasElement) -> Result<WgpuContext, JsValue> {
        let width = canvas.width();
        let height = canvas.height();

        // `wgpu::Surface` must not outlive its `wgpu::Instance`, so the instance lives for
        // the lifetime of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("geomap-wgpu-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| JsValue::from_str("surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("geomap-scene-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(SCENE_SHADER)),
        });

        let uniform_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("geomap-globals"),
            contents: bytemuck::bytes_of(&Globals {
                view_proj: [[0.0; 4]; 4],
            }),
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("geomap-globals-bgl"),
                entries: &[::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::VERTEX,
                    ty: ::wgpu::BindingType::Buffer {
                        ty: ::wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("geomap-globals-bg"),
            layout: &uniform_bind_group_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("geomap-scene-pipeline-layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            immediate_size: 0,
        });

        let triangle_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            ::wgpu::PrimitiveTopology::TriangleList,
            "geomap-triangle-pipeline",
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            ::wgpu::PrimitiveTopology::LineList,
            "geomap-line-pipeline",
        );

        Ok(WgpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            canvas,
            triangle_pipeline,
            line_pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
        })
    }

    /// Scene-layer renderer drawing the extruded regions, outlines and ground.
    pub struct WgpuRenderer {
        ctx: WgpuContext,
        pixel_ratio: f64,
    }

    impl WgpuRenderer {
        pub fn new(ctx: WgpuContext) -> Self {
            Self {
                ctx,
                pixel_ratio: 1.0,
            }
        }

        fn vertex_buffer(&self, label: &str, vertices: &[ColorVertex]) -> Option<::wgpu::Buffer> {
            if vertices.is_empty() {
                return None;
            }
            Some(
                self.ctx
                    .device
                    .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytemuck::cast_slice(vertices),
                        usage: ::wgpu::BufferUsages::VERTEX,
                    }),
            )
        }
    }

    impl Renderer for WgpuRenderer {
        fn layer(&self) -> RenderLayer {
            RenderLayer::Scene
        }

        fn set_size(&mut self, viewport: Viewport) {
            let width = (viewport.width * self.pixel_ratio).round().max(1.0) as u32;
            let height = (viewport.height * self.pixel_ratio).round().max(1.0) as u32;
            self.ctx.canvas.set_width(width);
            self.ctx.canvas.set_height(height);
            let style = self.ctx.canvas.style();
            let sized = style
                .set_property("width", &format!("{}px", viewport.width))
                .and_then(|()| style.set_property("height", &format!("{}px", viewport.height)));
            if let Err(e) = sized {
                tracing::warn!(error = ?e, "failed to size canvas");
            }

            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_view = create_depth_view(&self.ctx.device, &self.ctx.config);
        }

        fn set_pixel_ratio(&mut self, ratio: f64) {
            self.pixel_ratio = ratio.max(1.0);
        }

        fn render(&mut self, view: &RenderView<'_>) -> Result<(), RenderError> {
            let view_proj = view.camera.view_proj()?.to_f32_cols();
            let list = DrawList::collect(view.graph, view.resources);
            let batches = build_batches(&list, view.resources);

            let frame = self
                .ctx
                .surface
                .get_current_texture()
                .map_err(|e| RenderError::Surface(format!("surface acquire failed: {e}")))?;
            let target = frame
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());

            self.ctx.queue.write_buffer(
                &self.ctx.uniform_buffer,
                0,
                bytemuck::bytes_of(&Globals { view_proj }),
            );
            let triangles = self.vertex_buffer("geomap-triangles", &batches.triangles);
            let lines = self.vertex_buffer("geomap-lines", &batches.lines);

            let mut encoder =
                self.ctx
                    .device
                    .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                        label: Some("geomap-scene-encoder"),
                    });
            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("geomap-scene-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: &target,
                        resolve_target: None,
                        depth_slice: None,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(::wgpu::Color::TRANSPARENT),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });
                rpass.set_bind_group(0, &self.ctx.uniform_bind_group, &[]);

                if let Some(buffer) = &triangles {
                    rpass.set_pipeline(&self.ctx.triangle_pipeline);
                    rpass.set_vertex_buffer(0, buffer.slice(..));
                    rpass.draw(0..batches.triangles.len() as u32, 0..1);
                }
                if let Some(buffer) = &lines {
                    rpass.set_pipeline(&self.ctx.line_pipeline);
                    rpass.set_vertex_buffer(0, buffer.slice(..));
                    rpass.draw(0..batches.lines.len() as u32, 0..1);
                }
            }

            self.ctx.queue.submit(std::iter::once(encoder.finish()));
            frame.present();
            Ok(())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use gpu::{RenderError, RenderLayer, RenderView, Renderer, Viewport};
    use wasm_bindgen::prelude::JsValue;

    pub struct WgpuContext;

    pub async fn init_wgpu(_canvas: web_sys::HtmlCanvasElement) -> Result<WgpuContext, JsValue> {
        Err(JsValue::from_str(
            "wgpu initialization is only available on wasm32 targets",
        ))
    }

    pub struct WgpuRenderer;

    impl WgpuRenderer {
        pub fn new(_ctx: WgpuContext) -> Self {
            Self
        }
    }

    impl Renderer for WgpuRenderer {
        fn layer(&self) -> RenderLayer {
            RenderLayer::Scene
        }

        fn set_size(&mut self, _viewport: Viewport) {}

        fn render(&mut self, _view: &RenderView<'_>) -> Result<(), RenderError> {
            Err(RenderError::Surface(
                "wgpu rendering is only available on wasm32 targets".into(),
            ))
        }
    }
}

pub use imp::{WgpuContext, WgpuRenderer, init_wgpu};
