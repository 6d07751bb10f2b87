//! Windowed pan/zoom presentation loop over the image ring.
//!
//! One textured quad. The current node's image is decoded off-thread,
//! uploaded as a texture, and drawn with a camera transform: fit-to-window
//! scale, wheel zoom anchored at the cursor, middle-drag pan. Left input
//! steps to the previous node, right input to the next; stepping resets the
//! camera. The position indicator lives in the window title.

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

use crate::render::loader::{DecodedImage, LoaderMsg, LoaderReply, spawn_loader};
use crate::ring::NodeId;
use crate::scan::ImageRing;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

const ZOOM_STEP: f32 = 0.1;
const ZOOM_MIN: f32 = 0.1;
const ZOOM_MAX: f32 = 32.0;

/// Run the viewer over `ring` starting at `entry`.
///
/// # Errors
/// Returns an error if the event loop or the rendering backend fails to
/// initialize or submit work.
pub fn run(ring: &ImageRing, entry: NodeId) -> Result<()> {
    let count = ring.len(entry);
    info!(count, "starting viewer");
    let event_loop = EventLoop::new().context("creating event loop")?;

    let (tx_req, rx_req) = xchan::unbounded::<LoaderMsg>();
    let (tx_res, rx_res) = xchan::unbounded::<LoaderReply>();
    spawn_loader(rx_req, tx_res);

    let mut app = App {
        ring,
        cursor: entry,
        pos: 0,
        count,
        window: None,
        gpu: None,
        camera: Camera::home(),
        dragging: false,
        cursor_px: PhysicalPosition::new(0.0, 0.0),
        tx_req,
        rx_res,
    };
    event_loop.run_app(&mut app)?;
    let _ = app.tx_req.send(LoaderMsg::Quit);
    Ok(())
}

/// Step direction through the ring.
#[derive(Clone, Copy)]
enum Step {
    Back,
    Forward,
}

/// Pan/zoom state in normalized device coordinates.
#[derive(Debug, Clone, Copy)]
struct Camera {
    zoom: f32,
    pan: [f32; 2],
}

impl Camera {
    const fn home() -> Self {
        Self {
            zoom: 1.0,
            pan: [0.0, 0.0],
        }
    }

    fn reset(&mut self) {
        *self = Self::home();
    }

    /// Zoom by `steps` wheel notches, keeping the point under `anchor`
    /// (NDC) stationary.
    fn zoom_at(&mut self, anchor: [f32; 2], steps: f32) {
        let target = (self.zoom + steps * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        let ratio = target / self.zoom;
        self.pan = [
            anchor[0] - (anchor[0] - self.pan[0]) * ratio,
            anchor[1] - (anchor[1] - self.pan[1]) * ratio,
        ];
        self.zoom = target;
    }

    fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan[0] += dx;
        self.pan[1] += dy;
    }
}

struct Tex {
    view: wgpu::TextureView,
    w: u32,
    h: u32,
}

struct Gpu {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    vbuf: wgpu::Buffer,

    // one 32-byte uniform to match the WGSL Params block
    params: wgpu::Buffer,
    sampler: wgpu::Sampler,
    tex: Tex,
}

struct App<'a> {
    ring: &'a ImageRing,
    cursor: NodeId,
    pos: usize,
    count: usize,

    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,

    camera: Camera,
    dragging: bool,
    cursor_px: PhysicalPosition<f64>,

    tx_req: xchan::Sender<LoaderMsg>,
    rx_res: xchan::Receiver<LoaderReply>,
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attrs = WindowAttributes::default()
            .with_title("ringview")
            .with_maximized(true);
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        self.window = Some(window.clone());

        self.request_current();
        self.update_title();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");
        let gpu = pollster::block_on(init_gpu(instance, surface, window.inner_size()))
            .expect("GPU init");
        self.gpu = Some(gpu);
        self.push_camera();
    }

    fn window_event(&mut self, el: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(win) = &self.window else { return };
        if win.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => el.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Released {
                    use winit::keyboard::{KeyCode, PhysicalKey};
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) => el.exit(),
                        PhysicalKey::Code(KeyCode::ArrowLeft) => self.step(Step::Back),
                        PhysicalKey::Code(KeyCode::ArrowRight) => self.step(Step::Forward),
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match (state, button) {
                (ElementState::Pressed, MouseButton::Left) => self.step(Step::Back),
                (ElementState::Pressed, MouseButton::Right) => self.step(Step::Forward),
                (ElementState::Pressed, MouseButton::Middle) => self.dragging = true,
                (ElementState::Released, MouseButton::Middle) => self.dragging = false,
                _ => {}
            },
            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging {
                    if let Some(gpu) = &self.gpu {
                        let w = gpu.config.width.max(1) as f32;
                        let h = gpu.config.height.max(1) as f32;
                        let dx = (position.x - self.cursor_px.x) as f32 * 2.0 / w;
                        let dy = (self.cursor_px.y - position.y) as f32 * 2.0 / h;
                        self.camera.pan_by(dx, dy);
                    }
                    self.cursor_px = position;
                    self.push_camera();
                } else {
                    self.cursor_px = position;
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 40.0) as f32,
                };
                if steps != 0.0 {
                    let anchor = self.cursor_ndc();
                    self.camera.zoom_at(anchor, steps);
                    self.push_camera();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gpu) = &mut self.gpu
                    && width > 0
                    && height > 0
                {
                    gpu.config.width = width;
                    gpu.config.height = height;
                    gpu.surface.configure(&gpu.device, &gpu.config);
                }
                self.push_camera();
            }
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _el: &ActiveEventLoop) {
        // receive decoded images (non-blocking)
        while let Ok(reply) = self.rx_res.try_recv() {
            match reply {
                LoaderReply::Ready(img) => self.install(img),
                // decode errors keep the last good texture; the ring node
                // stays untouched
                LoaderReply::Failed(_) => {}
            }
        }
        if let Some(win) = &self.window {
            win.request_redraw();
        }
    }
}

impl App<'_> {
    /// Queue a decode of the node under the cursor.
    fn request_current(&self) {
        match self.ring.get(self.cursor) {
            Ok(path) => {
                let _ = self.tx_req.send(LoaderMsg::Decode(path.clone()));
            }
            Err(err) => warn!(error = %err, "ring cursor is not live"),
        }
    }

    fn step(&mut self, dir: Step) {
        let moved = match dir {
            Step::Back => self.ring.prev(self.cursor),
            Step::Forward => self.ring.next(self.cursor),
        };
        let Ok(next) = moved else { return };
        self.cursor = next;
        self.pos = match dir {
            Step::Back => (self.pos + self.count - 1) % self.count,
            Step::Forward => (self.pos + 1) % self.count,
        };
        self.camera.reset();
        self.push_camera();
        self.update_title();
        self.request_current();
    }

    fn update_title(&self) {
        if let (Some(win), Ok(path)) = (&self.window, self.ring.get(self.cursor)) {
            win.set_title(&format!(
                "ringview \u{2014} {}/{} \u{2014} {}",
                self.pos + 1,
                self.count,
                path.display()
            ));
        }
    }

    /// Cursor position in normalized device coordinates.
    fn cursor_ndc(&self) -> [f32; 2] {
        let Some(gpu) = &self.gpu else {
            return [0.0, 0.0];
        };
        let w = gpu.config.width.max(1) as f32;
        let h = gpu.config.height.max(1) as f32;
        [
            (self.cursor_px.x as f32 / w) * 2.0 - 1.0,
            1.0 - (self.cursor_px.y as f32 / h) * 2.0,
        ]
    }

    /// Write the fit scale and camera into the uniform buffer.
    fn push_camera(&self) {
        let Some(gpu) = &self.gpu else { return };
        let fit = fit_scale(gpu.config.width, gpu.config.height, gpu.tex.w, gpu.tex.h);
        let block: [f32; 8] = [
            fit[0],
            fit[1],
            self.camera.zoom,
            0.0,
            self.camera.pan[0],
            self.camera.pan[1],
            0.0,
            0.0,
        ];
        gpu.queue
            .write_buffer(&gpu.params, 0, bytemuck::bytes_of(&block));
    }

    fn install(&mut self, img: DecodedImage) {
        let Some(gpu) = &mut self.gpu else { return };
        gpu.tex = upload_texture(&gpu.device, &gpu.queue, &img.pixels, img.size.0, img.size.1);
        rebuild_bind_group(gpu);
        debug!(path = %img.path.display(), w = img.size.0, h = img.size.1, "image uploaded");
        self.push_camera();
    }

    fn draw(&self) {
        let Some(gpu) = &self.gpu else { return };
        let Ok(frame) = gpu.surface.get_current_texture() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rpass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_bind_group(0, &gpu.bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.vbuf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

async fn init_gpu(
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    size: PhysicalSize<u32>,
) -> Result<Gpu> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible GPU adapter found")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .unwrap_or(caps.formats[0]);
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    };
    surface.configure(&device, &config);

    // black placeholder until the first decoded frame arrives
    let tex = upload_texture(&device, &queue, &[0, 0, 0, 255], 1, 1);

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("params"),
        size: 32,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/image.wgsl").into()),
    });

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bind_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let bind_group = make_bind_group(&device, &bind_layout, &tex, &sampler, &params);

    let vlayout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipe_layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("pipeline"),
        layout: Some(&pip_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vlayout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Ok(Gpu {
        _instance: instance,
        surface,
        device,
        queue,
        config,
        pipeline,
        bind_layout,
        bind_group,
        vbuf,
        params,
        sampler,
        tex,
    })
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    w: u32,
    h: u32,
) -> Tex {
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("image"),
        size: wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        tex.as_image_copy(),
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
    );
    Tex {
        view: tex.create_view(&wgpu::TextureViewDescriptor::default()),
        w,
        h,
    }
}

fn make_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    tex: &Tex,
    sampler: &wgpu::Sampler,
    params: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&tex.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    })
}

fn rebuild_bind_group(gpu: &mut Gpu) {
    gpu.bind_group = make_bind_group(
        &gpu.device,
        &gpu.bind_layout,
        &gpu.tex,
        &gpu.sampler,
        &gpu.params,
    );
}

/// NDC half-extent of the image letterboxed into the window.
#[allow(clippy::cast_precision_loss)]
fn fit_scale(win_w: u32, win_h: u32, img_w: u32, img_h: u32) -> [f32; 2] {
    let ww = win_w as f32;
    let wh = win_h as f32;
    let iw = img_w as f32;
    let ih = img_h as f32;

    if ww == 0.0 || wh == 0.0 || iw == 0.0 || ih == 0.0 {
        return [1.0, 1.0];
    }

    let s = (ww / iw).min(wh / ih);
    [iw * s / ww, ih * s / wh]
}
