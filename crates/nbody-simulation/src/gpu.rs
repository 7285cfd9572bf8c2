//! Accelerator-side force accumulation
//!
//! The kernel walks the body buffer one tile at a time through workgroup
//! memory. It recomputes both directions of every pair and writes each
//! particle's net force exactly once, so no mirroring happens on the device.

use crate::accumulate::{check_table, ForceAccumulator, ForceTable};
use crate::params::GpuParams;
use crate::SimulationError;
use glam::Vec3;
use nbody_physics::{ForceLaw, ParticleStore, TILE_SIZE_MAX};
use std::sync::mpsc;
use wgpu::util::DeviceExt;

const FORCE_SHADER: &str = include_str!("shaders/forces.wgsl");

/// Bytes per body and per force cell (one `vec4<f32>`)
const CELL_SIZE: u64 = 16;

/// Device and queue held for the lifetime of a run
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
}

impl GpuContext {
    /// Acquire a high-performance adapter without a surface.
    pub fn new() -> Result<Self, SimulationError> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self, SimulationError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SimulationError::Device(e.to_string()))?;

        let adapter_name = adapter.get_info().name;
        log::info!("✓ Using GPU: {}", adapter_name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("N-Body Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| SimulationError::Device(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter_name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Kernel source with the tile size baked in as a WGSL constant
pub fn force_shader_source(tile_size: u32) -> String {
    format!("const TILE_SIZE: u32 = {tile_size}u;\n{FORCE_SHADER}")
}

/// Tiled O(N²) reduction on the accelerator
pub struct GpuForceReducer {
    context: GpuContext,
    particle_count: u32,
    tile_size: u32,

    body_buffer: wgpu::Buffer,
    force_buffer: wgpu::Buffer,
    _params_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,

    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,

    bodies: Vec<[f32; 4]>,
}

impl GpuForceReducer {
    pub fn new(
        context: GpuContext,
        particle_count: usize,
        law: ForceLaw,
        tile_size: u32,
    ) -> Result<Self, SimulationError> {
        if !(1..=TILE_SIZE_MAX).contains(&tile_size) {
            return Err(SimulationError::config(format!(
                "tile_size must be in 1..={TILE_SIZE_MAX}, got {tile_size}"
            )));
        }
        let count = u32::try_from(particle_count)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                SimulationError::config(format!("cannot reduce {particle_count} particles on the GPU"))
            })?;

        let device = context.device();
        let buffer_size = particle_count as u64 * CELL_SIZE;

        let body_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Body Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let force_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Force Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params = GpuParams::new(count, law);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Force Params Buffer"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        // Reused every tick
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Force Staging Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Force Shader"),
            source: wgpu::ShaderSource::Wgsl(force_shader_source(tile_size).into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Force Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        log::info!("Creating force pipeline (tile size {})...", tile_size);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Force Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Force Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Force Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: body_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: force_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            context,
            particle_count: count,
            tile_size,
            body_buffer,
            force_buffer,
            _params_buffer: params_buffer,
            staging_buffer,
            pipeline,
            bind_group,
            bodies: Vec::with_capacity(particle_count),
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn workgroup_count(&self) -> u32 {
        self.particle_count.div_ceil(self.tile_size)
    }

    fn upload(&mut self, store: &ParticleStore) {
        self.bodies.clear();
        self.bodies.extend(store.particles().iter().map(|p| {
            let [x, y, z] = p.position;
            [x, y, z, p.mass()]
        }));
        self.context
            .queue()
            .write_buffer(&self.body_buffer, 0, bytemuck::cast_slice(&self.bodies));
    }

    fn dispatch(&self) {
        let device = self.context.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Force Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Force Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &self.bind_group, &[]);
            compute_pass.dispatch_workgroups(self.workgroup_count(), 1, 1);
        }

        encoder.copy_buffer_to_buffer(
            &self.force_buffer,
            0,
            &self.staging_buffer,
            0,
            self.particle_count as u64 * CELL_SIZE,
        );

        self.context.queue().submit(std::iter::once(encoder.finish()));
    }

    fn read_back(&self, forces: &mut ForceTable) -> Result<(), SimulationError> {
        let slice = self.staging_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.context
            .device()
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| SimulationError::Readback(e.to_string()))?;

        rx.recv()
            .map_err(|_| SimulationError::Readback("map callback never ran".into()))?
            .map_err(|e| SimulationError::Readback(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            let cells: &[[f32; 4]] = bytemuck::cast_slice(&data);
            for (net, cell) in forces.as_mut_slice().iter_mut().zip(cells) {
                *net = Vec3::new(cell[0], cell[1], cell[2]);
            }
        }
        self.staging_buffer.unmap();
        Ok(())
    }
}

impl ForceAccumulator for GpuForceReducer {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn accumulate(
        &mut self,
        store: &ParticleStore,
        forces: &mut ForceTable,
    ) -> Result<(), SimulationError> {
        check_table(store, forces)?;
        if store.len() != self.particle_count as usize {
            return Err(SimulationError::config(format!(
                "force buffers sized for {} particles, store holds {}",
                self.particle_count,
                store.len()
            )));
        }

        self.upload(store);
        self.dispatch();
        self.read_back(forces)
    }
}
