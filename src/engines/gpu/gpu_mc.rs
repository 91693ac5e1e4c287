//! Parallel Monte Carlo engine using wgpu compute shaders.

use std::borrow::Cow;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::kernel::{DispatchGeometry, GpuParams, KERNEL_SOURCE};
use crate::core::{FinalPriceBuffer, Result, SimulationError, SimulationParameters};

/// Pause between device polls while a bounded mapping is pending.
const MAP_POLL_INTERVAL: Duration = Duration::from_micros(250);

/// Output of one parallel run.
#[derive(Debug, Clone)]
pub struct ParallelRun {
    pub prices: FinalPriceBuffer,
    /// Wall-clock time from buffer allocation through host readback, in milliseconds.
    pub elapsed_ms: f64,
    pub geometry: DispatchGeometry,
}

/// GPU simulation engine: one lane per path, terminal prices only.
///
/// Each lane walks `days` steps of `price *= 1 + mu dt + sigma sqrt(dt) (u - 1/2)`
/// where `u` is a hash of `(salt, lane, step)`. Results are therefore
/// reproducible for a given salt, and differ numerically from the scalar
/// backend by construction.
#[derive(Debug, Clone)]
pub struct ParallelSimulationEngine {
    pub salt: u32,
    /// Caps workgroups per grid dimension below the device limit.
    pub max_groups_per_dimension: Option<u32>,
    kernel_source: Cow<'static, str>,
}

impl Default for ParallelSimulationEngine {
    fn default() -> Self {
        Self {
            salt: 0,
            max_groups_per_dimension: None,
            kernel_source: Cow::Borrowed(KERNEL_SOURCE),
        }
    }
}

impl ParallelSimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mixes `salt` into every lane's hash to obtain an independent set of draws.
    pub fn with_salt(mut self, salt: u32) -> Self {
        self.salt = salt;
        self
    }

    /// Wraps the grid into a second dimension once `max` workgroups are used in x.
    pub fn with_max_groups_per_dimension(mut self, max: u32) -> Self {
        self.max_groups_per_dimension = Some(max);
        self
    }

    /// Replaces the kernel; it must expose the same bindings and entry point.
    pub fn with_kernel_source(mut self, source: impl Into<Cow<'static, str>>) -> Self {
        self.kernel_source = source.into();
        self
    }

    pub fn kernel_source(&self) -> &str {
        &self.kernel_source
    }

    /// Simulates `path_count` lanes on the device and reads their terminal prices back.
    pub async fn run(
        &self,
        ctx: &mut GpuContext,
        params: &SimulationParameters,
    ) -> Result<ParallelRun> {
        let gpu_params = GpuParams::from_parameters(params, self.salt)?;
        let device_max = ctx.limits().max_compute_workgroups_per_dimension;
        let max_groups = self
            .max_groups_per_dimension
            .map_or(device_max, |cap| cap.min(device_max));
        let geometry = DispatchGeometry::for_lanes(gpu_params.path_count, max_groups)?;

        let start = Instant::now();

        let output_size = gpu_params.path_count as u64 * std::mem::size_of::<f32>() as u64;
        let limit = ctx.max_storage_bytes();
        if output_size > limit {
            return Err(SimulationError::AllocationError {
                requested: output_size,
                limit,
            });
        }

        let (output_buffer, staging_buffer) = allocate_buffers(ctx, output_size, limit).await?;

        let param_buffer = ctx
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("gbm params"),
                contents: bytemuck::bytes_of(&gpu_params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let device_id = ctx.id();
        let kernel = {
            let (cache, device) = ctx.kernel_cache_and_device();
            cache
                .get_or_compile(device_id, device, &self.kernel_source)
                .await?
        };

        let device = ctx.device();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gbm bind group"),
            layout: &kernel.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: param_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gbm encoder"),
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("gbm pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(geometry.groups_x, geometry.groups_y, 1);
        }

        // Ordered after the dispatch by queue submission order.
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        ctx.queue().submit(std::iter::once(encoder.finish()));

        debug!(
            path_count = gpu_params.path_count,
            days = gpu_params.days,
            groups_x = geometry.groups_x,
            groups_y = geometry.groups_y,
            "dispatch submitted"
        );

        let prices = read_back(device, &staging_buffer, ctx.map_timeout())?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1.0e3;

        debug!(path_count = prices.len(), elapsed_ms, "parallel simulation finished");

        Ok(ParallelRun {
            prices: FinalPriceBuffer::from_vec(prices),
            elapsed_ms,
            geometry,
        })
    }

    /// Blocking variant of [`ParallelSimulationEngine::run`].
    pub fn run_blocking(
        &self,
        ctx: &mut GpuContext,
        params: &SimulationParameters,
    ) -> Result<ParallelRun> {
        pollster::block_on(self.run(ctx, params))
    }
}

/// Creates the lane output buffer and its host-readable twin, both sized without slack.
async fn allocate_buffers(
    ctx: &GpuContext,
    size: u64,
    limit: u64,
) -> Result<(wgpu::Buffer, wgpu::Buffer)> {
    let device = ctx.device();
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let output = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lane results"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lane results staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let validation = device.pop_error_scope().await;
    let oom = device.pop_error_scope().await;
    if let Some(err) = validation.or(oom) {
        warn!(requested = size, limit, error = %err, "device rejected buffer allocation");
        return Err(SimulationError::AllocationError {
            requested: size,
            limit,
        });
    }

    Ok((output, staging))
}

/// Maps `staging` for reading and copies it into a host vector.
///
/// Waits for the whole mapping; with a timeout the pending mapping is
/// abandoned and reported as [`SimulationError::MapError`].
fn read_back(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    timeout: Option<Duration>,
) -> Result<Vec<f32>> {
    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let mapped = match timeout {
        None => {
            let _ = device.poll(wgpu::Maintain::Wait);
            receiver
                .recv()
                .map_err(|e| SimulationError::MapError(format!("mapping callback dropped: {e}")))?
        }
        Some(timeout) => wait_for_mapping(device, &receiver, timeout)?,
    };
    mapped.map_err(|e| SimulationError::MapError(e.to_string()))?;

    let data = slice.get_mapped_range();
    let prices: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    Ok(prices)
}

fn wait_for_mapping(
    device: &wgpu::Device,
    receiver: &mpsc::Receiver<std::result::Result<(), wgpu::BufferAsyncError>>,
    timeout: Duration,
) -> Result<std::result::Result<(), wgpu::BufferAsyncError>> {
    let deadline = Instant::now() + timeout;
    loop {
        let _ = device.poll(wgpu::Maintain::Poll);
        match receiver.try_recv() {
            Ok(result) => return Ok(result),
            Err(mpsc::TryRecvError::Disconnected) => {
                return Err(SimulationError::MapError(
                    "mapping callback dropped".to_string(),
                ));
            }
            Err(mpsc::TryRecvError::Empty) => {}
        }
        if Instant::now() >= deadline {
            warn!(timeout_ms = timeout.as_millis() as u64, "abandoning pending buffer mapping");
            return Err(SimulationError::MapError(format!(
                "mapping not completed within {} ms",
                timeout.as_millis()
            )));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        std::thread::sleep(MAP_POLL_INTERVAL.min(remaining));
    }
}
