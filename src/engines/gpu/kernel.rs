//! Compute kernel source, uniform layout, dispatch geometry and the compiled-kernel cache.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::core::{Result, SimulationError, SimulationParameters};
use crate::math::lane_uniform;

/// WGSL source of the per-lane GBM kernel.
pub const KERNEL_SOURCE: &str = include_str!("mc_shader.wgsl");

/// Entry point name inside [`KERNEL_SOURCE`].
pub const KERNEL_ENTRY_POINT: &str = "main";

/// Lanes per workgroup; must match `@workgroup_size` in the shader.
pub const LANE_GROUP_SIZE: u32 = 64;

/// Uniform block matching the WGSL `Params` struct layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuParams {
    pub entry_price: f32,
    pub average_return: f32,
    pub volatility: f32,
    pub days: u32,
    pub path_count: u32,
    pub salt: u32,
    _pad: [u32; 2],
}

impl GpuParams {
    /// Narrows validated parameters to the device representation.
    pub fn from_parameters(params: &SimulationParameters, salt: u32) -> Result<Self> {
        let days = u32::try_from(params.days()).map_err(|_| {
            SimulationError::InvalidParameters(format!(
                "days {} exceeds the 32-bit lane counter",
                params.days()
            ))
        })?;
        let path_count = u32::try_from(params.path_count()).map_err(|_| {
            SimulationError::InvalidParameters(format!(
                "path count {} exceeds the 32-bit lane index",
                params.path_count()
            ))
        })?;

        Ok(Self {
            entry_price: params.entry_price() as f32,
            average_return: params.average_return() as f32,
            volatility: params.volatility() as f32,
            days,
            path_count,
            salt,
            _pad: [0; 2],
        })
    }
}

/// Workgroup grid covering `path_count` lanes.
///
/// Groups are laid out along x up to the device's per-dimension limit and
/// wrap into y beyond it. The kernel flattens `(x, y)` back into a lane
/// index and discards every lane at or past `path_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGeometry {
    pub groups_x: u32,
    pub groups_y: u32,
}

impl DispatchGeometry {
    pub fn for_lanes(path_count: u32, max_groups_per_dimension: u32) -> Result<Self> {
        let groups = path_count.div_ceil(LANE_GROUP_SIZE).max(1);
        let max = max_groups_per_dimension.max(1);
        let groups_x = groups.min(max);
        let groups_y = groups.div_ceil(groups_x);
        if groups_y > max {
            return Err(SimulationError::InvalidParameters(format!(
                "{path_count} lanes need {groups} workgroups, beyond a {max}x{max} grid"
            )));
        }
        Ok(Self { groups_x, groups_y })
    }

    #[inline]
    pub fn group_count(&self) -> u64 {
        self.groups_x as u64 * self.groups_y as u64
    }

    /// Lanes actually launched, including the discarded tail.
    #[inline]
    pub fn scheduled_lanes(&self) -> u64 {
        self.group_count() * LANE_GROUP_SIZE as u64
    }
}

/// Host replay of one lane of the kernel, in `f32` like the device.
///
/// Device results may differ in the last bits where the driver fuses
/// multiply-adds, so comparisons should use a relative tolerance.
pub fn reference_lane_price(params: &GpuParams, lane: u32) -> f32 {
    let dt = 1.0_f32 / 252.0;
    let drift = params.average_return * dt;
    let shock = params.volatility * dt.sqrt();

    let mut price = params.entry_price;
    for step in 0..params.days {
        let r = lane_uniform(params.salt, lane, step);
        price *= 1.0 + drift + shock * (r - 0.5);
    }
    price
}

/// Stable 64-bit fingerprint of a kernel's source text.
pub fn source_hash(source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}

/// Pipeline plus the layout its bind groups are created against.
#[derive(Debug)]
pub struct CompiledKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Compiled pipelines keyed by `(device id, source hash)`.
///
/// Owned by a [`super::GpuContext`], so entries never outlive the device
/// they were compiled for.
#[derive(Debug, Default)]
pub struct KernelCache {
    entries: HashMap<(u64, u64), Arc<CompiledKernel>>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, device_id: u64, source: &str) -> bool {
        self.entries.contains_key(&(device_id, source_hash(source)))
    }

    /// Returns the cached pipeline for `source`, compiling it on first use.
    pub async fn get_or_compile(
        &mut self,
        device_id: u64,
        device: &wgpu::Device,
        source: &str,
    ) -> Result<Arc<CompiledKernel>> {
        let key = (device_id, source_hash(source));
        if let Some(kernel) = self.entries.get(&key) {
            debug!(device_id, source_hash = key.1, "kernel cache hit");
            return Ok(Arc::clone(kernel));
        }

        let kernel = Arc::new(compile_kernel(device, source).await?);
        debug!(device_id, source_hash = key.1, "kernel compiled and cached");
        // Same key always maps to an equivalent pipeline; overwriting is harmless.
        self.entries.insert(key, Arc::clone(&kernel));
        Ok(kernel)
    }
}

/// Builds the compute pipeline, surfacing validation failures as [`SimulationError::KernelCompileError`].
pub async fn compile_kernel(device: &wgpu::Device, source: &str) -> Result<CompiledKernel> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gbm kernel"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("gbm bind group layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
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
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("gbm pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("gbm compute pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader_module,
        entry_point: Some(KERNEL_ENTRY_POINT),
        compilation_options: Default::default(),
        cache: None,
    });

    if let Some(err) = device.pop_error_scope().await {
        return Err(SimulationError::KernelCompileError(err.to_string()));
    }

    Ok(CompiledKernel {
        pipeline,
        bind_group_layout,
    })
}
