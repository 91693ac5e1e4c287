//! Device acquisition and the per-device state the parallel engine works against.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::kernel::KernelCache;
use crate::core::{Result, SimulationError};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Adapter selection preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

/// Options for acquiring a compute device.
#[derive(Debug, Clone, Default)]
pub struct GpuOptions {
    pub power_preference: PowerPreference,
    /// Prefer a software adapter; useful on CI machines without a GPU.
    pub force_fallback_adapter: bool,
    /// Abandon a pending host mapping after this many milliseconds.
    pub map_timeout_ms: Option<u64>,
}

impl GpuOptions {
    pub fn map_timeout(&self) -> Option<Duration> {
        self.map_timeout_ms.map(Duration::from_millis)
    }
}

/// Capability-checked compute device plus its compiled-kernel cache.
///
/// Engines borrow the context mutably for the whole of a run, so a device
/// never has two dispatches in flight from this crate at once.
#[derive(Debug)]
pub struct GpuContext {
    id: u64,
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    kernels: KernelCache,
    map_timeout: Option<Duration>,
}

impl GpuContext {
    /// Requests an adapter and device with compute capability.
    ///
    /// Fails with [`SimulationError::DeviceUnavailable`] when no adapter is
    /// present, the adapter cannot run compute shaders, or the device
    /// request is refused.
    pub async fn new(options: &GpuOptions) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: options.force_fallback_adapter,
            })
            .await
            .ok_or_else(|| SimulationError::DeviceUnavailable("no GPU adapter found".to_string()))?;

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(SimulationError::DeviceUnavailable(format!(
                "adapter '{}' does not support compute shaders",
                adapter.get_info().name
            )));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gbmsim device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| SimulationError::DeviceUnavailable(format!("device request failed: {e}")))?;

        let adapter_info = adapter.get_info();
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            device_id = id,
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            max_buffer_size = device.limits().max_buffer_size,
            "compute device acquired"
        );

        Ok(Self {
            id,
            limits: device.limits(),
            device,
            queue,
            adapter_info,
            kernels: KernelCache::new(),
            map_timeout: options.map_timeout(),
        })
    }

    /// Blocking variant of [`GpuContext::new`].
    pub fn new_blocking(options: &GpuOptions) -> Result<Self> {
        pollster::block_on(Self::new(options))
    }

    /// Process-unique identifier, used to key compiled kernels.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    #[inline]
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    #[inline]
    pub fn map_timeout(&self) -> Option<Duration> {
        self.map_timeout
    }

    #[inline]
    pub fn kernels(&self) -> &KernelCache {
        &self.kernels
    }

    /// Largest storage buffer the kernel can bind on this device, in bytes.
    pub fn max_storage_bytes(&self) -> u64 {
        self.limits
            .max_buffer_size
            .min(self.limits.max_storage_buffer_binding_size as u64)
    }

    /// Splits the borrow so the kernel cache can be updated while the device is in use.
    pub(crate) fn kernel_cache_and_device(&mut self) -> (&mut KernelCache, &wgpu::Device) {
        (&mut self.kernels, &self.device)
    }
}
