//! GPU-accelerated Monte Carlo simulation via wgpu compute shaders.
//!
//! Every path maps to one lane; lanes are grouped 64 to a workgroup and
//! only the terminal price of each lane leaves the device. Runs on any
//! Vulkan/Metal/DX12/GL backend wgpu can open with compute support.

mod context;
mod gpu_mc;
pub mod kernel;
pub mod render;

pub use context::{GpuContext, GpuOptions, PowerPreference};
pub use gpu_mc::{ParallelRun, ParallelSimulationEngine};
pub use kernel::{
    DispatchGeometry, GpuParams, KERNEL_SOURCE, KernelCache, LANE_GROUP_SIZE,
    reference_lane_price,
};
pub use render::{DEFAULT_PRICE_DIVISOR, PlotPoint, PointCloud, ResultRenderer, project_points};
