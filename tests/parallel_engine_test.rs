//! Device-backed tests. Each test returns early when no compute adapter is present.

use gbmsim::core::{SimulationError, SimulationParameters};
use gbmsim::engines::gpu::{
    GpuContext, GpuOptions, GpuParams, LANE_GROUP_SIZE, ParallelSimulationEngine, PointCloud,
    ResultRenderer, reference_lane_price,
};

fn gpu_context() -> Option<GpuContext> {
    match GpuContext::new_blocking(&GpuOptions::default()) {
        Ok(ctx) => Some(ctx),
        Err(SimulationError::DeviceUnavailable(reason)) => {
            eprintln!("skipping GPU test: {reason}");
            None
        }
        Err(e) => panic!("unexpected device error: {e}"),
    }
}

fn assert_close(device: f32, host: f32, lane: usize) {
    let rel = ((device - host) / host.abs().max(1.0e-6)).abs();
    assert!(
        rel <= 1.0e-3,
        "lane {lane}: device={device} host={host} rel={rel}"
    );
}

#[test]
fn reference_scenario_returns_one_finite_price_per_lane() {
    let Some(mut ctx) = gpu_context() else { return };
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 10_000).unwrap();
    let run = ParallelSimulationEngine::new()
        .run_blocking(&mut ctx, &params)
        .unwrap();

    assert_eq!(run.prices.len(), 10_000);
    assert!(run.prices.as_slice().iter().all(|p| p.is_finite() && *p > 0.0));
    assert!(run.elapsed_ms >= 0.0);
    assert_eq!(run.geometry.group_count(), 157);
}

#[test]
fn single_lane_single_day() {
    let Some(mut ctx) = gpu_context() else { return };
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 1, 1).unwrap();
    let engine = ParallelSimulationEngine::new();
    let run = engine.run_blocking(&mut ctx, &params).unwrap();

    assert_eq!(run.prices.len(), 1);
    let host = reference_lane_price(&GpuParams::from_parameters(&params, engine.salt).unwrap(), 0);
    assert_close(run.prices.as_slice()[0], host, 0);
}

#[test]
fn partial_last_group_is_guarded_and_matches_host_replay() {
    let Some(mut ctx) = gpu_context() else { return };
    let engine = ParallelSimulationEngine::new().with_salt(11);

    for path_count in [63usize, 64, 65, 129] {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 40, path_count).unwrap();
        let run = engine.run_blocking(&mut ctx, &params).unwrap();
        assert_eq!(run.prices.len(), path_count);
        assert_eq!(
            run.geometry.group_count(),
            path_count.div_ceil(LANE_GROUP_SIZE as usize) as u64
        );

        let gpu_params = GpuParams::from_parameters(&params, engine.salt).unwrap();
        for (lane, &price) in run.prices.as_slice().iter().enumerate() {
            assert_close(price, reference_lane_price(&gpu_params, lane as u32), lane);
        }
    }
}

#[test]
fn repeated_runs_are_identical_and_reuse_the_kernel() {
    let Some(mut ctx) = gpu_context() else { return };
    let engine = ParallelSimulationEngine::new();
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 1_000).unwrap();

    let first = engine.run_blocking(&mut ctx, &params).unwrap();
    assert_eq!(ctx.kernels().len(), 1);
    let second = engine.run_blocking(&mut ctx, &params).unwrap();
    assert_eq!(ctx.kernels().len(), 1);
    assert!(ctx.kernels().contains(ctx.id(), engine.kernel_source()));

    assert_eq!(first.prices, second.prices);
}

#[test]
fn different_salts_draw_different_prices() {
    let Some(mut ctx) = gpu_context() else { return };
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 20, 256).unwrap();
    let a = ParallelSimulationEngine::new()
        .with_salt(1)
        .run_blocking(&mut ctx, &params)
        .unwrap();
    let b = ParallelSimulationEngine::new()
        .with_salt(2)
        .run_blocking(&mut ctx, &params)
        .unwrap();
    assert_ne!(a.prices, b.prices);
}

#[test]
fn malformed_kernel_reports_compile_error() {
    let Some(mut ctx) = gpu_context() else { return };
    let engine = ParallelSimulationEngine::new().with_kernel_source("@compute fn main( {");
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 1, 1).unwrap();

    let err = engine.run_blocking(&mut ctx, &params).unwrap_err();
    assert!(matches!(err, SimulationError::KernelCompileError(_)), "{err}");
    assert!(ctx.kernels().is_empty());
}

#[test]
fn oversized_output_is_an_allocation_error() {
    let Some(mut ctx) = gpu_context() else { return };
    let lanes = ctx.max_storage_bytes() / 4 + 1;
    let Ok(path_count) = u32::try_from(lanes) else {
        return;
    };
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 1, path_count as usize).unwrap();

    let err = ParallelSimulationEngine::new()
        .run_blocking(&mut ctx, &params)
        .unwrap_err();
    assert!(
        matches!(
            err,
            SimulationError::AllocationError { .. } | SimulationError::InvalidParameters(_)
        ),
        "{err}"
    );
}

#[test]
fn rendered_points_cover_every_lane() {
    let Some(mut ctx) = gpu_context() else { return };
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 500).unwrap();
    let run = ParallelSimulationEngine::new()
        .run_blocking(&mut ctx, &params)
        .unwrap();

    let mut cloud = PointCloud::default();
    assert_eq!(cloud.render(&run.prices, params.path_count()), 500);
    let points = cloud.points();
    assert_eq!(points[0].x, -1.0);
    assert!(points.iter().all(|p| (-1.0..1.0).contains(&p.x)));
}

#[test]
fn wrapped_grid_addresses_every_lane_once() {
    let Some(mut ctx) = gpu_context() else { return };
    let engine = ParallelSimulationEngine::new()
        .with_salt(5)
        .with_max_groups_per_dimension(4);

    // 14 groups on a 4-wide grid: three full rows plus a half-empty fourth.
    let path_count = 13 * LANE_GROUP_SIZE as usize + 7;
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 3, path_count).unwrap();
    let run = engine.run_blocking(&mut ctx, &params).unwrap();

    assert_eq!((run.geometry.groups_x, run.geometry.groups_y), (4, 4));
    assert_eq!(run.prices.len(), path_count);

    let gpu_params = GpuParams::from_parameters(&params, engine.salt).unwrap();
    for (lane, &price) in run.prices.as_slice().iter().enumerate() {
        assert_close(price, reference_lane_price(&gpu_params, lane as u32), lane);
    }
}

#[test]
fn lanes_past_one_grid_row_wrap_at_the_device_limit() {
    let Some(mut ctx) = gpu_context() else { return };
    let max_groups = ctx.limits().max_compute_workgroups_per_dimension;
    let path_count = max_groups as usize * LANE_GROUP_SIZE as usize + 1;
    if (path_count as u64) * 4 > ctx.max_storage_bytes() {
        eprintln!("skipping: device cannot hold {path_count} lanes");
        return;
    }

    let engine = ParallelSimulationEngine::new();
    let params = SimulationParameters::new(100.0, 0.1, 0.2, 1, path_count).unwrap();
    let run = engine.run_blocking(&mut ctx, &params).unwrap();

    assert_eq!((run.geometry.groups_x, run.geometry.groups_y), (max_groups, 2));
    assert_eq!(run.prices.len(), path_count);

    let gpu_params = GpuParams::from_parameters(&params, engine.salt).unwrap();
    let prices = run.prices.as_slice();
    for lane in (0..4).chain(path_count - 66..path_count) {
        assert_close(prices[lane], reference_lane_price(&gpu_params, lane as u32), lane);
    }
}

#[test]
fn adapter_is_identified() {
    let Some(ctx) = gpu_context() else { return };
    assert_ne!(ctx.adapter_info().backend, wgpu::Backend::Empty);
}
