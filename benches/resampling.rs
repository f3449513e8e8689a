// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ifu_cube_build::context::{PixelCoordSystem, WeightingKind};
use ifu_cube_build::geometry::CubeGeometry;
use ifu_cube_build::kernel::msm::{accumulate, accumulate_parallel};
use ifu_cube_build::kernel::SpaxelGrid;
use ifu_cube_build::mapper::MappedSamples;

fn bench_geometry(naxis1: usize, naxis2: usize, naxis3: usize) -> CubeGeometry {
    let cdelt1 = 0.13;
    let cdelt3 = 0.001;
    CubeGeometry {
        coord_system: PixelCoordSystem::World,
        crval1: 0.0,
        crval2: 0.0,
        crpix1: naxis1 as f64 / 2.0,
        crpix2: naxis2 as f64 / 2.0,
        cdelt1,
        cdelt2: cdelt1,
        naxis1,
        naxis2,
        naxis3,
        xcoord: (0..naxis1).map(|i| (i as f64 - naxis1 as f64 / 2.0) * cdelt1).collect(),
        ycoord: (0..naxis2).map(|i| (i as f64 - naxis2 as f64 / 2.0) * cdelt1).collect(),
        wavelength: (0..naxis3).map(|i| 4.9 + i as f64 * cdelt3).collect(),
        linear_wavelength: true,
        crval3: 4.9,
        crpix3: 1.0,
        cdelt3: Some(cdelt3),
        cdelt3_normal: vec![cdelt3; naxis3],
    }
}

/// A synthetic point cloud spread uniformly across the full cube footprint,
/// the same shape of work one densely-sampled MIRI exposure produces.
fn synthetic_point_cloud(n: usize, geometry: &CubeGeometry) -> MappedSamples {
    let mut samples = MappedSamples::default();
    for i in 0..n {
        let t = i as f64 / n as f64;
        let c1 = geometry.xcoord[0] + t * (geometry.xcoord[geometry.naxis1 - 1] - geometry.xcoord[0]);
        let c2 = geometry.ycoord[0] + (1.0 - t) * (geometry.ycoord[geometry.naxis2 - 1] - geometry.ycoord[0]);
        let wave = geometry.wavelength[0]
            + (t * geometry.naxis3 as f64).fract() * (geometry.wavelength[geometry.naxis3 - 1] - geometry.wavelength[0]);
        samples.coord1.push(c1);
        samples.coord2.push(c2);
        samples.wave.push(wave);
        samples.alpha.push(c1);
        samples.beta.push(c2);
        samples.flux.push(10.0);
        samples.slice_no.push((i % 21) as i32);
        samples.rois.push(0.4);
        samples.roiw.push(0.001);
        samples.weight_power.push(2.0);
        samples.soft_rad.push(0.01);
        samples.scale_rad.push(0.6);
    }
    samples
}

fn bench_msm_serial(c: &mut Criterion) {
    let geometry = bench_geometry(60, 60, 200);
    let samples = synthetic_point_cloud(50_000, &geometry);
    c.bench_function("msm_accumulate_serial_50k_samples", |b| {
        b.iter(|| {
            let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
            accumulate(&mut grid, &geometry, black_box(&samples), WeightingKind::Msm);
            black_box(grid.weight_sum.sum())
        });
    });
}

fn bench_msm_parallel(c: &mut Criterion) {
    let geometry = bench_geometry(60, 60, 200);
    let samples = synthetic_point_cloud(50_000, &geometry);
    c.bench_function("msm_accumulate_parallel_50k_samples", |b| {
        b.iter(|| {
            let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
            accumulate_parallel(&mut grid, &geometry, black_box(&samples), WeightingKind::Msm);
            black_box(grid.weight_sum.sum())
        });
    });
}

fn bench_emsm_serial(c: &mut Criterion) {
    let geometry = bench_geometry(60, 60, 200);
    let samples = synthetic_point_cloud(50_000, &geometry);
    c.bench_function("emsm_accumulate_serial_50k_samples", |b| {
        b.iter(|| {
            let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
            accumulate(&mut grid, &geometry, black_box(&samples), WeightingKind::Emsm);
            black_box(grid.weight_sum.sum())
        });
    });
}

criterion_group!(benches, bench_msm_serial, bench_msm_parallel, bench_emsm_serial);
criterion_main!(benches);
