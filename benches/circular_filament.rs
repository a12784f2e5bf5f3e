#![allow(clippy::all)] // Clippy will attempt to remove black_box() internals

use criterion::*;
use poloidal_greens::physics::circular_filament::{
    flux_circular_filament, flux_circular_filament_par, greens_psi,
};
use std::time::Duration;

fn bench_greens_psi(c: &mut Criterion) {
    let mut group = c.benchmark_group("Circular Filament Green's Function");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    // Near-coincident, moderate and far-field elliptic parameters
    for (name, r, z) in [("near", 1.0 + 1e-6, 0.0), ("mid", 1.6, 0.4), ("far", 40.0, 25.0)] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(greens_psi(black_box(1.0), black_box(0.0), black_box(r), black_box(z))))
        });
    }

    group.finish();
}

fn bench_flux_circular_filament(c: &mut Criterion) {
    let mut group = c.benchmark_group("Poloidal Flux of Circular Filaments");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    // Examine logspace with fixed total throughput
    for nfac in [1, 10, 100, 1000].iter() {
        for nfils in (0_usize..=4).map(|i| 10_usize.pow(i as u32)) {
            // Filament inputs
            let nfils = nfils * nfac;
            let rfil = vec![1.0 / 7.0_f64; nfils];
            let zfil = vec![1.0 / 11.0_f64; nfils];
            let current = vec![0.5_f64; nfils];

            // Observation points
            let nobs = 1000 / nfac;
            let robs = vec![2.0 / 7.0_f64; nobs];
            let zobs = vec![2.0 / 11.0_f64; nobs];

            let mut out = vec![0.0_f64; nobs];

            let ntot = nobs * nfils;
            group.throughput(Throughput::Elements(ntot as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("Serial\n{} Obs. Point(s)", nobs), ntot),
                &ntot,
                |b, &_| {
                    b.iter(|| {
                        black_box(
                            flux_circular_filament(&current, &rfil, &zfil, &robs, &zobs, &mut out)
                                .unwrap(),
                        )
                    });
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("Parallel\n{} Obs. Point(s)", nobs), ntot),
                &ntot,
                |b, &_| {
                    b.iter(|| {
                        black_box(
                            flux_circular_filament_par(
                                &current, &rfil, &zfil, &robs, &zobs, &mut out,
                            )
                            .unwrap(),
                        )
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(group_greens, bench_greens_psi);
criterion_group!(group_flux, bench_flux_circular_filament);
criterion_main!(group_greens, group_flux);
