use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use revdelta::diff::{self, DiffScript, TichyDiff};
use revdelta::fingerprint::{Fingerprint, Polynomial, WindowedRabinFingerprint};
use revdelta::revlog::{Policy, Revlog};
use std::fs;
use std::path::Path;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn write_ratio_snapshot() {
    let base = gen_data(1024 * 1024, 123);
    let mut csv = String::from("stride,script_bytes,target_bytes,ratio\n");
    for stride in [64usize, 256, 1024, 4096, 16384] {
        let target = mutate(&base, stride);
        let packed = diff::diff(&base, &target).pack_to_vec();
        let ratio = packed.len() as f64 / target.len() as f64;
        csv.push_str(&format!(
            "{stride},{},{},{}\n",
            packed.len(),
            target.len(),
            ratio
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_diff_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("diff_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 4 * 1024 * 1024] {
        let base = gen_data(size, 1);
        let target = mutate(&base, 1024);
        let mut engine = TichyDiff::new();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let script = engine.diff(black_box(&base), black_box(&target));
                black_box(script);
            });
        });
    }
    g.finish();
}

fn bench_apply_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("apply_speed");
    for size in [64 * 1024usize, 1024 * 1024, 4 * 1024 * 1024] {
        let base = gen_data(size, 2);
        let target = mutate(&base, 2048);
        let packed = diff::diff(&base, &target).pack_to_vec();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let script = DiffScript::unpack(black_box(&packed)).unwrap();
                let out = diff::apply(black_box(&base), &script).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_ratio_vs_stride(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("script_ratio_vs_stride");
    let base = gen_data(1024 * 1024, 3);
    for stride in [64usize, 1024, 16384] {
        let target = mutate(&base, stride);
        g.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, _| {
            b.iter(|| {
                let packed = diff::diff(&base, &target).pack_to_vec();
                let ratio = packed.len() as f64 / target.len() as f64;
                black_box(ratio);
            });
        });
    }
    g.finish();
}

fn bench_rolling_fingerprint(c: &mut Criterion) {
    let mut g = c.benchmark_group("rolling_fingerprint");
    let data = gen_data(1024 * 1024, 4);
    g.throughput(Throughput::Bytes(data.len() as u64));
    for window in [16usize, 64, 256] {
        let poly = Polynomial::from_u64(diff::RABIN_POLYNOMIAL);
        g.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, window| {
            let mut fp = WindowedRabinFingerprint::new(poly.clone(), *window);
            b.iter(|| {
                fp.reset();
                fp.push_bytes(black_box(&data));
                black_box(fp.value());
            });
        });
    }
    g.finish();
}

fn bench_revlog(c: &mut Criterion) {
    let mut g = c.benchmark_group("revlog");
    let base = gen_data(256 * 1024, 5);
    let versions: Vec<Vec<u8>> = (0..16)
        .map(|i| {
            let mut v = mutate(&base, 4096 + i * 97);
            v.extend_from_slice(format!("revision {i}").as_bytes());
            v
        })
        .collect();

    g.bench_function("add_16_versions", |b| {
        b.iter(|| {
            let mut log = Revlog::in_memory();
            for v in &versions {
                black_box(log.add(v).unwrap());
            }
        });
    });

    for depth in [0usize, 4, 10] {
        let mut log = Revlog::in_memory();
        log.set_policy(Policy {
            max_delta_depth: depth,
            ..Policy::default()
        });
        let positions: Vec<_> = versions.iter().map(|v| log.add(v).unwrap()).collect();
        let Some(&position) = positions.last() else {
            continue;
        };
        g.bench_with_input(BenchmarkId::new("get_depth", depth), &depth, |b, _| {
            b.iter(|| black_box(log.get(position).unwrap()));
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_diff_speed,
    bench_apply_speed,
    bench_ratio_vs_stride,
    bench_rolling_fingerprint,
    bench_revlog
);
criterion_main!(benches);
