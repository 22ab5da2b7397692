/// 绑定层调用开销基准测试
///
/// 测量方法分发、句柄分配与释放，以及经由 QuickJS 的完整调用路径

use std::hint::black_box;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use movie_bindings::bindings::{BindingHost, ClassRegistry, ScriptValue, TypeTag};
use movie_bindings::config::BindingConfig;
use movie_bindings::scripting::{build_host, build_js_adapter, MOVIE_CLASS, MOVIE_TYPE};

const ACCUMULATOR: TypeTag = TypeTag::new(90, "Accumulator");

struct Accumulator {
    total: i64,
}

fn accumulator_host() -> BindingHost {
    let mut builder = ClassRegistry::builder();
    builder
        .register_class("accumulator", ACCUMULATOR, || Ok(Accumulator { total: 0 }))
        .unwrap()
        .method("add", |acc: &mut Accumulator, a: i64, b: i64| {
            acc.total += a + b;
            acc.total
        })
        .unwrap()
        .finalize()
        .unwrap();
    BindingHost::new(builder.build())
}

// ============================================================================
// 原生分发
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let mut host = accumulator_host();
    let target = host.construct(ACCUMULATOR).unwrap();
    let args = [ScriptValue::Int(1), ScriptValue::Int(2)];
    group.bench_function("by_name", |b| {
        b.iter(|| black_box(host.dispatch(ACCUMULATOR, &target, "add", &args).unwrap()))
    });

    let mut movie_host = build_host(&BindingConfig::default()).unwrap();
    let movie = movie_host.construct_by_name(MOVIE_CLASS).unwrap();
    group.bench_function("movie_query", |b| {
        b.iter(|| black_box(movie_host.dispatch(MOVIE_TYPE, &movie, "getNativeWidth", &[]).unwrap()))
    });

    group.finish();
}

fn bench_handle_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_lifecycle");

    for live in [0usize, 1_000] {
        let mut host = build_host(&BindingConfig::default()).unwrap();
        for _ in 0..live {
            host.construct(MOVIE_TYPE).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("construct_release", live), &live, |b, _| {
            b.iter(|| {
                let handle = host.construct(MOVIE_TYPE).unwrap();
                black_box(host.release(&handle).unwrap())
            })
        });
    }

    group.finish();
}

// ============================================================================
// 脚本调用
// ============================================================================

fn bench_js_call(c: &mut Criterion) {
    let js = build_js_adapter(&BindingConfig::default()).unwrap();
    js.execute_script("var movie = new moviePlayer();").unwrap();

    c.bench_function("js_call_roundtrip", |b| {
        b.iter(|| black_box(js.evaluate("movie.getNativeWidth()").unwrap()))
    });
}

criterion_group!(benches, bench_dispatch, bench_handle_lifecycle, bench_js_call);
criterion_main!(benches);
