use std::sync::Arc;

use cim_composite::{
    BehaviourDescriptor, Catalog, Composer, CompositeCache, CompositionKey, MethodSignature,
    ObjectRef, RoleDescriptor, Shape, Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `count` behaviours all implementing `weight(): int`, with random
/// forward precedence edges so the graph stays acyclic
fn catalog(count: usize, seed: u64) -> Arc<Catalog> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weight = || MethodSignature::new("weight", Shape::Int);

    let mut catalog = Catalog::new();
    catalog
        .register_role(RoleDescriptor::builder("Weighted").method(weight()).build())
        .expect("role");

    for i in 0..count {
        let mut builder = BehaviourDescriptor::builder(format!("W{i:03}")).stateless();
        for j in (i + 1)..count {
            if rng.gen_bool(0.2) {
                builder = builder.runs_before(format!("W{j:03}"));
            }
        }
        let answer = if i + 1 == count { 1 } else { 0 };
        builder = builder.plain(weight(), move |_| Ok(Value::Int(answer)));
        catalog.register_behaviour(builder.build()).expect("behaviour");
    }
    Arc::new(catalog)
}

fn key(count: usize) -> CompositionKey {
    CompositionKey::new(["Weighted"], (0..count).map(|i| format!("W{i:03}")))
}

fn benchmark_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    for count in [4usize, 16, 64] {
        let composer = Composer::new(catalog(count, 7));
        let key = key(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(composer.compose(&key).expect("compose")));
        });
    }
    group.finish();
}

fn benchmark_cached_compose(c: &mut Criterion) {
    let cache = CompositeCache::new(Composer::new(catalog(16, 7)));
    let key = key(16);
    cache.get_or_compose(&key).expect("warm");
    c.bench_function("compose_cached_16", |b| {
        b.iter(|| black_box(cache.get_or_compose(&key).expect("cached")));
    });
}

fn benchmark_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke_chain");
    for count in [1usize, 8, 32] {
        let descriptor = Composer::new(catalog(count, 11))
            .compose(&key(count))
            .expect("compose");
        let instance = descriptor.instantiate(ObjectRef::new("Weighted", ()));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(instance.invoke("weight", vec![]).expect("invoke")));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_compose,
    benchmark_cached_compose,
    benchmark_invoke
);
criterion_main!(benches);
