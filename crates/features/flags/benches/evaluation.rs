use criterion::{Criterion, criterion_group, criterion_main};
use fstone_domain::EvaluationContext;
use fstone_domain::config::FlagSettings;
use fstone_flags::{Condition, FlagEvaluator, FlagOptions, Operator, bucket};
use fstone_storage::MemoryStore;
use std::hint::black_box;
use std::sync::Arc;

fn setup(rt: &tokio::runtime::Runtime) -> FlagEvaluator {
    let flags = FlagEvaluator::new(Arc::new(MemoryStore::new()), &FlagSettings::default())
        .expect("evaluator");
    rt.block_on(flags.register(
        "search",
        true,
        FlagOptions::default()
            .percentage(50.0)
            .groups(["beta_testers"])
            .condition(Condition::attribute("plan", Operator::In, vec!["pro".to_owned()])),
    ))
    .expect("register");
    flags
}

fn bench_evaluation(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
    let flags = setup(&rt);
    let ctx = EvaluationContext::for_user("u1").with_groups(["beta_testers"]).with_attribute("plan", "pro");

    let mut group = c.benchmark_group("flags");
    group.bench_function("bucket", |b| b.iter(|| bucket(black_box("user-42"), black_box("search"))));
    group.bench_function("is_enabled_cached", |b| {
        b.iter(|| flags.is_enabled(black_box("search"), black_box(&ctx)));
    });
    group.bench_function("evaluate_uncached", |b| {
        b.iter(|| flags.evaluate(black_box("search"), black_box(&ctx)));
    });
    group.finish();
}

criterion_group!(benches, bench_evaluation);
criterion_main!(benches);
