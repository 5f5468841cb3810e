//! 并行 Cuckoo 哈希表性能基准测试

use ahash::AHashSet;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, PlotConfiguration, Throughput};

use parallel_cuckoo::{
    CompactingHashTable, DisabledStatsRecorder, GroupingStrategy, HashTable, Key, SystemAllocator, TableConfig,
    Value,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

// 基准测试配置
const SEED: u64 = 42;
const ITEM_COUNTS: [usize; 4] = [10_000, 100_000, 1_000_000, 4_000_000];

/// 生成互不相同的随机键及其值 (键避开保留值)
fn generate_items(count: usize) -> (Vec<Key>, Vec<Value>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut seen = AHashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    let mut values = Vec::with_capacity(count);
    while keys.len() < count {
        let key = rng.gen_range(0..u32::MAX);
        if seen.insert(key) {
            keys.push(key);
            values.push(rng.gen());
        }
    }
    (keys, values)
}

fn create_table(max_input_size: usize, num_functions: u32) -> HashTable {
    let mut table = HashTable::with_components(Arc::new(SystemAllocator::new()), Arc::new(DisabledStatsRecorder));
    table
        .initialize_with(TableConfig::new(max_input_size as u32, 1.25, num_functions).with_seed(SEED))
        .expect("初始化失败");
    table
}

/// 构建基准测试
fn bench_build(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(criterion::AxisScale::Logarithmic);
    let mut group = c.benchmark_group("Build");
    group.plot_config(plot_config);

    for &count in ITEM_COUNTS.iter() {
        let (keys, values) = generate_items(count);
        let mut table = create_table(count, 4);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &(keys, values), |b, (keys, values)| {
            b.iter(|| table.build(keys, values).expect("构建失败"));
        });
    }
    group.finish();
}

/// 不同哈希函数数量的构建对比
fn bench_build_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("Build Functions");
    let count = 1_000_000;
    let (keys, values) = generate_items(count);

    for num_functions in 2..=5u32 {
        let mut table = create_table(count, num_functions);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::from_parameter(num_functions), |b| {
            b.iter(|| criterion::black_box(table.build(&keys, &values).is_ok()));
        });
    }
    group.finish();
}

/// 查询基准测试, 一半命中一半未命中
fn bench_retrieve(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(criterion::AxisScale::Logarithmic);
    let mut group = c.benchmark_group("Retrieve");
    group.plot_config(plot_config);

    for &count in ITEM_COUNTS.iter() {
        let (keys, values) = generate_items(count);
        let mut table = create_table(count, 4);
        table.build(&keys, &values).expect("构建失败");

        let mut rng = StdRng::seed_from_u64(SEED + 1);
        let queries: Vec<Key> = keys
            .iter()
            .map(|key| if rng.gen_bool(0.5) { *key } else { rng.gen_range(0..u32::MAX) })
            .collect();
        let mut results = vec![0; queries.len()];

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &queries, |b, queries| {
            b.iter(|| {
                table.retrieve_into(queries, &mut results).expect("查询失败");
                criterion::black_box(&results);
            });
        });
    }
    group.finish();
}

/// 压缩表构建: 两种分组策略
fn bench_compacting_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("Compacting Build");

    for &count in [100_000, 1_000_000].iter() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let keys: Vec<Key> = (0..count).map(|_| rng.gen_range(0..(count as u32 / 4))).collect();

        for grouping in [GroupingStrategy::TableSlots, GroupingStrategy::Sorted] {
            let mut table =
                CompactingHashTable::with_components(Arc::new(SystemAllocator::new()), Arc::new(DisabledStatsRecorder));
            table
                .initialize_with(
                    TableConfig::new(count as u32, 1.25, 4)
                        .with_seed(SEED)
                        .with_grouping(grouping),
                )
                .expect("初始化失败");

            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(BenchmarkId::new(format!("{grouping:?}"), count), &keys, |b, keys| {
                b.iter(|| table.build_keys(keys).expect("构建失败"));
            });
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(5))
        .noise_threshold(0.05);
    targets =
        bench_build,
        bench_build_functions,
        bench_retrieve,
        bench_compacting_build
);
criterion_main!(benches);
