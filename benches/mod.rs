use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    reorder_bench::bench_in_order_submission,
    reorder_bench::bench_shuffled_submission,
    reorder_bench::bench_reverse_cascade
);
criterion_main!(benches);
