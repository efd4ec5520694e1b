//! 过滤器扇出性能
//!
//! 运行：`cargo bench -p hostcan --bench dispatch`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use hostcan::driver::FilterTable;
use hostcan::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

fn table_with(filters: usize, hits: &Arc<AtomicU64>) -> FilterTable {
    let table = FilterTable::new(filters);
    for i in 0..filters {
        let hits = hits.clone();
        // 一半精确匹配、一半全收，模拟混合负载
        let rule = if i % 2 == 0 {
            FilterRule::exact(0x100 + i as u32, IdType::Standard)
        } else {
            FilterRule::accept_all(IdType::Standard)
        };
        table
            .add(rule, move |_frame: Frame| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }
    table
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_dispatch");
    let frame = Frame::new_standard(0x100, &[1, 2, 3, 4, 5, 6, 7, 8]);

    for filters in [1usize, 8, 32] {
        let hits = Arc::new(AtomicU64::new(0));
        let table = table_with(filters, &hits);
        group.bench_with_input(BenchmarkId::from_parameter(filters), &table, |b, table| {
            b.iter(|| table.dispatch(black_box(&frame)));
        });
    }
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let codec = hostcan::frame::FrameCodec::new(true);
    let frame = Frame::new_fd(0x123, IdType::Standard, &[0xA5; 64], true).unwrap();

    c.bench_function("codec_encode_fd", |b| {
        b.iter(|| codec.encode(black_box(&frame)).unwrap());
    });
}

criterion_group!(benches, bench_dispatch, bench_codec);
criterion_main!(benches);
