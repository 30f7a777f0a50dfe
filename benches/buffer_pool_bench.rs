use criterion::{criterion_group, criterion_main, Criterion};

use std::sync::Arc;

use stratumdb::{BlockId, BufferPoolManager, FileManager, LogManager};

// Create a pool over a temp directory for benchmarking
fn create_bench_pool(num_buffs: usize) -> Arc<BufferPoolManager> {
    let dir = tempfile::TempDir::new().unwrap();
    let fm = Arc::new(FileManager::new(dir.path(), 400).unwrap());
    let lm = Arc::new(LogManager::new(fm.clone(), "bench.log").unwrap());
    let bm = Arc::new(BufferPoolManager::new(fm.clone(), lm, num_buffs));

    // Materialize some blocks to pin against
    for _ in 0..32 {
        fm.append("data").unwrap();
    }

    // Keep the temp dir alive
    std::mem::forget(dir);

    bm
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    group.bench_function("pin_resident_block", |b| {
        let bm = create_bench_pool(8);
        let blk = BlockId::new("data", 0);
        b.iter(|| {
            let buf = bm.pin(&blk).unwrap();
            bm.unpin(&buf);
        });
    });

    group.bench_function("pin_with_eviction", |b| {
        // More blocks than frames: every pin replaces a frame.
        let bm = create_bench_pool(4);
        b.iter(|| {
            for i in 0..16 {
                let buf = bm.pin(&BlockId::new("data", i)).unwrap();
                bm.unpin(&buf);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark);
criterion_main!(benches);
