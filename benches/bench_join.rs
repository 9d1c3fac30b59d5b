//! Throughput of concurrent `join`/`release` under varying joiner counts.

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use slotlog::config::EngineConfig;
use slotlog::engine::{MySlot, SlotEngine};
use slotlog::log_core::InMemoryLogCore;

const RECORD_SIZE: u32 = 128;
const RECORDS_PER_THREAD: usize = 2_000;

/// Join the active slot, proactively switching to a fresh one first if it is
/// close enough to full that the `thread_count` callers racing against it
/// could together push `JOINED` past its buffer (the engine itself never
/// rejects an over-capacity join — bounding that is the caller's job, per
/// `Slot::joined_len`'s doc comment).
fn join_with_rotation<'e>(engine: &'e SlotEngine, thread_count: usize) -> (usize, MySlot<'e>) {
    let margin = RECORD_SIZE * thread_count as u32;
    loop {
        let (idx, slot) = engine.pool().active().expect("engine always keeps an active slot installed");
        if slot.joined_len() + margin > slot.buffer_len() as u32 {
            engine.switch(idx).unwrap();
            continue;
        }
        if let Some(my_slot) = engine.join(RECORD_SIZE, 0).unwrap() {
            return (idx, my_slot);
        }
    }
}

fn run_join_release(thread_count: usize) {
    let log_core = InMemoryLogCore::new(1 << 30);
    let engine = Arc::new(SlotEngine::new(EngineConfig::default(), log_core).unwrap());

    thread::scope(|scope| {
        for _ in 0..thread_count {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..RECORDS_PER_THREAD {
                    let (idx, my_slot) = join_with_rotation(&engine, thread_count);
                    black_box(my_slot.buf_mut()).fill(0xab);
                    let state_after = engine.release(&my_slot, RECORD_SIZE);

                    if SlotEngine::is_done_state(state_after) {
                        let slot = engine.pool().slot(idx);
                        if let Some(fh) = slot.fh() {
                            fh.0.write_at(slot.start_offset(), slot.filled()).unwrap();
                        }
                        engine.free_slot(idx);
                    }
                }
            });
        }
    });
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_release");
    for &threads in &[1usize, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements((threads * RECORDS_PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| run_join_release(threads));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join);
criterion_main!(benches);
