//! Runtime Primitive Benchmarks
//!
//! Run with: cargo bench
//! Compare pointer modes with: cargo bench --no-default-features

use std::hint::black_box;
use std::time::Instant;

use spy_runtime::{
    AllocPolicy, Checked, IntOps, ManagedPtr, Runtime, RuntimeConfig, Str, Unchecked,
};

// Simple timing macro for benchmarks
macro_rules! bench {
    ($name:expr, $iterations:expr, $code:block) => {{
        let start = Instant::now();
        for _ in 0..$iterations {
            black_box($code);
        }
        let elapsed = start.elapsed();
        let per_iter = elapsed / $iterations;
        println!(
            "{}: {} iterations in {:?} ({:?}/iter, {:.0} ops/sec)",
            $name,
            $iterations,
            elapsed,
            per_iter,
            $iterations as f64 / elapsed.as_secs_f64()
        );
        elapsed
    }};
}

fn runtime(policy: AllocPolicy) -> Runtime {
    let mut config = RuntimeConfig::default();
    config.heap.policy = policy;
    Runtime::with_config(config)
}

fn bench_alloc() {
    println!("\n=== Allocation ===");
    for policy in [AllocPolicy::Leak, AllocPolicy::Bump] {
        let rt = runtime(policy);
        bench!(format!("allocate(32) [{}]", rt.heap().name()), 100_000, {
            rt.allocate(32)
        });
    }
}

fn bench_strings() {
    println!("\n=== Strings ===");
    let rt = runtime(AllocPolicy::Bump);
    let a = Str::new(&rt, "hello ");
    let b = Str::new(&rt, "world");
    bench!("Str::add", 100_000, { a.add(&rt, b) });

    let text = Str::new(&rt, "the quick brown fox jumps over the lazy dog").mul(&rt, 20);
    let old = Str::new(&rt, "o");
    let new = Str::new(&rt, "0");
    bench!("Str::replace (860 bytes)", 10_000, { text.replace(&rt, old, new) });

    bench!("Str::hash (fresh)", 10_000, { Str::new(&rt, "some key").hash() });
    bench!("Str::from_f64", 100_000, { Str::from_f64(&rt, black_box(3.14159)) });
}

fn bench_pointers() {
    println!("\n=== Managed pointers ===");
    let rt = runtime(AllocPolicy::Leak);
    let checked = ManagedPtr::<i64, Checked>::alloc(&rt, 1024);
    let unchecked = ManagedPtr::<i64, Unchecked>::alloc(&rt, 1024);
    bench!("checked store/load x1024", 10_000, {
        let mut sum = 0i64;
        for i in 0..1024 {
            unsafe {
                checked.store(&rt, i, i as i64);
                sum += checked.load(&rt, i);
            }
        }
        sum
    });
    bench!("unchecked store/load x1024", 10_000, {
        let mut sum = 0i64;
        for i in 0..1024 {
            unsafe {
                unchecked.store(&rt, i, i as i64);
                sum += unchecked.load(&rt, i);
            }
        }
        sum
    });
}

fn bench_operators() {
    println!("\n=== Operators ===");
    let rt = Runtime::new();
    bench!("i32 floordiv", 1_000_000, {
        black_box(-7i32).floordiv(&rt, black_box(2))
    });
    bench!("i32 unchecked_floordiv", 1_000_000, {
        black_box(-7i32).unchecked_floordiv(&rt, black_box(2))
    });
}

fn main() {
    bench_alloc();
    bench_strings();
    bench_pointers();
    bench_operators();
}
