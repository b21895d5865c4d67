//! Scheduling overhead of the dependency queue and the bounded fetch
//! scheduler, on synthetic graphs with no I/O.

use std::collections::VecDeque;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hashpack::graph::{DependencyQueue, Frontier};
use hashpack::{ContentHash, Package, Result, Scheduler};

/// `width` packages, each depending on every package of the next layer.
fn layered_graph(layers: usize, width: usize) -> Vec<Package> {
    let mut out = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for i in 0..width {
            let mut pkg = Package::new(&format!("p{}-{}", layer, i), "1.0.0");
            if layer + 1 < layers {
                for j in 0..width {
                    let name = format!("p{}-{}", layer + 1, j);
                    let hash = ContentHash::of(name.as_bytes());
                    pkg.dependencies.push(Package::new(&name, "1.0.0").as_dependency(hash));
                }
            }
            out.push(pkg);
        }
    }
    out
}

fn bench_queue(c: &mut Criterion) {
    let graph = layered_graph(8, 32);
    c.bench_function("queue_dedup_8x32", |b| {
        b.iter(|| {
            let mut queue = DependencyQueue::new();
            for pkg in &graph {
                queue.enqueue(black_box(pkg));
            }
            let mut drained = 0;
            while queue.dequeue().is_some() {
                drained += 1;
            }
            drained
        })
    });
}

/// Binary tree of `depth` levels.
struct Tree {
    pending: VecDeque<u32>,
    depth: u32,
}

impl Frontier for Tree {
    type Job = u32;
    type Output = u32;

    fn next_job(&mut self) -> Option<u32> {
        self.pending.pop_front()
    }

    fn complete(&mut self, level: u32) -> Result<()> {
        if level < self.depth {
            self.pending.push_back(level + 1);
            self.pending.push_back(level + 1);
        }
        Ok(())
    }
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");
    for max_parallel in [1, 4, 20] {
        group.bench_function(format!("tree_1023_jobs_p{}", max_parallel), |b| {
            let scheduler = Scheduler::new(max_parallel);
            b.iter(|| {
                let mut tree = Tree {
                    pending: VecDeque::from([0]),
                    depth: 9,
                };
                scheduler.run(&mut tree, |level| Ok(black_box(level))).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queue, bench_scheduler);
criterion_main!(benches);
