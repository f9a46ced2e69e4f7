//! Benchmark for the pod cache
//!
//! Watch event application racing concurrent status reads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use kube::api::ObjectMeta;
use kube_sync_agent::domain::ports::PodEventHandler;
use kube_sync_agent::PodCache;

fn pod(name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("pod_cache");
    group.throughput(Throughput::Elements(1));

    group.bench_function("upsert_single_pod", |b| {
        let cache = PodCache::new();
        let mut counter = 0u64;

        b.iter(|| {
            counter += 1;
            cache.upsert(black_box(pod(&format!("pod-{}", counter % 1000))));
        });
    });

    group.finish();
}

fn bench_event_callbacks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pod_cache");
    group.throughput(Throughput::Elements(1));

    let cache = PodCache::new();
    let pods: Vec<Pod> = (0..1000).map(|i| pod(&format!("pod-{:04}", i))).collect();
    for p in &pods {
        cache.on_add(p);
    }

    group.bench_function("update_then_delete", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            counter += 1;
            let p = &pods[counter % pods.len()];
            cache.on_update(p, black_box(p));
            cache.on_delete(p);
            cache.on_add(p);
        });
    });

    group.finish();
}

fn bench_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("pod_cache");
    group.throughput(Throughput::Elements(100));

    let cache = PodCache::new();
    for i in 0..1000 {
        cache.upsert(pod(&format!("pod-{:04}", i)));
    }

    let rt = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("concurrent_100_reads_with_writer", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut handles = Vec::new();
                for i in 0..100 {
                    let cache = cache.clone();
                    handles.push(tokio::spawn(async move {
                        let name = format!("pod-{:04}", i * 10);
                        if i % 10 == 0 {
                            cache.upsert(pod(&name));
                        }
                        cache.get(&name).map(|r| r.summary())
                    }));
                }
                for handle in handles {
                    let _ = handle.await;
                }
            });
        });
    });

    group.bench_function("list_1000", |b| {
        b.iter(|| black_box(cache.list().len()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_upsert,
    bench_event_callbacks,
    bench_concurrent_reads
);
criterion_main!(benches);
