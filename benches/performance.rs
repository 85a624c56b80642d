//! Performance benchmarks for the live blog.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liveblog::{
    BlogConfig, BlogId, Broadcaster, ChannelHub, ChannelId, ContentLog, ContentStore, HubConfig,
    JournalRegistry, LiveBlog, Post, Sequence, SubscriberRegistry, Topic,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn config(dir: &TempDir, sync_interval: u64) -> BlogConfig {
    BlogConfig {
        path: dir.path().join("blog"),
        sync_interval,
        ..Default::default()
    }
}

fn blog() -> BlogId {
    BlogId::new("bench").unwrap()
}

/// Benchmark post creation with no subscribers, by sync interval
fn bench_create_post(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_post");
    let rt = Runtime::new().unwrap();

    for sync_interval in [1, 100] {
        group.bench_with_input(
            BenchmarkId::new("sync_every", sync_interval),
            &sync_interval,
            |b, &interval| {
                let dir = TempDir::new().unwrap();
                let config = config(&dir, interval);
                let content = Arc::new(ContentLog::open_or_create(&config).unwrap());
                let registry = Arc::new(JournalRegistry::open(&config.path).unwrap());
                let broadcaster = Broadcaster::new(registry, Arc::new(ChannelHub::default()));
                let service = LiveBlog::new(content, broadcaster, config);

                b.iter(|| {
                    black_box(
                        rt.block_on(service.create_post(&blog(), json!({"text": "update"})))
                            .unwrap(),
                    );
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reading a page deep in a long feed
fn bench_query_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_page");

    for feed_len in [100u64, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("feed_len", feed_len),
            &feed_len,
            |b, &len| {
                let dir = TempDir::new().unwrap();
                let log = ContentLog::open_or_create(&config(&dir, 1000)).unwrap();
                for i in 1..=len {
                    log.insert_post(&Post {
                        blog_id: blog(),
                        sequence: Sequence(i),
                        content: json!({"text": "some words", "n": i}),
                    })
                    .unwrap();
                }
                let middle = Sequence(len / 2);

                b.iter(|| {
                    black_box(log.query_posts(&blog(), 25, Some(middle)).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark fan-out to attached channels
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    let rt = Runtime::new().unwrap();

    for subscribers in [10usize, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &count| {
                let dir = TempDir::new().unwrap();
                let registry = Arc::new(JournalRegistry::open(dir.path()).unwrap());
                let hub = Arc::new(ChannelHub::new(HubConfig {
                    buffer: 1,
                    ..Default::default()
                }));

                let mut receivers = Vec::with_capacity(count);
                for i in 0..count {
                    let id = ChannelId::from(format!("ch-{}", i).as_str());
                    receivers.push(hub.attach_as(id.clone()));
                    registry.register(Topic::Posts, &id).unwrap();
                }
                let broadcaster = Broadcaster::new(registry, hub);

                b.iter(|| {
                    black_box(
                        rt.block_on(broadcaster.broadcast(Topic::Posts, "payload"))
                            .unwrap(),
                    );
                    // Drain so the next iteration finds room
                    for rx in receivers.iter_mut() {
                        while rx.try_recv().is_ok() {}
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_create_post, bench_query_page, bench_broadcast);

criterion_main!(benches);
