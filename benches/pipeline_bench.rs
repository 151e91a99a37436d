use clickfeat::features::pipeline::DerivedColumnPipeline;
use clickfeat::storage::loader::{self, ClickEvent};
use clickfeat::storage::schema;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use duckdb::Connection;

fn make_event(i: usize) -> ClickEvent {
    // ~1000 IPs, clicks a few seconds apart, occasional 20-minute gaps
    let secs = (i * 7 + (i / 500) * 1200) as i64;
    ClickEvent {
        ip: u32::try_from(i % 1000).unwrap_or(0),
        app: u16::try_from(i % 30).unwrap_or(0),
        device: 1,
        os: u16::try_from(i % 20).unwrap_or(0),
        channel: u16::try_from(i % 200).unwrap_or(0),
        click_time: chrono::NaiveDate::from_ymd_opt(2017, 11, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(secs),
        attributed_time: None,
        is_attributed: i % 400 == 0,
    }
}

fn seed(count: usize) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::init_schema(&conn).unwrap();
    let events: Vec<ClickEvent> = (0..count).map(make_event).collect();
    loader::insert_train_events(&conn, &events).unwrap();
    conn
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_features");
    for count in [1_000usize, 10_000] {
        let conn = seed(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                DerivedColumnPipeline::default()
                    .run(&conn, "clicks_train", "features_bench", None)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
