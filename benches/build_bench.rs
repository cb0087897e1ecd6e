use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ip2mmdb::{GeoPayload, MmdbBuilder, RangeRow};
use std::hint::black_box;

// Benchmark: end-to-end database builds with realistic payload duplication
// (many ranges sharing a small set of countries/cities).
fn bench_country_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("mmdb_build");

    for row_count in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(row_count as u64));
        group.bench_with_input(
            BenchmarkId::new("country", row_count),
            &row_count,
            |b, &count| {
                b.iter(|| {
                    let mut builder = MmdbBuilder::new().with_build_epoch(0);
                    for i in 0..count {
                        let start = (i as u32) * 512;
                        let row = RangeRow {
                            start,
                            end: start + 300,
                            payload: GeoPayload::Country {
                                iso_code: format!("C{}", i % 64),
                                country_name: format!("Country {}", i % 64),
                            },
                        };
                        builder.add_row(black_box(&row)).unwrap();
                    }
                    black_box(builder.build().unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_city_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("mmdb_build");

    for row_count in [100usize, 1_000] {
        group.throughput(Throughput::Elements(row_count as u64));
        group.bench_with_input(
            BenchmarkId::new("city", row_count),
            &row_count,
            |b, &count| {
                b.iter(|| {
                    let mut builder = MmdbBuilder::new().with_build_epoch(0);
                    for i in 0..count {
                        let start = (i as u32) * 1024;
                        let city = i % 128;
                        let row = RangeRow {
                            start,
                            end: start + 1023,
                            payload: GeoPayload::City {
                                iso_code: "US".to_string(),
                                country_name: "United States".to_string(),
                                region: format!("Region {}", city % 16),
                                city: format!("City {}", city),
                                latitude: format!("{}.25", 20 + city % 40),
                                longitude: format!("-{}.75", 70 + city % 50),
                                postal_code: format!("{:05}", 10000 + city),
                            },
                        };
                        builder.add_row(black_box(&row)).unwrap();
                    }
                    black_box(builder.build().unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_country_build, bench_city_build);
criterion_main!(benches);
