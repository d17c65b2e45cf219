use std::fmt::Write;

use chaptersplit_core::{build_plan, parse_chapters, parse_metadata};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

struct Scenario {
    name: &'static str,
    chapters: usize,
    time_base: &'static str,
    units_per_second: u64,
}

/// Build an `ffmetadata` dump with evenly spaced chapters, one every
/// ninety seconds.
fn synthetic_metadata(scenario: &Scenario) -> String {
    let mut text = String::from(";FFMETADATA1\ntitle=Benchmark Book\nartist=Nobody\n\n");
    let span = 90 * scenario.units_per_second;
    for index in 0..scenario.chapters as u64 {
        let _ = write!(
            text,
            "[CHAPTER]\nTIMEBASE={}\nSTART={}\nEND={}\ntitle=Chapter title number {}\n",
            scenario.time_base,
            index * span,
            (index + 1) * span,
            index + 1
        );
    }
    text
}

fn parse_benchmarks(c: &mut Criterion) {
    let scenarios = [
        Scenario {
            name: "chapters_40_ms",
            chapters: 40,
            time_base: "1/1000",
            units_per_second: 1_000,
        },
        Scenario {
            name: "chapters_500_ms",
            chapters: 500,
            time_base: "1/1000",
            units_per_second: 1_000,
        },
        Scenario {
            name: "chapters_500_samples",
            chapters: 500,
            time_base: "1/44100",
            units_per_second: 44_100,
        },
    ];

    let mut group = c.benchmark_group("chapter_parse");

    for scenario in &scenarios {
        let text = synthetic_metadata(scenario);
        group.bench_with_input(
            BenchmarkId::new("parse", scenario.name),
            &text,
            |b, text| {
                b.iter(|| parse_metadata(black_box(text)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("parse_and_plan", scenario.name),
            &text,
            |b, text| {
                b.iter(|| {
                    let chapters =
                        parse_chapters(black_box(text)).expect("synthetic metadata has chapters");
                    build_plan(&chapters)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, parse_benchmarks);
criterion_main!(benches);
