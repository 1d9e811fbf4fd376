use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use election_analytics::{
    ReportGenerator, ReportKind,
    reports::ReportContext,
    types::{Candidate, Position, SystemInfo},
};
use std::hint::black_box;
use std::time::Duration;

fn candidates(count: u64) -> Vec<Candidate> {
    (1..=count)
        .map(|id| {
            let position = Position::ALL[(id % 3) as usize];
            Candidate {
                id,
                name: format!("Candidate \"{id}\""),
                party: "Party, Inc".to_string(),
                position,
                region: if position.is_regional() {
                    format!("Region {}", id % 12)
                } else {
                    String::new()
                },
                image_url: format!("https://img.example.org/{id}.png"),
                vote_count: id * 17 % 9_000,
            }
        })
        .collect()
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_generate");
    group.warm_up_time(Duration::from_millis(100));

    let generator = ReportGenerator::new();
    let ctx = ReportContext::new(250_000, 180_000).with_candidates(candidates(500));

    for kind in ReportKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            b.iter(|| generator.generate(black_box(kind), black_box(&ctx)).unwrap())
        });
    }

    group.finish();
}

fn bench_csv_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_export");

    let generator = ReportGenerator::new();
    for count in [10u64, 100, 1_000] {
        let mut ctx = ReportContext::new(250_000, 180_000).with_candidates(candidates(count));
        ctx.system = SystemInfo::default().with_operator(Some("0xAdmin".into()), None);
        let report = generator
            .generate(ReportKind::DetailedResults, &ctx)
            .unwrap()
            .into_report()
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &report, |b, report| {
            b.iter(|| black_box(report.to_csv()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_csv_export);

criterion_main!(benches);
