use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use reforge_core::composer::{Candidate, Constraints, SessionComposer};
use reforge_core::model::Difficulty;
use reforge_core::scoring::Score;
use reforge_core::templates::DifficultyDistribution;

fn make_candidates(n: i64) -> Vec<Candidate> {
    let difficulties = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
    (0..n)
        .map(|i| Candidate {
            problem_id: i,
            title: format!("problem {i}"),
            difficulty: difficulties[(i % 3) as usize],
            patterns: vec![i % 12, 100 + i % 5],
            score: Score {
                value: ((i * 7919) % 1000) as f64 / 1000.0,
                breakdown: vec![],
                reason: "due for review".into(),
            },
            confidence: (i % 101) as u8,
            days_since_last: if i % 4 == 0 { None } else { Some((i % 45) as f64) },
            avg_time_seconds: Some(((i * 131) % 2400) as u32),
        })
        .collect()
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let composer = SessionComposer::default();
    let constraints = Constraints {
        duration_min: 150,
        distribution: DifficultyDistribution::new(15.0, 55.0, 30.0),
        max_same_pattern: 3,
        require_quick_win: true,
        progression: false,
    };

    for n in [50, 500, 5000] {
        let candidates = make_candidates(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candidates, |b, candidates| {
            b.iter(|| composer.compose(black_box(candidates.clone()), &constraints))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
