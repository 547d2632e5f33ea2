//! Criterion benchmarks for the rostering engine.
//!
//! Uses synthetic rosters sized by staff count, task count, and
//! horizon length to measure fitness evaluation, one generation of
//! evolution, and a small end-to-end run.

use chrono::{NaiveDate, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use u_roster::engine::{EngineConfig, GeneticOperators, PopulationManager};
use u_roster::eval::{FitnessCalculator, FitnessProfile};
use u_roster::genome::{Chromosome, GeneSpace};
use u_roster::model::{DateRange, RosterSnapshot, Shift, Staff, Task};
use u_roster::optimizer::{IslandModelOptimizer, Optimizer, RunHandle};
use u_roster::request::{OptimizationRequest, ParamValue};

// ===========================================================================
// Synthetic roster
// ===========================================================================

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn synthetic_snapshot(staff: usize, tasks: usize, days: u32) -> RosterSnapshot {
    let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let end = start + chrono::Duration::days(days as i64 - 1);

    let staff: Vec<Staff> = (0..staff)
        .map(|i| Staff::new(format!("S{i}"), "ops"))
        .collect();
    let tasks: Vec<Task> = (0..tasks)
        .map(|i| {
            let date = start + chrono::Duration::days((i as u32 % days) as i64);
            let from = 9 + (i % 3) as u32 * 2;
            Task::new(format!("T{i}"), "ops", date, t(from), t(from + 2))
        })
        .collect();
    let shifts = vec![Shift::new("D", t(9), t(17)), Shift::new("E", t(14), t(22))];

    RosterSnapshot::new(staff, tasks, shifts, vec![], DateRange::new(start, end))
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_fitness_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fitness_evaluation");
    group.sample_size(10);

    for (staff, tasks, days) in [(5usize, 15usize, 7u32), (10, 40, 14), (20, 80, 28)] {
        let snapshot = synthetic_snapshot(staff, tasks, days);
        let space = GeneSpace::build(&snapshot);
        let operators = GeneticOperators::new(&space, &snapshot);
        let calculator = FitnessCalculator::new(&snapshot, FitnessProfile::Balanced);

        let mut rng = StdRng::seed_from_u64(42);
        let mut chromosome = Chromosome::random(&space, &mut rng);
        operators.repair_basic(&mut chromosome);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("s{staff}_t{tasks}_d{days}")),
            &chromosome,
            |b, chromosome| b.iter(|| black_box(calculator.evaluate(black_box(chromosome)))),
        );
    }
    group.finish();
}

fn bench_single_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_generation");
    group.sample_size(10);

    for (staff, tasks, days) in [(5usize, 15usize, 7u32), (10, 40, 14)] {
        let snapshot = synthetic_snapshot(staff, tasks, days);
        let space = GeneSpace::build(&snapshot);
        let config = EngineConfig::default().with_population_size(50);
        let calculator = FitnessCalculator::new(&snapshot, FitnessProfile::Balanced);
        let operators = GeneticOperators::new(&space, &snapshot);
        let manager = PopulationManager::new(&space, &snapshot);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("s{staff}_t{tasks}_d{days}")),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut rng = StdRng::seed_from_u64(42);
                    let mut population = manager.seed(config.population_size, &mut rng);
                    for chromosome in population.chromosomes.iter_mut() {
                        let fitness = calculator.evaluate(chromosome);
                        chromosome.set_fitness(fitness);
                    }
                    population.sort_by_fitness();

                    let mut next = population.best_n(5);
                    while next.len() < config.population_size {
                        let a = config.selection.select(&population.chromosomes, &mut rng);
                        let other = config.selection.select(&population.chromosomes, &mut rng);
                        let mut child = operators.crossover(
                            &population.chromosomes[a],
                            &population.chromosomes[other],
                            &mut rng,
                        );
                        operators.mutate(&mut child, config.mutation_rate, &mut rng);
                        operators.repair_basic(&mut child);
                        next.push(child);
                    }
                    black_box(next)
                })
            },
        );
    }
    group.finish();
}

fn bench_end_to_end_small(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end_small");
    group.sample_size(10);

    let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let request = OptimizationRequest::new("island-ga")
        .with_range(start, start + chrono::Duration::days(6))
        .with_staff(
            (0..5)
                .map(|i| Staff::new(format!("S{i}"), "ops"))
                .collect(),
        )
        .with_tasks(
            (0..15)
                .map(|i| {
                    let date = start + chrono::Duration::days(i as i64 % 7);
                    Task::new(format!("T{i}"), "ops", date, t(9), t(12))
                })
                .collect(),
        )
        .with_shifts(vec![Shift::new("D", t(9), t(17))])
        .with_param("populationSize", ParamValue::Int(20))
        .with_param("maxGenerations", ParamValue::Int(15))
        .with_param("numberOfIslands", ParamValue::Int(2))
        .with_param("seed", ParamValue::Int(42))
        .sequential();

    group.bench_function("island_ga_5x15x7", |b| {
        b.iter(|| {
            let optimizer = IslandModelOptimizer::new();
            let handle = RunHandle::new();
            black_box(optimizer.optimize(black_box(&request), &handle))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_fitness_evaluation,
    bench_single_generation,
    bench_end_to_end_small
);
criterion_main!(benches);
