use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maxent_irl::gridworld::{construct_goal_reward, GridWorld, GridWorldConfig};
use maxent_irl::irl::soft_value_iteration;
use maxent_irl::mdp::value_iteration;
use ndarray::Array2;

fn grid(n: usize) -> GridWorld {
    let mut rewards = Array2::zeros((n, n));
    construct_goal_reward(&mut rewards, &[(n - 1, n - 1)], 10.0);
    GridWorld::new(
        GridWorldConfig::new(n, n).action_success_rate(0.8),
        &rewards,
    )
    .unwrap()
}

fn bench_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_iteration");
    for n in [5, 10, 20] {
        let env = grid(n);
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &env, |b, env| {
            b.iter(|| {
                value_iteration(
                    env.transition(),
                    black_box(env.reward().view()),
                    0.95,
                    1e-6,
                    10_000,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_soft_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("soft_value_iteration");
    for n in [5, 10, 20] {
        let env = grid(n);
        let mut goal_mask = vec![false; n * n];
        for &g in env.goal_states() {
            goal_mask[g] = true;
        }
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &env, |b, env| {
            b.iter(|| {
                soft_value_iteration(
                    env.transition(),
                    black_box(env.reward().view()),
                    &goal_mask,
                    0.9,
                    1e-6,
                    1000,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_value_iteration, bench_soft_value_iteration);
criterion_main!(benches);
