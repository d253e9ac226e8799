use criterion::{criterion_group, criterion_main, Criterion};
use maxent_irl::dataset::collect_trajectories;
use maxent_irl::gridworld::{construct_goal_reward, GridWorld, GridWorldConfig};
use maxent_irl::irl::{MaxEntIrl, MaxEntIrlConfig};
use maxent_irl::mdp::value_iteration;
use maxent_irl::Policy;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_maxent_train(c: &mut Criterion) {
    let n = 10;
    let mut rewards = Array2::zeros((n, n));
    construct_goal_reward(&mut rewards, &[(n - 1, n - 1)], 10.0);
    let mut env = GridWorld::new(GridWorldConfig::new(n, n), &rewards).unwrap();
    let expert = value_iteration(env.transition(), env.reward().view(), 0.99, 1e-6, 10_000).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let demos = collect_trajectories(
        &mut env,
        &Policy::StochasticGreedy { temperature: 1.0 },
        &expert,
        20,
        30,
        &mut rng,
    )
    .unwrap();

    c.bench_function("maxent_irl_train_10x10", |b| {
        b.iter(|| {
            let mut irl = MaxEntIrl::new(
                env.transition(),
                env.feature_matrix(),
                env.goal_states(),
                &demos,
                MaxEntIrlConfig::default().max_iter(10),
            )
            .unwrap();
            irl.train().unwrap()
        })
    });
}

criterion_group!(benches, bench_maxent_train);
criterion_main!(benches);
