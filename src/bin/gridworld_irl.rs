use clap::Parser;
use log::info;
use maxent_irl::{
    dataset::collect_trajectories,
    gridworld::{construct_goal_reward, construct_radius_reward, GridWorld, GridWorldConfig},
    irl::{estimate, MaxEntIrl, MaxEntIrlConfig},
    mdp::value_iteration,
    Policy, Result,
};
use ndarray::{Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

const GOAL_REWARD: f64 = 10.0;
const HUMAN_REWARD: f64 = -10.0;
const HUMAN_RADIUS: f64 = 3.0;
const NUM_GOALS: usize = 5;
const EXPERT_GAMMA: f64 = 0.99;

/// Recovers the reward of a grid world from expert demonstrations.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Side length of the square grid
    #[arg(long, default_value_t = 10)]
    size: usize,

    /// Seed of the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of expert demonstrations
    #[arg(long, default_value_t = 20)]
    trajectories: usize,

    /// Maximum length of a demonstration
    #[arg(long, default_value_t = 30)]
    max_len: usize,

    /// YAML file with the IRL configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn print_grid(title: &str, grid: &Array2<f64>) {
    println!("{}", title);
    for row in grid.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{:7.2}", v)).collect();
        println!("{}", line.join(" "));
    }
    println!();
}

fn show(env: &GridWorld, title: &str, values: ArrayView1<'_, f64>) -> Result<()> {
    print_grid(title, &env.to_grid(values)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let n = args.size;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    // Goals along the bottom edge, a human standing in the middle.
    let goals: Vec<(usize, usize)> = (0..NUM_GOALS.min(n))
        .map(|k| (n - 1, n - 1 - k))
        .collect();
    let mut grid = Array2::zeros((n, n));
    construct_goal_reward(&mut grid, &goals, GOAL_REWARD);
    construct_radius_reward(&mut grid, &[(n / 2, n / 2)], HUMAN_RADIUS, HUMAN_REWARD);

    let config = GridWorldConfig::new(n, n).goal_pos(goals);
    let mut env = GridWorld::new(config, &grid)?;

    let expert = value_iteration(
        env.transition(),
        env.reward().view(),
        EXPERT_GAMMA,
        1e-6,
        10_000,
    )?;
    show(&env, "Reward (ground truth)", env.reward().view())?;
    show(&env, "Value function", expert.values.view())?;

    let policy = Policy::stochastic_greedy(1.0)?;
    let dataset = collect_trajectories(
        &mut env,
        &policy,
        &expert,
        args.trajectories,
        args.max_len,
        &mut rng,
    )?;
    info!(
        "collected {} trajectories with {} transitions",
        dataset.len(),
        dataset.num_records()
    );
    show(
        &env,
        "Dataset state distribution",
        estimate(&dataset, n * n)?.view(),
    )?;

    let irl_config = match &args.config {
        Some(path) => MaxEntIrlConfig::load(path)?,
        None => MaxEntIrlConfig::default().max_iter(10).anneal_rate(0.9),
    };
    let mut irl = MaxEntIrl::new(
        env.transition(),
        env.feature_matrix(),
        env.goal_states(),
        &dataset,
        irl_config,
    )?;
    let reward = irl.train()?;
    show(&env, "Reward (IRL)", reward.view())?;

    Ok(())
}
