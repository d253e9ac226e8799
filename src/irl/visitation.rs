//! State-visitation frequencies, empirical and expected.
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::mdp::TransitionModel;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Normalized visitation of the originating state of every record.
///
/// An empty dataset yields the zero vector.
pub fn estimate(dataset: &Dataset, num_states: usize) -> Result<Array1<f64>> {
    count(dataset, num_states, false)
}

/// Like [`estimate`], but the state an episode terminated in (the
/// `next_state` of a `done` record) is counted as well.
pub fn estimate_with_terminals(dataset: &Dataset, num_states: usize) -> Result<Array1<f64>> {
    count(dataset, num_states, true)
}

/// Normalized frequencies of the demonstrations' first states.
pub fn initial_state_distribution(dataset: &Dataset, num_states: usize) -> Result<Array1<f64>> {
    let mut counts = Array1::zeros(num_states);
    for state in dataset.iter().filter_map(|t| t.first_state()) {
        *counts
            .get_mut(state)
            .ok_or_else(|| Error::dimension("initial state", num_states, state))? += 1.0;
    }
    Ok(normalized(counts))
}

fn count(dataset: &Dataset, num_states: usize, terminals: bool) -> Result<Array1<f64>> {
    let mut counts = Array1::zeros(num_states);
    for record in dataset.iter().flat_map(|t| t.iter()) {
        *counts
            .get_mut(record.state)
            .ok_or_else(|| Error::dimension("visited state", num_states, record.state))? += 1.0;
        if terminals && record.done {
            *counts.get_mut(record.next_state).ok_or_else(|| {
                Error::dimension("terminal state", num_states, record.next_state)
            })? += 1.0;
        }
    }
    Ok(normalized(counts))
}

fn normalized(mut counts: Array1<f64>) -> Array1<f64> {
    let total = counts.sum();
    if total > 0.0 {
        counts /= total;
    }
    counts
}

/// Expected state-visitation frequencies of `policy` over `horizon` steps.
///
/// Mass starts from `initial` and is pushed through
/// `D_{t+1}(s') = Σ_{s,a} D_t(s) · π(a|s) · T(s, a, s')`. Non-goal mass is
/// counted at steps `0..horizon`. Mass entering a goal state is absorbed:
/// it is counted once on arrival when `count_terminal_arrivals` is set and
/// dropped otherwise. The result is normalized.
pub fn expected_visitation<T: TransitionModel + ?Sized>(
    transition: &T,
    policy: ArrayView2<'_, f64>,
    initial: ArrayView1<'_, f64>,
    goal_mask: &[bool],
    horizon: usize,
    count_terminal_arrivals: bool,
) -> Result<Array1<f64>> {
    let n_s = transition.num_states();
    let n_a = transition.num_actions();
    if policy.dim() != (n_s, n_a) {
        return Err(Error::dimension("policy", n_s * n_a, policy.len()));
    }
    if initial.len() != n_s {
        return Err(Error::dimension("initial distribution", n_s, initial.len()));
    }
    if goal_mask.len() != n_s {
        return Err(Error::dimension("goal mask", n_s, goal_mask.len()));
    }

    let mut density = initial.to_owned();
    let mut visitation = Array1::<f64>::zeros(n_s);

    for step in 0..=horizon {
        for (s, d) in density.iter_mut().enumerate() {
            if goal_mask[s] {
                if count_terminal_arrivals {
                    visitation[s] += *d;
                }
                *d = 0.0;
            }
        }
        if step == horizon {
            break;
        }
        visitation += &density;

        let mut next = Array1::<f64>::zeros(n_s);
        for (s, &d) in density.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            for a in 0..n_a {
                let mass = d * policy[[s, a]];
                if mass > 0.0 {
                    next.scaled_add(mass, &transition.successors(s, a));
                }
            }
        }
        density = next;
    }

    if !visitation.iter().all(|x| x.is_finite()) {
        return Err(Error::NumericalInstability(
            "expected visitation is not finite".to_string(),
        ));
    }
    Ok(normalized(visitation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Trajectory, TransitionRecord};
    use crate::mdp::TabularTransition;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, Array2};

    fn single_step(state: usize, next_state: usize, done: bool) -> Trajectory {
        Trajectory::new(vec![TransitionRecord {
            state,
            action: 0,
            next_state,
            reward: 0.0,
            done,
        }])
    }

    #[test]
    fn test_single_visits_at_state_zero() {
        let dataset = Dataset::new((0..7).map(|_| single_step(0, 1, false)).collect());
        let d = estimate(&dataset, 4).unwrap();
        assert_eq!(d.to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_terminals_are_counted_once() {
        let dataset = Dataset::new(vec![
            Trajectory::from_states(&[0, 1, 2], true),
            Trajectory::from_states(&[1, 2], false),
        ]);
        let plain = estimate(&dataset, 3).unwrap();
        assert_relative_eq!(plain[0], 1.0 / 3.0);
        assert_relative_eq!(plain[1], 2.0 / 3.0);
        assert_relative_eq!(plain[2], 0.0);

        let with_terminals = estimate_with_terminals(&dataset, 3).unwrap();
        assert_relative_eq!(with_terminals[0], 0.25);
        assert_relative_eq!(with_terminals[1], 0.5);
        assert_relative_eq!(with_terminals[2], 0.25);
    }

    #[test]
    fn test_empty_dataset_is_zero() {
        let d = estimate(&Dataset::default(), 3).unwrap();
        assert_eq!(d.sum(), 0.0);
    }

    #[test]
    fn test_out_of_range_state() {
        let dataset = Dataset::new(vec![single_step(5, 0, false)]);
        assert!(matches!(
            estimate(&dataset, 3),
            Err(Error::DimensionMismatch { .. })
        ));
        let dataset = Dataset::new(vec![single_step(0, 9, true)]);
        assert!(estimate(&dataset, 3).is_ok());
        assert!(estimate_with_terminals(&dataset, 3).is_err());
    }

    #[test]
    fn test_initial_state_distribution() {
        let dataset = Dataset::new(vec![
            Trajectory::from_states(&[0, 1], false),
            Trajectory::from_states(&[0, 2], false),
            Trajectory::from_states(&[2, 1], false),
            Trajectory::default(),
        ]);
        let p0 = initial_state_distribution(&dataset, 3).unwrap();
        assert_relative_eq!(p0[0], 2.0 / 3.0);
        assert_relative_eq!(p0[2], 1.0 / 3.0);
    }

    // Corridor 0 -> 1 -> 2 with goal 2, a single action.
    fn corridor() -> TabularTransition {
        TabularTransition::deterministic(3, 1, |s, _| (s + 1).min(2)).unwrap()
    }

    #[test]
    fn test_goal_mass_absorbed_on_arrival() {
        let t = corridor();
        let policy = Array2::ones((3, 1));
        let initial = arr1(&[1.0, 0.0, 0.0]);
        let goals = [false, false, true];

        let d = expected_visitation(&t, policy.view(), initial.view(), &goals, 5, true).unwrap();
        for p in d.iter() {
            assert_relative_eq!(*p, 1.0 / 3.0);
        }

        let d = expected_visitation(&t, policy.view(), initial.view(), &goals, 5, false).unwrap();
        assert_relative_eq!(d[0], 0.5);
        assert_relative_eq!(d[1], 0.5);
        assert_relative_eq!(d[2], 0.0);
    }

    #[test]
    fn test_horizon_truncates() {
        let t = corridor();
        let policy = Array2::ones((3, 1));
        let initial = arr1(&[1.0, 0.0, 0.0]);
        let goals = [false, false, true];

        let d = expected_visitation(&t, policy.view(), initial.view(), &goals, 1, true).unwrap();
        assert_eq!(d.to_vec(), vec![1.0, 0.0, 0.0]);

        let d = expected_visitation(&t, policy.view(), initial.view(), &goals, 2, true).unwrap();
        for p in d.iter() {
            assert_relative_eq!(*p, 1.0 / 3.0);
        }
    }

    #[test]
    fn test_stochastic_policy_splits_mass() {
        // Action 0 stays, action 1 moves to the goal 1.
        let t = TabularTransition::deterministic(2, 2, |s, a| if s == 1 { 1 } else { a }).unwrap();
        let policy = arr2(&[[0.5, 0.5], [0.5, 0.5]]);
        let initial = arr1(&[1.0, 0.0]);
        let d = expected_visitation(&t, policy.view(), initial.view(), &[false, true], 2, true)
            .unwrap();
        // Counts: state 0 at t=0 (1.0) and t=1 (0.5); goal arrivals 0.5 + 0.25.
        assert_relative_eq!(d[0], 1.5 / 2.25);
        assert_relative_eq!(d[1], 0.75 / 2.25);
    }
}
