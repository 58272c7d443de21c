use log::debug;
use rand::Rng;
use rand::seq::index;
use thiserror::Error;

use crate::model::{FluidContainer, PuzzleState};

/// Containers beyond the per-color ones that start (and end a
/// generation) empty, giving the player room to maneuver.
pub const SPARE_CONTAINERS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a puzzle needs at least one color")]
    NoColors,
    #[error("containers need a capacity of at least one")]
    ZeroCapacity,
}

/// Initialization-time constants of a puzzle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PuzzleConfig {
    pub color_count: usize,
    pub capacity: usize,
    pub scramble_steps: usize,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            color_count: 18,
            capacity: 4,
            scramble_steps: 1000,
        }
    }
}

impl PuzzleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.color_count == 0 {
            return Err(ConfigError::NoColors);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn container_count(&self) -> usize {
        self.color_count + SPARE_CONTAINERS
    }
}

/// The fully-sorted reference configuration: one container filled with
/// each color, plus the spare empty containers.
pub fn solved_reference(config: &PuzzleConfig) -> PuzzleState {
    let mut containers: Vec<FluidContainer> = (0..config.color_count)
        .map(|color_id| FluidContainer::filled(color_id, config.capacity))
        .collect();
    for _ in 0..SPARE_CONTAINERS {
        containers.push(FluidContainer::new(config.capacity));
    }
    PuzzleState::new(containers)
}

/// Builds a scrambled-but-solvable puzzle. Every step is a reversible
/// single-packet transfer starting from the solved reference, so a
/// solution always exists even though none is constructed here.
pub fn generate(config: &PuzzleConfig, rng: &mut impl Rng) -> PuzzleState {
    let mut state = solved_reference(config);
    let container_count = state.container_count();

    for _ in 0..config.scramble_steps {
        let pair = index::sample(rng, container_count, 2);
        state.force_apply(pair.index(0), pair.index(1));
    }

    // Forced pours can leave fluid in the spare containers; drain them
    // round-robin into the earlier containers so play starts with
    // exactly the last two empty.
    let spare_a = container_count - 1;
    let spare_b = container_count - 2;
    while !state.containers()[spare_a].is_empty() || !state.containers()[spare_b].is_empty() {
        for target in 0..container_count - SPARE_CONTAINERS {
            state.force_apply(spare_a, target);
            state.force_apply(spare_b, target);
        }
    }

    debug!(
        "generated puzzle: {} colors x capacity {}, {} scramble steps",
        config.color_count, config.capacity, config.scramble_steps
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashSet, VecDeque};

    fn small_config() -> PuzzleConfig {
        PuzzleConfig {
            color_count: 3,
            capacity: 3,
            scramble_steps: 200,
        }
    }

    /// Exhaustive breadth-first reachability over canonical states.
    /// Deduplicating by fingerprint is sound for deciding whether a
    /// solved state is reachable at all.
    fn solvable_by_bfs(start: &PuzzleState) -> bool {
        let mut seen = HashSet::new();
        seen.insert(start.fingerprint());
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(state) = queue.pop_front() {
            if state.is_solved() {
                return true;
            }
            for action in state.legal_moves() {
                let mut next = state.clone();
                next.apply(&action);
                if seen.insert(next.fingerprint()) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    #[test]
    fn reference_configuration_is_solved() {
        let state = solved_reference(&small_config());
        assert!(state.is_solved());
        assert_eq!(state.container_count(), 5);
        assert!(state.containers()[3].is_empty());
        assert!(state.containers()[4].is_empty());
    }

    #[test]
    fn generated_puzzle_has_empty_spares_and_conserved_fluid() {
        let config = small_config();
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = generate(&config, &mut rng);
            assert_eq!(state.container_count(), config.container_count());
            let spares = &state.containers()[config.color_count..];
            assert!(spares.iter().all(|c| c.is_empty()));
            let census = state.fluid_census();
            assert_eq!(census.len(), config.color_count);
            assert!(census.values().all(|&count| count == config.capacity));
            for container in state.containers() {
                assert!(container.fill_level() <= container.capacity());
            }
        }
    }

    #[test]
    fn generated_puzzle_is_solvable() {
        let config = small_config();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = generate(&config, &mut rng);
            assert!(solvable_by_bfs(&state), "seed {seed} produced {}", state.repr());
        }
    }

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let config = small_config();
        let a = generate(&config, &mut StdRng::seed_from_u64(7));
        let b = generate(&config, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn config_validation() {
        assert!(PuzzleConfig::default().validate().is_ok());
        let no_colors = PuzzleConfig { color_count: 0, ..small_config() };
        assert_eq!(no_colors.validate(), Err(ConfigError::NoColors));
        let flat = PuzzleConfig { capacity: 0, ..small_config() };
        assert_eq!(flat.validate(), Err(ConfigError::ZeroCapacity));
    }
}
