use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::generator::{ConfigError, PuzzleConfig, generate};
use crate::history::HistoryManager;
use crate::model::{FluidContainer, MoveAction, PuzzleState};
use crate::solver::{Solver, SolverOptions};

/// Façade owning the puzzle state, the undo history, and the hint
/// solver. All operations run to completion on the calling thread; the
/// UI collaborator only reports intents and reads container contents
/// back for drawing.
pub struct GameEngine {
    config: PuzzleConfig,
    state: PuzzleState,
    starting_state: PuzzleState,
    history: HistoryManager,
    solver: Solver,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(config: PuzzleConfig) -> Result<Self, ConfigError> {
        Self::from_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic engine for reproducible puzzles and tests.
    pub fn with_seed(config: PuzzleConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: PuzzleConfig, mut rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = generate(&config, &mut rng);
        Ok(Self {
            config,
            starting_state: state.clone(),
            state,
            history: HistoryManager::new(),
            solver: Solver::new(),
            rng,
        })
    }

    pub fn set_solver_options(&mut self, options: SolverOptions) {
        self.solver = Solver::with_options(options);
    }

    /// Generates a fresh puzzle and discards the history.
    pub fn new_puzzle(&mut self) {
        self.state = generate(&self.config, &mut self.rng);
        self.starting_state = self.state.clone();
        self.history.clear();
    }

    /// Returns to the current puzzle's initial state, as one undoable
    /// action.
    pub fn restart(&mut self) {
        self.history.push(self.state.snapshot());
        self.state = self.starting_state.clone();
    }

    /// Attempts a player pour. A pre-move snapshot lands on the undo
    /// stack only when the pour actually moved fluid; an illegal pour
    /// is a silent no-op.
    pub fn attempt_pour(&mut self, from: usize, to: usize) -> bool {
        let snapshot = self.state.snapshot();
        let action = MoveAction {
            from_container: from,
            to_container: to,
        };
        if self.state.apply(&action) {
            self.history.push(snapshot);
            true
        } else {
            false
        }
    }

    /// Runs the hint search and, if it finds a move, applies it (as an
    /// undoable action) and reports it.
    pub fn request_hint(&mut self) -> Option<MoveAction> {
        let action = self.solver.next_move(&mut self.state, &mut self.rng)?;
        let snapshot = self.state.snapshot();
        let applied = self.state.apply(&action);
        debug_assert!(applied, "hint search returned an illegal move");
        self.history.push(snapshot);
        Some(action)
    }

    pub fn undo(&mut self) -> bool {
        if let Some(snapshot) = self.history.pop() {
            self.state.restore(&snapshot);
            true
        } else {
            false
        }
    }

    pub fn is_solved(&self) -> bool {
        self.state.is_solved()
    }

    pub fn container_count(&self) -> usize {
        self.state.container_count()
    }

    pub fn container(&self, index: usize) -> Option<&FluidContainer> {
        self.state.container(index)
    }

    pub fn containers(&self) -> &[FluidContainer] {
        self.state.containers()
    }

    pub fn state(&self) -> &PuzzleState {
        &self.state
    }

    pub fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }
}
