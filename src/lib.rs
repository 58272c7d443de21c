//! Water-sort puzzle engine: fixed-capacity containers of colored
//! fluid, cascading pours, a scrambler that only ever produces solvable
//! puzzles, a backtracking hint solver, and snapshot-based undo. The
//! rendering and input layer lives elsewhere and talks to
//! [`GameEngine`].

mod gameplay;
mod generator;
mod history;
mod model;
mod solver;

pub use gameplay::GameEngine;
pub use generator::{ConfigError, PuzzleConfig, SPARE_CONTAINERS, generate, solved_reference};
pub use history::{HistoryManager, Snapshot};
pub use model::{
    Fingerprint, FluidContainer, FluidPacket, MoveAction, ParseStateError, PuzzleState,
};
pub use solver::{Solver, SolverOptions, VisitedScope};
