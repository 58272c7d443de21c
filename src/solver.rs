use std::collections::HashSet;

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Fingerprint, FluidPacket, MoveAction, PuzzleState};

/// How long a deduplicated fingerprint stays in the visited set.
///
/// `WholeTree` keeps every fingerprint for the entire search: a state
/// reached once is never explored again through any other path. That
/// can miss solutions that exist, or settle on deeper ones, but it is
/// the historical behavior of this engine. `PerPath` forgets a
/// fingerprint when the search backtracks past it, trading reliability
/// of the result for (much) more exploration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum VisitedScope {
    #[default]
    WholeTree,
    PerPath,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SolverOptions {
    pub visited_scope: VisitedScope,
}

/// Exhaustive backtracking search that produces a single next move
/// believed to make progress. Runs synchronously on the caller's
/// thread; there is no depth bound or move budget.
#[derive(Debug, Default)]
pub struct Solver {
    options: SolverOptions,
}

/// The root move that led to a solved state, and the depth at which the
/// solved state was found.
type SearchResult = Option<(MoveAction, usize)>;

struct Frame {
    candidates: Vec<MoveAction>,
    next: usize,
    /// Root move propagated down from the top of the search. `None`
    /// only at depth zero, where each candidate becomes its own root.
    root: Option<MoveAction>,
    depth: usize,
    /// Shallowest success among fully-explored children so far.
    best: SearchResult,
    /// The candidate currently applied to the live state while a child
    /// frame explores it.
    applied: Option<AppliedMove>,
}

struct AppliedMove {
    action: MoveAction,
    saved_from: Vec<FluidPacket>,
    saved_to: Vec<FluidPacket>,
    entered: Fingerprint,
}

impl Frame {
    fn new(candidates: Vec<MoveAction>, root: Option<MoveAction>, depth: usize) -> Self {
        Self {
            candidates,
            next: 0,
            root,
            depth,
            best: None,
            applied: None,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Searches for a move to apply next. The state is mutated during
    /// the search but restored exactly before returning; committing the
    /// returned move is the caller's decision.
    ///
    /// Candidate order is shuffled at every level, so repeated calls on
    /// an identical state can legitimately return different moves.
    pub fn next_move(&self, state: &mut PuzzleState, rng: &mut impl Rng) -> Option<MoveAction> {
        let per_path = self.options.visited_scope == VisitedScope::PerPath;
        let mut visited = HashSet::new();
        visited.insert(state.fingerprint());
        let mut pours = 0usize;

        // Depth-first search over an explicit frame stack; native
        // recursion would overflow on pathological states.
        let mut stack = vec![Frame::new(shuffled_moves(state, rng), None, 0)];
        // Result handed up by the frame popped in the previous step.
        let mut returned: Option<SearchResult> = None;

        while !stack.is_empty() {
            let mut descend: Option<Frame> = None;
            let mut finished: Option<SearchResult> = None;
            {
                let frame = stack.last_mut().expect("non-empty stack");

                // A child frame just finished: fold its result into the
                // running best and take back the move we had applied.
                if let Some(applied) = frame.applied.take() {
                    if let Some(Some((action, depth))) = returned.take()
                        && frame.best.is_none_or(|(_, best_depth)| depth < best_depth)
                    {
                        frame.best = Some((action, depth));
                    }
                    state.restore_pair(&applied.action, applied.saved_from, applied.saved_to);
                    if per_path {
                        visited.remove(&applied.entered);
                    }
                }

                loop {
                    let Some(&action) = frame.candidates.get(frame.next) else {
                        finished = Some(frame.best.take());
                        break;
                    };
                    frame.next += 1;
                    let root = frame.root.unwrap_or(action);

                    let Some((saved_from, saved_to)) = state.reversible_apply(&action) else {
                        continue;
                    };
                    pours += 1;

                    if state.is_solved() {
                        // This level is done: nothing deeper can beat a
                        // success at the current depth.
                        state.restore_pair(&action, saved_from, saved_to);
                        finished = Some(Some((root, frame.depth)));
                        break;
                    }

                    let entered = state.fingerprint();
                    if !visited.insert(entered) {
                        state.restore_pair(&action, saved_from, saved_to);
                        continue;
                    }

                    descend = Some(Frame::new(
                        shuffled_moves(state, rng),
                        Some(root),
                        frame.depth + 1,
                    ));
                    frame.applied = Some(AppliedMove {
                        action,
                        saved_from,
                        saved_to,
                        entered,
                    });
                    break;
                }
            }

            if let Some(result) = finished {
                stack.pop();
                returned = Some(result);
            } else if let Some(frame) = descend {
                stack.push(frame);
            }
        }

        match returned.flatten() {
            Some((action, depth)) => {
                debug!(
                    "hint search found a solution at depth {depth} after {pours} pours \
                     ({} states deduplicated)",
                    visited.len()
                );
                Some(action)
            }
            None => {
                debug!(
                    "hint search exhausted {} states after {pours} pours without a solution",
                    visited.len()
                );
                None
            }
        }
    }
}

fn shuffled_moves(state: &PuzzleState, rng: &mut impl Rng) -> Vec<MoveAction> {
    let mut moves = state.legal_moves();
    moves.shuffle(rng);
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{PuzzleConfig, generate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn state(repr: &str) -> PuzzleState {
        PuzzleState::from_repr(repr).unwrap()
    }

    #[test]
    fn finds_the_single_winning_move() {
        let mut puzzle = state("AAA./A...");
        let solver = Solver::new();
        let mut rng = StdRng::seed_from_u64(0);
        let action = solver.next_move(&mut puzzle, &mut rng).unwrap();
        assert!(puzzle.apply(&action));
        assert!(puzzle.is_solved());
    }

    #[test]
    fn reports_none_when_no_move_exists() {
        // Both containers full with mismatched tops.
        let mut puzzle = state("AABB/BBAA");
        let solver = Solver::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(puzzle.legal_moves(), vec![]);
        assert_eq!(solver.next_move(&mut puzzle, &mut rng), None);
    }

    #[test]
    fn search_leaves_the_state_untouched() {
        let config = PuzzleConfig {
            color_count: 3,
            capacity: 3,
            scramble_steps: 150,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut puzzle = generate(&config, &mut rng);
        let before = puzzle.clone();
        let solver = Solver::new();
        solver.next_move(&mut puzzle, &mut rng);
        assert_eq!(puzzle, before);
    }

    #[test]
    fn returned_move_is_always_legal() {
        let config = PuzzleConfig {
            color_count: 3,
            capacity: 3,
            scramble_steps: 150,
        };
        let solver = Solver::new();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut puzzle = generate(&config, &mut rng);
            for _ in 0..32 {
                let Some(action) = solver.next_move(&mut puzzle, &mut rng) else {
                    break;
                };
                assert!(puzzle.legal_moves().contains(&action));
                assert!(puzzle.apply(&action));
                if puzzle.is_solved() {
                    break;
                }
            }
        }
    }

    #[test]
    fn hints_solve_a_small_puzzle_end_to_end() {
        let config = PuzzleConfig {
            color_count: 2,
            capacity: 3,
            scramble_steps: 100,
        };
        let solver = Solver::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut puzzle = generate(&config, &mut rng);
        for _ in 0..64 {
            if puzzle.is_solved() {
                return;
            }
            let action = solver
                .next_move(&mut puzzle, &mut rng)
                .expect("a freshly generated puzzle should always yield a hint");
            puzzle.apply(&action);
        }
        panic!("hint moves did not converge: {}", puzzle.repr());
    }

    #[test]
    fn per_path_scope_also_finds_solutions() {
        let solver = Solver::with_options(SolverOptions {
            visited_scope: VisitedScope::PerPath,
        });
        let mut puzzle = state("ABB/BAA/.../...");
        let mut rng = StdRng::seed_from_u64(5);
        let action = solver.next_move(&mut puzzle, &mut rng);
        assert!(action.is_some());
    }
}
