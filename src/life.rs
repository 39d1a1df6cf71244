//! Conway's Game of Life on a board distributed across the world.
//!
//! The board covers the grid domain: the `height x width` compute region plus a one cell
//! halo on every edge. Halo cells are always dead and never updated, so interior cells can
//! read their full 3x3 neighbourhood without bounds checks.
use crate::array::PartitionedArray;
use crate::domain::{Domain, Edge, Range, Subdomain};
use crate::error::EngineResult;
use crate::World;

use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Dead,
    Alive,
}

/// The state of a cell in the next generation, given its `neighbours` alive cells
/// (excluding itself).
pub fn next_state(current: State, neighbours: usize) -> State {
    match (current, neighbours) {
        (State::Alive, 2) | (_, 3) => State::Alive,
        _ => State::Dead,
    }
}

/// A [Domain] of cells stored in a [PartitionedArray], linearized with [Domain::project].
#[derive(Clone, Debug)]
pub struct Board {
    domain: Domain,
    values: PartitionedArray<State>,
}

impl Board {
    /// Allocate a board of dead cells covering `domain`
    pub fn new(world: &World, domain: Domain) -> Board {
        Board {
            domain,
            values: PartitionedArray::new(world, domain.size()),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn values(&self) -> &PartitionedArray<State> {
        &self.values
    }

    /// Linear offset of cell `(i, j)` in the backing array
    pub fn offset(&self, i: i64, j: i64) -> usize {
        self.domain.project(i, j)
    }

    pub fn get(&self, i: i64, j: i64) -> State {
        self.values.read(self.offset(i, j))
    }

    pub fn set(&self, i: i64, j: i64, state: State) {
        self.values.write(self.offset(i, j), state)
    }

    /// Set cell `(i, j)` without waiting, see [PartitionedArray::write_async]
    pub fn set_async(&self, i: i64, j: i64, state: State) {
        self.values.write_async(self.offset(i, j), state)
    }

    /// Number of alive cells in the 3x3 block centred on `(i, j)`, including `(i, j)` itself
    pub fn count_alive_block(&self, i: i64, j: i64) -> usize {
        let mut alive = 0;
        for jj in j - 1..=j + 1 {
            for ii in i - 1..=i + 1 {
                if self.get(ii, jj) == State::Alive {
                    alive += 1;
                }
            }
        }
        alive
    }

    /// Number of alive cells in the region `x` by `y`, counted in parallel into a shared
    /// counter.
    pub fn count_alive(&self, x: Range, y: Range) -> EngineResult<usize> {
        let region = Domain::new(x, y);
        let counter = PartitionedArray::<usize>::new(self.values.world(), 1);
        let c = counter.clone();
        let board = self.clone();
        self.for_each_cell(region, move |i, j| {
            if board.get(i, j) == State::Alive {
                c.add(0, 1);
            }
        })?;
        Ok(counter.read(0))
    }

    /// Number of alive cells on the whole board
    pub fn population(&self) -> EngineResult<usize> {
        self.count_alive(self.domain.x, self.domain.y)
    }

    /// Call `op(i, j)` for every cell of `region`, in parallel across the world
    pub fn for_each_cell<F>(&self, region: Domain, op: F) -> EngineResult<()>
    where
        F: Fn(i64, i64) + Send + Sync + 'static,
    {
        self.values.world().forall(0..region.size(), move |p| {
            let (i, j) = region.unproject(p);
            op(i, j)
        })
    }

    /// Copy every cell of `other`, which must cover the same domain
    pub fn assign(&self, other: &Board) -> EngineResult<()> {
        assert_eq!(
            self.domain, other.domain,
            "cannot assign boards over different domains"
        );
        if Arc::ptr_eq(&self.values.inner, &other.values.inner) {
            return Ok(());
        }
        let src = other.values.clone();
        self.values.for_each_mut(move |index, state| *state = src.read(index))
    }
}

/// A Game of Life simulation: the live board, a scratch board for the next generation and
/// the compute region (the board minus its halo).
#[derive(Debug)]
pub struct Life {
    board: Board,
    scratch: Board,
    compute: Domain,
    generation: usize,
}

impl Life {
    /// A `height x width` simulation of dead cells, `height` indexing `i` and `width` `j`.
    /// Interior cells are `1..=height` by `1..=width`.
    pub fn new(world: &World, height: usize, width: usize) -> Life {
        let compute = Domain::new(
            Range::new(1, height as i64 + 1),
            Range::new(1, width as i64 + 1),
        );
        let grid = Subdomain::new(compute).expand(&Edge::ALL, 1);
        tracing::debug!(?compute, ?grid, "life board allocated");
        Life {
            board: Board::new(world, grid),
            scratch: Board::new(world, grid),
            compute,
            generation: 0,
        }
    }

    /// The current generation's board
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn compute_domain(&self) -> Domain {
        self.compute
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Mark `cells` alive.
    ///
    /// Panics if a cell lies outside the compute region.
    pub fn seed(&self, cells: &[(i64, i64)]) {
        for &(i, j) in cells {
            assert!(
                self.compute.contains(i, j),
                "seed cell ({:?},{:?}) outside compute domain {:?}",
                i,
                j,
                self.compute
            );
            self.board.set(i, j, State::Alive);
        }
    }

    /// Advance one generation.
    ///
    /// Every interior cell of the next generation is computed from the current board into
    /// the scratch board, then the two boards are swapped. Halo cells of both boards stay
    /// dead.
    pub fn step(&mut self) -> EngineResult<()> {
        let current = self.board.clone();
        let next = self.scratch.clone();
        self.board.for_each_cell(self.compute, move |i, j| {
            let state = current.get(i, j);
            let mut neighbours = current.count_alive_block(i, j);
            if state == State::Alive {
                neighbours -= 1;
            }
            next.set_async(i, j, next_state(state, neighbours));
        })?;
        std::mem::swap(&mut self.board, &mut self.scratch);
        self.generation += 1;
        Ok(())
    }

    /// Advance `generations` generations, calling `observer` with the generation number and
    /// the board once each generation is complete.
    pub fn run<F>(&mut self, generations: usize, mut observer: F) -> EngineResult<()>
    where
        F: FnMut(usize, &Board),
    {
        for _ in 0..generations {
            let _span = tracing::info_span!("life", generation = self.generation + 1).entered();
            self.step()?;
            observer(self.generation, &self.board);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule() {
        assert_eq!(State::Dead, next_state(State::Alive, 0));
        assert_eq!(State::Dead, next_state(State::Alive, 1));
        assert_eq!(State::Alive, next_state(State::Alive, 2));
        assert_eq!(State::Alive, next_state(State::Alive, 3));
        assert_eq!(State::Dead, next_state(State::Alive, 4));
        assert_eq!(State::Dead, next_state(State::Dead, 2));
        assert_eq!(State::Alive, next_state(State::Dead, 3));
        for n in [0, 1, 4, 5, 6, 7, 8] {
            assert_eq!(State::Dead, next_state(State::Dead, n));
        }
    }
}
