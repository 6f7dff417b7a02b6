//! The join-order solver: dynamic programming by number of tables placed,
//! keeping more than one survivor per level (a beam) rather than committing
//! to a single best loop per table while permuting whole table orders.

use crate::bitmask::Bitmask;
use crate::logest::{self, LogEst};
use crate::where_loop::WhereLoop;

/// Default number of survivors kept at each DP level.
pub const DEFAULT_BEAM_WIDTH: usize = 5;

/// A partial (or complete) join order under construction.
#[derive(Debug, Clone)]
pub struct WherePath {
    pub mask_loop: Bitmask,
    pub cost: LogEst,
    pub rows: LogEst,
    pub loops: Vec<usize>,
}

impl WherePath {
    fn empty() -> Self {
        WherePath {
            mask_loop: Bitmask::EMPTY,
            cost: 0,
            rows: 0,
            loops: Vec::new(),
        }
    }

    fn rank(&self) -> (LogEst, LogEst) {
        (self.cost, self.rows)
    }
}

/// Extend every surviving path at the current level by every loop whose
/// table isn't already placed and whose prerequisites are satisfied, keep
/// the `beam_width` cheapest results, and repeat until every table has
/// been placed. Returns `None` if any level yields zero survivors (a
/// dependency cycle in the input terms).
pub fn solve(loops: &[WhereLoop], table_count: usize, beam_width: usize) -> Option<WherePath> {
    if table_count == 0 {
        return Some(WherePath::empty());
    }

    let mut frontier = vec![WherePath::empty()];

    for _level in 0..table_count {
        let mut next = Vec::new();
        for path in &frontier {
            for (loop_idx, candidate) in loops.iter().enumerate() {
                if path.mask_loop.test(candidate.table_cursor) {
                    continue;
                }
                if !candidate.prereq.is_subset_of(path.mask_loop) {
                    continue;
                }
                // `path.rows` is the multiplicative accumulator: 0 (LogEst
                // identity for "1") before any loop is placed, so the run
                // cost of the first loop is charged exactly once.
                let run_once = logest::add(candidate.setup_cost, candidate.run_cost);
                let cost = logest::add(path.cost, logest::add(run_once, path.rows));
                let rows = logest::add(path.rows, candidate.n_out);
                let mut mask_loop = path.mask_loop;
                mask_loop.set(candidate.table_cursor);
                let mut loops_so_far = path.loops.clone();
                loops_so_far.push(loop_idx);
                next.push(WherePath {
                    mask_loop,
                    cost,
                    rows,
                    loops: loops_so_far,
                });
            }
        }

        if next.is_empty() {
            return None;
        }

        next.sort_by(|a, b| a.rank().cmp(&b.rank()));
        next.truncate(beam_width.max(1));
        frontier = next;
    }

    frontier.into_iter().min_by(|a, b| a.rank().cmp(&b.rank()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::where_loop::WhereLoopFlags;

    fn loop_for(table_cursor: usize, prereq: Bitmask, cost: LogEst, rows: LogEst) -> WhereLoop {
        WhereLoop {
            table_cursor,
            prereq,
            mask_self: Bitmask::for_cursor(table_cursor),
            setup_cost: 0,
            run_cost: cost,
            n_out: rows,
            flags: WhereLoopFlags::FULL_SCAN,
            index_name: None,
            n_eq: 0,
            consumed_terms: Vec::new(),
        }
    }

    #[test]
    fn single_table_picks_cheapest_loop_with_no_prereq() {
        let loops = vec![
            loop_for(0, Bitmask::EMPTY, 100, 50),
            loop_for(0, Bitmask::EMPTY, 10, 5),
        ];
        let path = solve(&loops, 1, DEFAULT_BEAM_WIDTH).unwrap();
        assert_eq!(path.loops.len(), 1);
        assert_eq!(loops[path.loops[0]].run_cost, 10);
    }

    #[test]
    fn every_table_appears_exactly_once() {
        let loops = vec![
            loop_for(0, Bitmask::EMPTY, 10, 5),
            loop_for(1, Bitmask::for_cursor(0), 10, 5),
        ];
        let path = solve(&loops, 2, DEFAULT_BEAM_WIDTH).unwrap();
        assert_eq!(path.loops.len(), 2);
        assert_eq!(path.mask_loop, Bitmask::for_cursor(0) | Bitmask::for_cursor(1));
    }

    #[test]
    fn dependency_cycle_yields_no_survivors() {
        // Table 0 depends on table 1 and vice versa, with no unconditional
        // loop for either: no valid order exists.
        let loops = vec![
            loop_for(0, Bitmask::for_cursor(1), 10, 5),
            loop_for(1, Bitmask::for_cursor(0), 10, 5),
        ];
        assert!(solve(&loops, 2, DEFAULT_BEAM_WIDTH).is_none());
    }

    #[test]
    fn beam_width_keeps_top_n_survivors_per_level() {
        let mut loops = Vec::new();
        for i in 0..10 {
            loops.push(loop_for(0, Bitmask::EMPTY, 10 + i, 5));
        }
        loops.push(loop_for(1, Bitmask::for_cursor(0), 10, 5));
        let path = solve(&loops, 2, 3).unwrap();
        assert_eq!(path.loops.len(), 2);
    }
}
