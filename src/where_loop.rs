//! Per-table access-path enumeration: for one table, produce every
//! candidate `WhereLoop` a join could use to visit it (full scan, index
//! scans at every usable prefix length, IN-driven probes, rowid lookups,
//! skip-scans) as a flat list the path solver later chooses from, rather
//! than picking a single best plan inline.

use bitflags::bitflags;

use crate::bitmask::Bitmask;
use crate::cost;
use crate::logest::{self, LogEst};
use crate::schema::{IndexInfo, TableInfo};
use crate::where_term::{TermOp, WhereClause, WhereTerm};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WhereLoopFlags: u32 {
        /// A full, unindexed table scan.
        const FULL_SCAN    = 1 << 0;
        /// Uses a secondary or primary-key index.
        const INDEXED      = 1 << 1;
        /// First index column unconstrained, a later column is; probes
        /// once per distinct value of the leading column.
        const SKIP_SCAN    = 1 << 2;
        /// Fully constrained by equality against a unique index (or the
        /// rowid); produces at most one row.
        const ONE_ROW      = 1 << 3;
        /// Driven by an IN-list, probed once per list element.
        const IN_LOOP      = 1 << 4;
        /// At least one index column matched by equality.
        const COLUMN_EQ    = 1 << 5;
        /// At least one index column matched by a range comparison.
        const COLUMN_RANGE = 1 << 6;
        /// At least one index column matched by an IN-list.
        const COLUMN_IN    = 1 << 7;
        /// An upper-bound (`<`, `<=`) range term is applied.
        const TOP_LIMIT    = 1 << 8;
        /// A lower-bound (`>`, `>=`) range term is applied.
        const BTM_LIMIT    = 1 << 9;
        /// The index covers every column the caller needs, avoiding a
        /// rowid lookup per row.
        const IDX_ONLY     = 1 << 10;
        /// Uses the rowid / INTEGER PRIMARY KEY column directly.
        const IPK          = 1 << 11;
    }
}

/// Fallback distinct-value estimate for a skip-scan's leading column when
/// the index carries no prefix-1 statistic. Used only as a last resort;
/// a real `distinct_logest` stat is always preferred.
pub const SKIP_SCAN_DISTINCT_LOGEST: LogEst = 40;

/// One candidate access path for a single table.
#[derive(Debug, Clone)]
pub struct WhereLoop {
    pub table_cursor: usize,
    /// Tables that must already be placed before this loop can run.
    pub prereq: Bitmask,
    /// Always exactly this loop's own table bit.
    pub mask_self: Bitmask,
    pub setup_cost: LogEst,
    pub run_cost: LogEst,
    pub n_out: LogEst,
    pub flags: WhereLoopFlags,
    pub index_name: Option<String>,
    pub n_eq: usize,
    /// Term indices this loop consumes, for `explain()` and validation.
    pub consumed_terms: Vec<usize>,
}

impl WhereLoop {
    /// Total estimated cost of one invocation of this loop: setup plus
    /// the run cost.
    pub fn total_cost(&self) -> LogEst {
        logest::add(self.setup_cost, self.run_cost)
    }

    /// A coarse specificity ranking used to break cost ties, highest
    /// first: `ONE_ROW > COLUMN_EQ > COLUMN_RANGE > plain`.
    pub fn specificity(&self) -> u8 {
        if self.flags.contains(WhereLoopFlags::ONE_ROW) {
            3
        } else if self.flags.contains(WhereLoopFlags::COLUMN_EQ) {
            2
        } else if self.flags.contains(WhereLoopFlags::COLUMN_RANGE) {
            1
        } else {
            0
        }
    }

    fn rank(&self) -> (LogEst, LogEst, std::cmp::Reverse<u8>) {
        (self.total_cost(), self.n_out, std::cmp::Reverse(self.specificity()))
    }
}

impl PartialEq for WhereLoop {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}
impl Eq for WhereLoop {}
impl PartialOrd for WhereLoop {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for WhereLoop {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

struct MatchedColumn<'a> {
    term_idx: usize,
    term: &'a WhereTerm,
}

/// Walk `index`'s columns left to right, greedily matching one usable
/// term per column, stopping after the first range term or the first
/// unmatched column.
///
/// When more than one term matches a column (e.g. a join condition and a
/// virtual constant term derived from it by transitive closure), the term
/// with the fewest prerequisites wins: a constant-equality term needs no
/// other table placed first, so it is always at least as useful as a
/// join-dependent one matching the same column.
fn walk_index<'a>(
    index: &IndexInfo,
    clause: &'a WhereClause,
    cursor: usize,
) -> Vec<MatchedColumn<'a>> {
    let mut matched = Vec::new();
    for idx_col in &index.columns {
        let candidate = clause
            .terms_for(cursor)
            .filter(|(_, t)| t.op.is_index_usable())
            .filter(|(_, t)| t.left.is_some_and(|l| l.cursor == cursor && l.column == idx_col.table_column as i32))
            .min_by_key(|(_, t)| t.prereq_right.count());
        let Some((term_idx, term)) = candidate else {
            break;
        };
        let is_range = term.op.is_range();
        matched.push(MatchedColumn { term_idx, term });
        if is_range {
            break;
        }
    }
    matched
}

fn prereq_of(consumed: &[&MatchedColumn], own_cursor: usize) -> Bitmask {
    consumed
        .iter()
        .fold(Bitmask::EMPTY, |m, c| m | c.term.prereq_right)
        & !Bitmask::for_cursor(own_cursor)
}

fn rows_for_equalities(table: &TableInfo, index: &IndexInfo, n_eq: usize) -> LogEst {
    if n_eq == 0 {
        return table.row_count;
    }
    if let Some(stats) = &index.stats {
        if let Some(rows) = stats.rows_for_prefix(n_eq) {
            return rows;
        }
    }
    let mut rows = table.row_count;
    for _ in 0..n_eq {
        rows = logest::apply_selectivity(rows, cost::SEL_EQ);
    }
    rows
}

/// Emit the full-scan loop and every index-scan prefix candidate for one
/// table.
pub fn build_loops(table: &TableInfo, clause: &WhereClause, needed_columns: &[usize]) -> Vec<WhereLoop> {
    let mut loops = Vec::new();
    let self_mask = table.mask();

    // 1. Full scan: always emitted.
    let applicable: Vec<&WhereTerm> = clause
        .terms_for(table.cursor)
        .filter(|(_, t)| t.prereq_all.is_subset_of(self_mask))
        .map(|(_, t)| t)
        .collect();
    let full_scan_rows = cost::full_scan_rows(
        table.row_count,
        &applicable.iter().map(|t| t.truth_prob).collect::<Vec<_>>(),
    );
    loops.push(WhereLoop {
        table_cursor: table.cursor,
        prereq: Bitmask::EMPTY,
        mask_self: self_mask,
        setup_cost: 0,
        run_cost: cost::full_scan_cost(full_scan_rows),
        n_out: full_scan_rows,
        flags: WhereLoopFlags::FULL_SCAN,
        index_name: None,
        n_eq: 0,
        consumed_terms: Vec::new(),
    });

    // 2. Index scans, one candidate per usable prefix length.
    for index in &table.indexes {
        let matched = walk_index(index, clause, table.cursor);
        if matched.is_empty() {
            continue;
        }
        for k in 1..=matched.len() {
            let prefix = &matched[..k];
            let terminal_is_range = prefix.last().is_some_and(|m| m.term.op.is_range());
            let n_eq = if terminal_is_range { k - 1 } else { k };
            let refs: Vec<&MatchedColumn> = prefix.iter().collect();
            let prereq = prereq_of(&refs, table.cursor);

            let mut rows = rows_for_equalities(table, index, n_eq);
            if terminal_is_range {
                rows = logest::apply_selectivity(rows, cost::SEL_RANGE);
            }

            let one_row = index.unique && n_eq == index.len() && !terminal_is_range;
            if one_row {
                rows = 0;
            }

            let covering = index.covers(needed_columns);
            let run_cost = cost::index_scan_cost(rows, covering);

            let mut flags = WhereLoopFlags::INDEXED;
            if n_eq > 0 {
                flags |= WhereLoopFlags::COLUMN_EQ;
            }
            if terminal_is_range {
                flags |= WhereLoopFlags::COLUMN_RANGE;
                match prefix.last().unwrap().term.op {
                    TermOp::Lt | TermOp::Le => flags |= WhereLoopFlags::TOP_LIMIT,
                    TermOp::Gt | TermOp::Ge => flags |= WhereLoopFlags::BTM_LIMIT,
                    _ => {}
                }
            }
            if one_row {
                flags |= WhereLoopFlags::ONE_ROW;
            }
            if covering {
                flags |= WhereLoopFlags::IDX_ONLY;
            }

            loops.push(WhereLoop {
                table_cursor: table.cursor,
                prereq,
                mask_self: self_mask,
                setup_cost: 0,
                run_cost,
                n_out: rows,
                flags,
                index_name: Some(index.name.clone()),
                n_eq,
                consumed_terms: prefix.iter().map(|m| m.term_idx).collect(),
            });
        }

        // 3. IN-driven probing: an IN term sitting immediately after the
        // longest pure-equality prefix gets its own loop, repeated once
        // per list element.
        let eq_prefix_len = matched
            .iter()
            .take_while(|m| matches!(m.term.op, TermOp::Eq | TermOp::Is))
            .count();
        if let Some(in_col) = index.columns.get(eq_prefix_len) {
            if let Some((term_idx, term)) = clause
                .terms_for(table.cursor)
                .find(|(_, t)| t.op == TermOp::In && t.left.is_some_and(|l| l.cursor == table.cursor && l.column == in_col.table_column as i32))
            {
                let list_size = match &term.right {
                    Some(crate::expr::RightHandSide::List(items)) => logest::from_int(items.len() as i64),
                    _ => logest::from_int(1),
                };
                let base_rows = rows_for_equalities(table, index, eq_prefix_len + 1);
                let per_item_cost = cost::index_scan_cost(base_rows, index.covers(needed_columns));
                let mut prereq_refs: Vec<&MatchedColumn> = matched[..eq_prefix_len].iter().collect();
                let in_entry = MatchedColumn { term_idx, term };
                prereq_refs.push(&in_entry);
                let prereq = prereq_of(&prereq_refs, table.cursor);

                loops.push(WhereLoop {
                    table_cursor: table.cursor,
                    prereq,
                    mask_self: self_mask,
                    setup_cost: 0,
                    run_cost: cost::in_probe_cost(list_size, per_item_cost),
                    n_out: logest::add(base_rows, list_size),
                    flags: WhereLoopFlags::INDEXED
                        | WhereLoopFlags::IN_LOOP
                        | WhereLoopFlags::COLUMN_IN
                        | WhereLoopFlags::COLUMN_EQ,
                    index_name: Some(index.name.clone()),
                    n_eq: eq_prefix_len,
                    consumed_terms: matched[..eq_prefix_len]
                        .iter()
                        .map(|m| m.term_idx)
                        .chain(std::iter::once(term_idx))
                        .collect(),
                });
            }
        }

        // 5. Skip-scan: only when the first column is unconstrained but a
        // later one is, and only if cheaper than the full scan.
        if matched.is_empty() {
            if let Some((second_idx, second_term)) = index.columns.iter().enumerate().skip(1).find_map(|(pos, col)| {
                clause
                    .terms_for(table.cursor)
                    .filter(|(_, t)| t.op.is_index_usable())
                    .find(|(_, t)| t.left.is_some_and(|l| l.cursor == table.cursor && l.column == col.table_column as i32))
                    .map(|(idx, t)| (pos, (idx, t)))
                    .map(|(_, pair)| pair)
            }) {
                let leading_distinct = index
                    .stats
                    .as_ref()
                    .and_then(|s| s.distinct_for_prefix(1))
                    .unwrap_or(SKIP_SCAN_DISTINCT_LOGEST);
                let per_group_rows = rows_for_equalities(table, index, 1);
                let per_group_cost = cost::index_scan_cost(per_group_rows, index.covers(needed_columns));
                let run_cost = cost::skip_scan_cost(leading_distinct, per_group_cost);
                if run_cost < cost::full_scan_cost(table.row_count) {
                    let sel = if second_term.op.is_range() { cost::SEL_RANGE } else { cost::SEL_EQ };
                    let rows = logest::apply_selectivity(table.row_count, sel);
                    loops.push(WhereLoop {
                        table_cursor: table.cursor,
                        prereq: second_term.prereq_right & !Bitmask::for_cursor(table.cursor),
                        mask_self: self_mask,
                        setup_cost: 0,
                        run_cost,
                        n_out: rows,
                        flags: WhereLoopFlags::INDEXED | WhereLoopFlags::SKIP_SCAN,
                        index_name: Some(index.name.clone()),
                        n_eq: 0,
                        consumed_terms: vec![second_idx],
                    });
                }
            }
        }
    }

    // 4. Rowid / primary-key equality lookup.
    if let Some(rowid_col) = table.rowid_alias {
        if let Some((term_idx, _)) = clause
            .terms_for(table.cursor)
            .find(|(_, t)| t.op == TermOp::Eq && t.left.is_some_and(|l| l.cursor == table.cursor && (l.column == rowid_col as i32 || l.column == -1)))
        {
            loops.push(WhereLoop {
                table_cursor: table.cursor,
                prereq: Bitmask::EMPTY,
                mask_self: self_mask,
                setup_cost: 0,
                run_cost: cost::rowid_lookup_cost(),
                n_out: 0,
                flags: WhereLoopFlags::ONE_ROW | WhereLoopFlags::IPK | WhereLoopFlags::COLUMN_EQ,
                index_name: None,
                n_eq: 1,
                consumed_terms: vec![term_idx],
            });
        }
    }

    loops
}
