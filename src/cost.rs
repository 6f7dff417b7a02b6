//! Cost-model constants and pure functions.
//!
//! Every constant here is a `LogEst`, i.e. logarithmic: adding two of them
//! corresponds to multiplying the linear-space quantities they stand in
//! for. The values themselves are fixed defaults, not tuning knobs. A
//! different per-row cost would make two query planners disagree on the
//! same input, which defeats the purpose of having named constants at all.

use crate::logest::{self, LogEst};

/// Cost of reading one row during a full table scan.
pub const FULL_SCAN_PER_ROW: LogEst = 100;
/// Cost of positioning an index cursor (B-tree seek).
pub const INDEX_SEEK: LogEst = 10;
/// Cost of advancing an already-positioned index cursor by one row.
pub const INDEX_NEXT: LogEst = 5;
/// Cost of a rowid/primary-key point lookup.
pub const ROWID_LOOKUP: LogEst = 19;

/// Selectivity of an equality comparison against an ordinary column
/// (~1/1024).
pub const SEL_EQ: LogEst = -10;
/// Selectivity of a range comparison (~1/8).
pub const SEL_RANGE: LogEst = -3;
/// Selectivity of an IN-list membership test.
pub const SEL_IN: LogEst = -7;
/// Selectivity of IS NULL.
pub const SEL_IS_NULL: LogEst = -20;

/// Sharper equality selectivity used when the right-hand side is one of
/// the small sentinel integers `{-1, 0, 1}`. Such values tend to be
/// flag/status columns with far fewer distinct values than a generic
/// equality comparison would assume.
pub const SEL_EQ_SENTINEL: LogEst = -50;

/// Does `value` fall in the small-integer sentinel set `{-1, 0, 1}` that
/// warrants the sharper equality selectivity?
pub fn is_sentinel_int(value: i64) -> bool {
    (-1..=1).contains(&value)
}

/// Selectivity to apply for an equality comparison, accounting for the
/// sentinel-constant special case.
pub fn equality_selectivity(rhs_is_sentinel_int: bool) -> LogEst {
    if rhs_is_sentinel_int {
        SEL_EQ_SENTINEL
    } else {
        SEL_EQ
    }
}

/// Estimated output rows of a full table scan reduced by the given list of
/// applicable selectivities (the truth probabilities of terms whose RHS
/// depends on nothing outside the scanned table).
pub fn full_scan_rows(table_rows: LogEst, selectivities: &[LogEst]) -> LogEst {
    selectivities
        .iter()
        .fold(table_rows, |rows, &sel| logest::apply_selectivity(rows, sel))
}

/// Cost of a full table scan: row count plus the per-row charge.
pub fn full_scan_cost(table_rows: LogEst) -> LogEst {
    logest::add(table_rows, FULL_SCAN_PER_ROW)
}

/// Cost of an index scan: one seek, plus `INDEX_NEXT` per expected output
/// row, plus (when the index does not cover every needed column) one
/// rowid lookup per expected output row.
pub fn index_scan_cost(expected_rows: LogEst, covering: bool) -> LogEst {
    let mut cost = logest::add(INDEX_SEEK, logest::add(expected_rows, INDEX_NEXT));
    if !covering {
        cost = logest::add(cost, logest::add(expected_rows, ROWID_LOOKUP));
    }
    cost
}

/// Cost of an IN-driven probe: the per-item equality lookup cost repeated
/// `list_size` times (in log space, `list_size` LogEst-added, i.e.
/// multiplied in linear space).
pub fn in_probe_cost(list_size: LogEst, per_item_cost: LogEst) -> LogEst {
    logest::add(list_size, per_item_cost)
}

/// Cost of a single-row rowid/primary-key lookup: one seek, no scan.
pub fn rowid_lookup_cost() -> LogEst {
    ROWID_LOOKUP
}

/// Cost of a skip-scan: once per distinct value of the unconstrained
/// leading column, pay a seek plus the later-column scan/filter cost.
pub fn skip_scan_cost(leading_distinct: LogEst, per_group_cost: LogEst) -> LogEst {
    logest::add(leading_distinct, logest::add(INDEX_SEEK, per_group_cost))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_detection() {
        assert!(is_sentinel_int(-1));
        assert!(is_sentinel_int(0));
        assert!(is_sentinel_int(1));
        assert!(!is_sentinel_int(2));
        assert!(!is_sentinel_int(-2));
    }

    #[test]
    fn sentinel_equality_is_sharper() {
        assert!(SEL_EQ_SENTINEL < SEL_EQ);
    }

    #[test]
    fn covering_index_scan_is_cheaper() {
        let covering = index_scan_cost(logest::from_int(10), true);
        let non_covering = index_scan_cost(logest::from_int(10), false);
        assert!(covering < non_covering);
    }

    #[test]
    fn full_scan_cost_grows_with_row_count() {
        let small = full_scan_cost(logest::from_int(10));
        let large = full_scan_cost(logest::from_int(1_000_000));
        assert!(large > small);
    }

    #[test]
    fn applying_two_equalities_never_increases_rows() {
        let table_rows = logest::from_int(1_000_000);
        let one = full_scan_rows(table_rows, &[SEL_EQ]);
        let two = full_scan_rows(table_rows, &[SEL_EQ, SEL_EQ]);
        assert!(two <= one);
    }
}
