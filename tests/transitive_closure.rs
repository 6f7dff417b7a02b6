//! Scenario: `a.x = b.y AND b.y = 5`, with indexes on both `a.x` and `b.y`.
//! Transitive closure should add a virtual `a.x = 5` term, so both tables
//! can be reached by a constant-equality lookup rather than one depending
//! on the other.

use rustql_planner::{analyse_expression, plan, ColumnRef, Expr, IndexColumn, IndexInfo, Literal, RightHandSide, TableInfo, WhereLoopFlags};

#[test]
fn virtual_constant_term_lets_both_tables_use_equality_lookups() {
    let a = TableInfo::new("a", 0, 10_000, vec!["x".into()])
        .with_index(IndexInfo::new("i_a_x", vec![IndexColumn::asc(0)]).unique());
    let b = TableInfo::new("b", 1, 10_000, vec!["y".into()])
        .with_index(IndexInfo::new("i_b_y", vec![IndexColumn::asc(0)]).unique());

    let expr = Expr::eq(
        ColumnRef::new(0, 0),
        RightHandSide::Column(ColumnRef::new(1, 0)),
    )
    .and(Expr::eq(
        ColumnRef::new(1, 0),
        RightHandSide::Literal(Literal::Integer(5)),
    ));

    let clause = analyse_expression(&expr);
    assert_eq!(clause.n_base, 2);
    let virt = clause
        .iter()
        .skip(clause.n_base)
        .find(|t| t.left == Some(ColumnRef::new(0, 0)))
        .expect("a.x = 5 virtual term must be derived");
    assert!(virt.is_virtual());
    assert_eq!(virt.right, Some(RightHandSide::Literal(Literal::Integer(5))));

    let info = plan(&[a, b], &expr).expect("plan should succeed");
    for cursor in [0usize, 1usize] {
        let chosen = info.chosen_loop_for(cursor).expect("table is visited");
        assert!(
            chosen.flags.contains(WhereLoopFlags::ONE_ROW),
            "table {cursor} should resolve via a unique equality lookup, not a join dependency"
        );
        assert_eq!(
            chosen.prereq.count(),
            0,
            "table {cursor}'s loop should need no other table once the constant has propagated"
        );
    }
}
