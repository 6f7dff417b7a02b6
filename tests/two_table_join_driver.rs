//! Scenario: two-table join where one table has a constant anchor; the
//! solver must place it first and make the second table's loop depend on
//! it.

use rustql_planner::{plan, ColumnRef, Expr, IndexColumn, IndexInfo, Literal, RightHandSide, TableInfo};

#[test]
fn constant_anchored_table_is_placed_before_its_dependent() {
    let customers = TableInfo::new("customers", 0, 10_000, vec!["id".into()])
        .with_index(IndexInfo::new("pk_customers", vec![IndexColumn::asc(0)]).primary_key());
    let orders = TableInfo::new("orders", 1, 100_000, vec!["customer_id".into()])
        .with_index(IndexInfo::new("i_orders_customer_id", vec![IndexColumn::asc(0)]));

    // customers.id = 123 AND orders.customer_id = customers.id
    let expr = Expr::eq(ColumnRef::new(0, 0), RightHandSide::Literal(Literal::Integer(123))).and(
        Expr::eq(
            ColumnRef::new(1, 0),
            RightHandSide::Column(ColumnRef::new(0, 0)),
        ),
    );

    let info = plan(&[customers, orders], &expr).expect("plan should succeed");
    let order: Vec<usize> = info.ordered_loops().map(|l| l.table_cursor).collect();
    assert_eq!(order, vec![0, 1], "customers must be placed before orders");

    let orders_loop = info.chosen_loop_for(1).unwrap();
    assert!(
        orders_loop.prereq.test(0),
        "orders' loop must depend on customers' bit"
    );
}
