//! Human-readable plan rendering: one `N. SEARCH/SCAN ...` line per loop,
//! in join order, followed by its total cost and row estimate.

use crate::logest;
use crate::planner::WhereInfo;
use crate::schema::TableInfo;
use crate::where_loop::WhereLoopFlags;

/// Render the chosen plan as one line per loop, in join order, followed by
/// its cost and row estimate.
pub fn explain(info: &WhereInfo, tables: &[TableInfo]) -> String {
    let mut out = String::new();
    for (i, l) in info.ordered_loops().enumerate() {
        let table_name = tables
            .iter()
            .find(|t| t.cursor == l.table_cursor)
            .map(|t| t.name.as_str())
            .unwrap_or("?");

        let detail = if l.flags.contains(WhereLoopFlags::INDEXED) || l.flags.contains(WhereLoopFlags::IPK) {
            let index_label = l.index_name.as_deref().unwrap_or("rowid");
            let bound = consumed_terms_summary(info, l);
            format!("SEARCH {table_name} USING INDEX {index_label} ({bound})")
        } else {
            format!("SCAN {table_name}")
        };

        out.push_str(&format!("{}. {}\n", i + 1, detail));
        out.push_str(&format!(
            "   Cost: {}, Rows: {}\n",
            l.total_cost(),
            logest::to_int(l.n_out)
        ));
    }
    out
}

fn consumed_terms_summary(info: &WhereInfo, l: &crate::where_loop::WhereLoop) -> String {
    let parts: Vec<String> = l
        .consumed_terms
        .iter()
        .filter_map(|&idx| info.term(idx))
        .filter_map(|t| t.left.map(|left| (left, t.op)))
        .map(|(left, op)| {
            let op_str = match op {
                crate::where_term::TermOp::Eq => "=",
                crate::where_term::TermOp::Lt => "<",
                crate::where_term::TermOp::Le => "<=",
                crate::where_term::TermOp::Gt => ">",
                crate::where_term::TermOp::Ge => ">=",
                crate::where_term::TermOp::In => "IN",
                crate::where_term::TermOp::Is => "IS",
                crate::where_term::TermOp::IsNull => "IS NULL",
                crate::where_term::TermOp::Or => "OR",
            };
            format!("c{}{op_str}?", left.column)
        })
        .collect();
    parts.join(", ")
}
