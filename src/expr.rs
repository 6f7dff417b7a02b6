//! A minimal expression tree for WHERE clauses.
//!
//! The SQL parser is an external collaborator; this crate does not depend
//! on any particular SQL grammar's full AST. Instead it defines a small
//! tagged representation (column reference, literal, binary comparison,
//! AND, OR) with two capabilities every variant supports: rendering to a
//! human-readable string and computing the bitmask of tables it
//! references.

use crate::bitmask::Bitmask;

/// A column reference: which table (by FROM-list cursor) and which column
/// on that table (by ordinal), or -1 for the rowid/INTEGER PRIMARY KEY
/// alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnRef {
    pub cursor: usize,
    pub column: i32,
}

impl ColumnRef {
    pub fn new(cursor: usize, column: i32) -> Self {
        ColumnRef { cursor, column }
    }

    pub fn rowid(cursor: usize) -> Self {
        ColumnRef { cursor, column: -1 }
    }
}

/// A literal value appearing on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Real(x) => write!(f, "{x}"),
            Literal::Text(s) => write!(f, "'{s}'"),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

/// Binary comparison operators the planner recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    In,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Is => "IS",
            CompareOp::In => "IN",
        };
        f.write_str(s)
    }
}

/// The right-hand side of a comparison: a constant, a list (for IN), or a
/// reference to a column on another table (a join condition).
#[derive(Debug, Clone, PartialEq)]
pub enum RightHandSide {
    Literal(Literal),
    List(Vec<Literal>),
    Column(ColumnRef),
}

/// A WHERE expression. Five variants: column reference and literal are the
/// leaves, `Compare` is a binary comparison, `IsNull` is the single-operand
/// NULL test, and `And`/`Or` connect subexpressions. Kept deliberately
/// small since the SQL parser that would otherwise produce a full AST is
/// out of scope here.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    Compare {
        op: CompareOp,
        left: ColumnRef,
        right: RightHandSide,
    },
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eq(left: ColumnRef, right: RightHandSide) -> Expr {
        Expr::Compare {
            op: CompareOp::Eq,
            left,
            right,
        }
    }

    pub fn compare(op: CompareOp, left: ColumnRef, right: RightHandSide) -> Expr {
        Expr::Compare { op, left, right }
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// The bitmask of tables this expression references, used for
    /// `prereq_all`/`prereq_right` computation during WHERE-term analysis.
    pub fn referenced_tables(&self) -> Bitmask {
        match self {
            Expr::Column(col) => Bitmask::for_cursor(col.cursor),
            Expr::Literal(_) => Bitmask::EMPTY,
            Expr::Compare { left, right, .. } => {
                let mut mask = Bitmask::for_cursor(left.cursor);
                if let RightHandSide::Column(col) = right {
                    mask = mask | Bitmask::for_cursor(col.cursor);
                }
                mask
            }
            Expr::IsNull { column, .. } => Bitmask::for_cursor(column.cursor),
            Expr::And(a, b) | Expr::Or(a, b) => a.referenced_tables() | b.referenced_tables(),
        }
    }

    /// Render this expression in a human-readable form, e.g. `a.x = 5`.
    /// Used by `explain()` to show bound constraints.
    pub fn render(&self, table_names: &[&str]) -> String {
        let name = |cursor: usize| -> String {
            table_names
                .get(cursor)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("t{cursor}"))
        };
        let col = |c: &ColumnRef| -> String {
            if c.column < 0 {
                format!("{}.rowid", name(c.cursor))
            } else {
                format!("{}.c{}", name(c.cursor), c.column)
            }
        };
        match self {
            Expr::Column(c) => col(c),
            Expr::Literal(lit) => lit.to_string(),
            Expr::Compare { op, left, right } => {
                let rhs = match right {
                    RightHandSide::Literal(lit) => lit.to_string(),
                    RightHandSide::List(items) => {
                        let parts: Vec<String> = items.iter().map(|l| l.to_string()).collect();
                        format!("({})", parts.join(", "))
                    }
                    RightHandSide::Column(c) => col(c),
                };
                format!("{} {} {}", col(left), op, rhs)
            }
            Expr::IsNull { column, negated } => {
                format!("{} IS {}NULL", col(column), if *negated { "NOT " } else { "" })
            }
            Expr::And(a, b) => format!("({} AND {})", a.render(table_names), b.render(table_names)),
            Expr::Or(a, b) => format!("({} OR {})", a.render(table_names), b.render(table_names)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_usage_is_single_bit() {
        let e = Expr::eq(ColumnRef::new(1, 0), RightHandSide::Literal(Literal::Integer(5)));
        let mask = e.referenced_tables();
        assert!(mask.test(1));
        assert!(!mask.test(0));
    }

    #[test]
    fn join_condition_references_both_tables() {
        let e = Expr::eq(
            ColumnRef::new(0, 0),
            RightHandSide::Column(ColumnRef::new(1, 2)),
        );
        let mask = e.referenced_tables();
        assert!(mask.test(0) && mask.test(1));
    }

    #[test]
    fn and_unions_child_masks() {
        let a = Expr::eq(ColumnRef::new(0, 0), RightHandSide::Literal(Literal::Integer(1)));
        let b = Expr::eq(ColumnRef::new(1, 0), RightHandSide::Literal(Literal::Integer(2)));
        let combined = a.and(b);
        let mask = combined.referenced_tables();
        assert!(mask.test(0) && mask.test(1));
    }

    #[test]
    fn render_shows_column_and_operator() {
        let e = Expr::eq(ColumnRef::new(0, 1), RightHandSide::Literal(Literal::Integer(5)));
        assert_eq!(e.render(&["users"]), "users.c1 = 5");
    }
}
