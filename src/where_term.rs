//! The WHERE-term model: per-atomic-comparison analysis, AND-splitting,
//! and transitive closure across equality chains.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::bitmask::Bitmask;
use crate::cost;
use crate::expr::{ColumnRef, CompareOp, Expr, Literal, RightHandSide};
use crate::logest::LogEst;

/// The operator an atomic WHERE term carries. The first eight are
/// index-usable; `Or` never drives an index lookup by itself and is kept
/// only for selectivity bookkeeping and explain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Is,
    IsNull,
    Or,
}

impl TermOp {
    /// Can a column be matched against this operator while building an
    /// index scan?
    pub fn is_index_usable(self) -> bool {
        !matches!(self, TermOp::Or)
    }

    /// Does this operator terminate the index-column walk (a range-style
    /// bound rather than an equality)?
    pub fn is_range(self) -> bool {
        matches!(self, TermOp::Lt | TermOp::Le | TermOp::Gt | TermOp::Ge)
    }

    fn from_compare(op: CompareOp) -> TermOp {
        match op {
            CompareOp::Eq => TermOp::Eq,
            CompareOp::Lt => TermOp::Lt,
            CompareOp::Le => TermOp::Le,
            CompareOp::Gt => TermOp::Gt,
            CompareOp::Ge => TermOp::Ge,
            CompareOp::Is => TermOp::Is,
            CompareOp::In => TermOp::In,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WhereTermFlags: u32 {
        /// Generated by transitive closure rather than present in the
        /// original expression; must not re-narrow a selectivity already
        /// applied by its source term.
        const VIRTUAL = 1 << 0;
        /// Already consumed by a loop chosen during path construction.
        const CODED   = 1 << 1;
        /// A LIKE comparison with a usable literal prefix.
        const LIKE    = 1 << 2;
        /// The term is a single OR-connected disjunction.
        const OR      = 1 << 3;
    }
}

/// One atomic condition extracted from a WHERE expression.
#[derive(Debug, Clone)]
pub struct WhereTerm {
    pub op: TermOp,
    /// Left-hand column, `None` only for an `Or` term (no single driving
    /// column).
    pub left: Option<ColumnRef>,
    pub right: Option<RightHandSide>,
    /// The full disjunction, for `Or` terms.
    pub or_clause: Option<Expr>,
    /// Tables the right-hand side depends on.
    pub prereq_right: Bitmask,
    /// Every table this term references, left and right combined.
    pub prereq_all: Bitmask,
    /// Estimated selectivity, always `<= 0`.
    pub truth_prob: LogEst,
    pub flags: WhereTermFlags,
    /// Index of the term this one was derived from, for virtual terms.
    pub parent: Option<usize>,
}

impl WhereTerm {
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(WhereTermFlags::VIRTUAL)
    }

    pub fn is_coded(&self) -> bool {
        self.flags.contains(WhereTermFlags::CODED)
    }

    /// Is this term usable when building a loop for table `cursor`? Per
    /// the data model: only when `cursor`'s bit is absent from
    /// `prereq_right` (a term whose right-hand side depends on the very
    /// table being scanned cannot drive that scan).
    pub fn usable_for(&self, cursor: usize) -> bool {
        !self.prereq_right.test(cursor)
    }
}

/// An ordered, AND-connected list of terms.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    terms: Vec<WhereTerm>,
    /// Number of terms present before transitive closure added virtual
    /// ones.
    pub n_base: usize,
}

impl WhereClause {
    pub fn new() -> Self {
        WhereClause {
            terms: Vec::new(),
            n_base: 0,
        }
    }

    pub fn push(&mut self, term: WhereTerm) -> usize {
        let idx = self.terms.len();
        self.terms.push(term);
        idx
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&WhereTerm> {
        self.terms.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WhereTerm> {
        self.terms.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WhereTerm> {
        self.terms.iter_mut()
    }

    pub fn mark_coded(&mut self, idx: usize) {
        if let Some(term) = self.terms.get_mut(idx) {
            term.flags.insert(WhereTermFlags::CODED);
        }
    }

    /// Terms usable as drivers for `cursor`'s loop: not yet coded, and
    /// either self-contained or dependent only on tables other than
    /// `cursor`.
    pub fn terms_for(&self, cursor: usize) -> impl Iterator<Item = (usize, &WhereTerm)> {
        self.terms
            .iter()
            .enumerate()
            .filter(move |(_, t)| !t.is_coded() && t.usable_for(cursor))
    }
}

fn and_split<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::And(a, b) => {
            and_split(a, out);
            and_split(b, out);
        }
        other => out.push(other),
    }
}

fn selectivity_of(op: TermOp, right: &Option<RightHandSide>) -> LogEst {
    match op {
        TermOp::Eq | TermOp::Is => {
            let sentinel = matches!(
                right,
                Some(RightHandSide::Literal(Literal::Integer(n))) if cost::is_sentinel_int(*n)
            );
            cost::equality_selectivity(sentinel)
        }
        TermOp::Lt | TermOp::Le | TermOp::Gt | TermOp::Ge => cost::SEL_RANGE,
        TermOp::In => cost::SEL_IN,
        TermOp::IsNull => cost::SEL_IS_NULL,
        TermOp::Or => cost::SEL_RANGE,
    }
}

/// Build a `WhereTerm` from one atomic (non-AND) expression node.
fn analyze_atom(expr: &Expr) -> WhereTerm {
    match expr {
        Expr::Compare { op, left, right } => {
            let op = TermOp::from_compare(*op);
            let prereq_right = match right {
                RightHandSide::Column(c) => Bitmask::for_cursor(c.cursor),
                _ => Bitmask::EMPTY,
            };
            let prereq_all = prereq_right | Bitmask::for_cursor(left.cursor);
            WhereTerm {
                truth_prob: selectivity_of(op, &Some(right.clone())),
                op,
                left: Some(*left),
                right: Some(right.clone()),
                or_clause: None,
                prereq_right,
                prereq_all,
                flags: WhereTermFlags::empty(),
                parent: None,
            }
        }
        Expr::IsNull { column, negated: _ } => WhereTerm {
            op: TermOp::IsNull,
            left: Some(*column),
            right: None,
            or_clause: None,
            prereq_right: Bitmask::EMPTY,
            prereq_all: Bitmask::for_cursor(column.cursor),
            truth_prob: cost::SEL_IS_NULL,
            flags: WhereTermFlags::empty(),
            parent: None,
        },
        Expr::Or(..) => {
            let prereq_all = expr.referenced_tables();
            WhereTerm {
                op: TermOp::Or,
                left: None,
                right: None,
                or_clause: Some(expr.clone()),
                prereq_right: prereq_all,
                prereq_all,
                truth_prob: cost::SEL_RANGE,
                flags: WhereTermFlags::OR,
                parent: None,
            }
        }
        // A bare column or literal has no comparison operator; treat as
        // always-true (no selectivity), referencing whatever it touches.
        Expr::Column(_) | Expr::Literal(_) | Expr::And(..) => WhereTerm {
            op: TermOp::Is,
            left: None,
            right: None,
            or_clause: None,
            prereq_right: Bitmask::EMPTY,
            prereq_all: expr.referenced_tables(),
            truth_prob: 0,
            flags: WhereTermFlags::empty(),
            parent: None,
        },
    }
}

/// AND-split `expr` and analyze each conjunct into a base `WhereTerm`.
pub fn analyze(expr: &Expr) -> WhereClause {
    let mut atoms = Vec::new();
    and_split(expr, &mut atoms);

    let mut clause = WhereClause::new();
    for atom in atoms {
        clause.push(analyze_atom(atom));
    }
    clause.n_base = clause.len();
    apply_transitive_closure(&mut clause);
    clause
}

/// Union-find over `(cursor, column)` identities, used to group columns
/// connected by `column = column` equalities.
struct DisjointColumns {
    parent: HashMap<ColumnRef, ColumnRef>,
}

impl DisjointColumns {
    fn new() -> Self {
        DisjointColumns {
            parent: HashMap::new(),
        }
    }

    fn find(&mut self, c: ColumnRef) -> ColumnRef {
        let p = *self.parent.entry(c).or_insert(c);
        if p == c {
            c
        } else {
            let root = self.find(p);
            self.parent.insert(c, root);
            root
        }
    }

    fn union(&mut self, a: ColumnRef, b: ColumnRef) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }
}

/// Build equivalence classes across `column = column` base terms, then for
/// every `columnA = constant` base term, emit a virtual `columnB = constant`
/// term for each other column `B` in `A`'s class.
///
/// `(cursor, column)` pairs are carried explicitly on every term rather
/// than reconstructed from a reference mask or a string, so there is no
/// surface for the classic "used the wrong identity for a column" bug to
/// occur on.
fn apply_transitive_closure(clause: &mut WhereClause) {
    let mut dsu = DisjointColumns::new();
    for term in clause.iter().take(clause.n_base) {
        if term.op == TermOp::Eq {
            if let (Some(left), Some(RightHandSide::Column(right))) = (term.left, &term.right) {
                dsu.union(left, *right);
            }
        }
    }

    // root -> (constant, source term index)
    let mut constants: HashMap<ColumnRef, (Literal, usize)> = HashMap::new();
    // root -> every column observed in that class
    let mut members: HashMap<ColumnRef, Vec<ColumnRef>> = HashMap::new();

    for (idx, term) in clause.iter().take(clause.n_base).enumerate() {
        if let Some(left) = term.left {
            let root = dsu.find(left);
            members.entry(root).or_default().push(left);
            if term.op == TermOp::Eq {
                if let Some(RightHandSide::Literal(lit)) = &term.right {
                    constants.entry(root).or_insert_with(|| (lit.clone(), idx));
                }
            }
        }
    }

    let mut new_terms = Vec::new();
    for (root, cols) in &members {
        let Some((constant, parent_idx)) = constants.get(root) else {
            continue;
        };
        for &col in cols {
            let already_has_constant = clause.iter().take(clause.n_base).any(|t| {
                t.op == TermOp::Eq
                    && t.left == Some(col)
                    && matches!(&t.right, Some(RightHandSide::Literal(l)) if l == constant)
            });
            if already_has_constant {
                continue;
            }
            let right = RightHandSide::Literal(constant.clone());
            let sentinel = matches!(constant, Literal::Integer(n) if cost::is_sentinel_int(*n));
            new_terms.push(WhereTerm {
                op: TermOp::Eq,
                left: Some(col),
                right: Some(right),
                or_clause: None,
                prereq_right: Bitmask::EMPTY,
                prereq_all: Bitmask::for_cursor(col.cursor),
                truth_prob: cost::equality_selectivity(sentinel),
                flags: WhereTermFlags::VIRTUAL,
                parent: Some(*parent_idx),
            });
        }
    }

    for term in new_terms {
        clause.push(term);
    }
}
