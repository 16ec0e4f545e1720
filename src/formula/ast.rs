//! Expression tree for a rule's formula.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }
}

/// A named reference. `offset: None` is a bare (parameter) reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub offset: Option<i64>,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(Reference),
    Neg(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    /// All references in left-to-right order.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(r) => out.push(r),
            Expr::Neg(inner) => inner.collect_refs(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8, right_side: bool) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ref(r) => match r.offset {
                Some(k) => write!(f, ":{}[{:+}]", r.name, k),
                None => write!(f, ":{}", r.name),
            },
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.fmt_prec(f, 3, false)
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                // `a - (b - c)` needs its parentheses, `(a - b) - c` does not.
                let wrap = prec < parent || (right_side && prec == parent);
                if wrap { write!(f, "(")?; }
                lhs.fmt_prec(f, prec, false)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_prec(f, prec, true)?;
                if wrap { write!(f, ")")?; }
                Ok(())
            }
        }
    }
}

/// Canonical formula text; re-parses to an equivalent tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0, false)
    }
}
