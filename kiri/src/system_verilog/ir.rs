use crate::graph::*;

use std::fmt;

/// Declared type of a net: `logic [W-1:0]` or `logic signed [W-1:0]`.
pub fn type_decl(ty: SignalType) -> String {
    format!(
        "logic {}[{}:0]",
        if ty.signed { "signed " } else { "" },
        ty.width - 1
    )
}

pub struct NodeDecl {
    pub name: String,
    pub ty: SignalType,
}

impl fmt::Display for NodeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {};", type_decl(self.ty), self.name)
    }
}

/// A right-hand side. Every operation gets its own net, so expressions are never nested more than one operator deep.
#[derive(Clone)]
pub enum Expr {
    BinOp {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        op: BinOp,
    },
    Bits {
        source: Box<Expr>,
        range_high: u32,
        range_low: u32,
    },
    /// `source[range_high:range_low]` with its bit order reversed.
    Reverse {
        source: Box<Expr>,
        range_high: u32,
        range_low: u32,
    },
    Concat {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Constant {
        bit_width: u32,
        signed: bool,
        value: Value,
    },
    Index {
        memory: String,
        address: Box<Expr>,
    },
    Ref {
        name: String,
    },
    Shift {
        source: Box<Expr>,
        op: ShiftOp,
        distance: u32,
    },
    Ternary {
        cond: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    UnOp {
        source: Box<Expr>,
        op: UnOp,
    },
}

impl Expr {
    pub fn from_ref<S: Into<String>>(name: S) -> Expr {
        Expr::Ref { name: name.into() }
    }

    pub fn from_value(value: Value, ty: SignalType) -> Expr {
        Expr::Constant {
            bit_width: ty.width,
            signed: ty.signed,
            value,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BinOp { lhs, rhs, op } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Expr::Bits {
                source,
                range_high,
                range_low,
            } => {
                if range_high != range_low {
                    write!(f, "{}[{}:{}]", source, range_high, range_low)
                } else {
                    write!(f, "{}[{}]", source, range_high)
                }
            }
            Expr::Reverse {
                source,
                range_high,
                range_low,
            } => write!(f, "{{<<{{{}[{}:{}]}}}}", source, range_high, range_low),
            Expr::Concat { lhs, rhs } => write!(f, "{{{}, {}}}", lhs, rhs),
            Expr::Constant {
                bit_width,
                signed,
                value,
            } => match (*signed, value.is_negative()) {
                (true, true) => write!(f, "-{}'sd{}", bit_width, value.magnitude()),
                (true, false) => write!(f, "{}'sh{:x}", bit_width, value.magnitude()),
                (false, _) => write!(f, "{}'h{:x}", bit_width, value.to_bits(*bit_width)),
            },
            Expr::Index { memory, address } => write!(f, "{}[{}]", memory, address),
            Expr::Ref { name } => f.write_str(name),
            Expr::Shift {
                source,
                op,
                distance,
            } => write!(f, "{} {} {}", source, op.symbol(), distance),
            Expr::Ternary {
                cond,
                when_true,
                when_false,
            } => write!(f, "{} ? {} : {}", cond, when_true, when_false),
            Expr::UnOp { source, op } => write!(f, "{}{}", op.symbol(), source),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Mul,
    Sub,
}

impl BinOp {
    pub fn from_kind(kind: OpKind) -> Option<BinOp> {
        Some(match kind {
            OpKind::Add => BinOp::Add,
            OpKind::And => BinOp::BitAnd,
            OpKind::Or => BinOp::BitOr,
            OpKind::Xor => BinOp::BitXor,
            OpKind::Eq => BinOp::Equal,
            OpKind::Neq => BinOp::NotEqual,
            OpKind::Lt => BinOp::LessThan,
            OpKind::Le => BinOp::LessThanEqual,
            OpKind::Gt => BinOp::GreaterThan,
            OpKind::Ge => BinOp::GreaterThanEqual,
            OpKind::Mul => BinOp::Mul,
            OpKind::Sub => BinOp::Sub,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::LessThanEqual => "<=",
            BinOp::GreaterThan => ">",
            BinOp::GreaterThanEqual => ">=",
            BinOp::Mul => "*",
            BinOp::Sub => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShiftOp {
    Shl,
    Shr,
    ShlArithmetic,
    ShrArithmetic,
}

impl ShiftOp {
    pub fn from_kind(kind: OpKind) -> Option<ShiftOp> {
        Some(match kind {
            OpKind::Lshift => ShiftOp::Shl,
            OpKind::Rshift => ShiftOp::Shr,
            OpKind::ArithLshift => ShiftOp::ShlArithmetic,
            OpKind::ArithRshift => ShiftOp::ShrArithmetic,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            ShiftOp::Shl => "<<",
            ShiftOp::Shr => ">>",
            ShiftOp::ShlArithmetic => "<<<",
            ShiftOp::ShrArithmetic => ">>>",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnOp {
    Not,
    ReduceOr,
    ReduceAnd,
    ReduceXor,
}

impl UnOp {
    pub fn from_kind(kind: OpKind) -> Option<UnOp> {
        Some(match kind {
            OpKind::Not => UnOp::Not,
            OpKind::Any => UnOp::ReduceOr,
            OpKind::All => UnOp::ReduceAnd,
            OpKind::Parity => UnOp::ReduceXor,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "~",
            UnOp::ReduceOr => "|",
            UnOp::ReduceAnd => "&",
            UnOp::ReduceXor => "^",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(name: &str) -> Box<Expr> {
        Box::new(Expr::from_ref(name))
    }

    #[test]
    fn declarations_always_carry_a_range() {
        assert_eq!(type_decl(SignalType::unsigned(1)), "logic [0:0]");
        assert_eq!(type_decl(SignalType::signed(8)), "logic signed [7:0]");
        let decl = NodeDecl {
            name: "n".into(),
            ty: SignalType::unsigned(4),
        };
        assert_eq!(decl.to_string(), "logic [3:0] n;");
    }

    #[test]
    fn constant_literals() {
        let c = |bit_width, signed, value: i128| {
            Expr::Constant {
                bit_width,
                signed,
                value: Value::from(value),
            }
            .to_string()
        };
        assert_eq!(c(8, false, 255), "8'hff");
        assert_eq!(c(4, true, 3), "4'sh3");
        assert_eq!(c(8, true, -1), "-8'sd1");
        assert_eq!(c(1, false, 0), "1'h0");
        assert_eq!(c(4, false, -3), "4'hd");

        let wide = Expr::from_value(Value::from(u128::MAX), SignalType::unsigned(128));
        assert_eq!(wide.to_string(), format!("128'h{:x}", u128::MAX));
    }

    #[test]
    fn operator_text() {
        let e = Expr::BinOp {
            lhs: r("a"),
            rhs: r("b"),
            op: BinOp::Add,
        };
        assert_eq!(e.to_string(), "a + b");

        let e = Expr::UnOp {
            source: r("a"),
            op: UnOp::ReduceXor,
        };
        assert_eq!(e.to_string(), "^a");

        let e = Expr::Shift {
            source: r("a"),
            op: ShiftOp::ShrArithmetic,
            distance: 2,
        };
        assert_eq!(e.to_string(), "a >>> 2");

        let e = Expr::Ternary {
            cond: r("c"),
            when_true: r("a"),
            when_false: r("b"),
        };
        assert_eq!(e.to_string(), "c ? a : b");

        let e = Expr::Concat {
            lhs: r("a"),
            rhs: r("b"),
        };
        assert_eq!(e.to_string(), "{a, b}");
    }

    #[test]
    fn bit_selection() {
        let e = |range_high, range_low| {
            Expr::Bits {
                source: r("a"),
                range_high,
                range_low,
            }
            .to_string()
        };
        assert_eq!(e(7, 4), "a[7:4]");
        assert_eq!(e(3, 3), "a[3]");

        let e = Expr::Reverse {
            source: r("a"),
            range_high: 7,
            range_low: 0,
        };
        assert_eq!(e.to_string(), "{<<{a[7:0]}}");
    }

    #[test]
    fn kind_tables_cover_every_operator() {
        for kind in [OpKind::Add, OpKind::Sub, OpKind::Mul, OpKind::And, OpKind::Ge] {
            assert!(BinOp::from_kind(kind).is_some());
        }
        assert_eq!(ShiftOp::from_kind(OpKind::ArithLshift), Some(ShiftOp::ShlArithmetic));
        assert_eq!(UnOp::from_kind(OpKind::Any), Some(UnOp::ReduceOr));
        assert!(BinOp::from_kind(OpKind::Concat).is_none());
    }
}
