use super::context::*;
use super::error::*;
use super::instance::*;
use super::mem::*;
use super::ops::*;
use super::register::*;
use super::value::*;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Not, Sub};
use std::ptr;

/// Represents a net of 0 or more bits in a signal graph.
///
/// Every node in the graph is a `Signal`: wires, module ports, constants, memory ports and the results of operations. A `Signal` has a bit width, a signedness, an optional name, and at most one driver.
///
/// A width of `0` is a placeholder which is resolved the first time the signal is connected to a signal with a known width.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let m = c.module("my_module").unwrap();
/// let a = m.input("a", 8).unwrap();
/// let b = m.input("b", 8).unwrap();
/// let sum = a.add(b).unwrap(); // 8-bit signal
/// let high = sum.bits(7, 4).unwrap(); // 4-bit signal
/// let o = m.output("o", 4).unwrap();
/// o.drive(high).unwrap();
/// ```
#[must_use]
pub struct Signal<'a> {
    pub(super) context: &'a Context<'a>,

    pub(crate) name: RefCell<Option<String>>,
    pub(crate) width: Cell<u32>,
    pub(crate) signed: Cell<bool>,
    pub(crate) driver: Cell<Option<&'a Signal<'a>>>,

    pub(crate) data: SignalData<'a>,
}

/// The bit width and signedness of a [`Signal`].
///
/// [`Signal`]: ./struct.Signal.html
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SignalType {
    pub width: u32,
    pub signed: bool,
}

impl SignalType {
    pub fn unsigned(width: u32) -> SignalType {
        SignalType {
            width,
            signed: false,
        }
    }

    pub fn signed(width: u32) -> SignalType {
        SignalType {
            width,
            signed: true,
        }
    }
}

/// What a [`Signal`] is, as seen from outside of the graph.
///
/// [`Signal`]: ./struct.Signal.html
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalKind {
    Wire,
    Input,
    Output,
    Constant,
    MemoryPort,
    Operation(OpKind),
}

/// Operator tags for signals created by the operation, register and mux builders.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OpKind {
    Not,
    Or,
    And,
    Xor,
    Add,
    Sub,
    Mul,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Lshift,
    Rshift,
    ArithLshift,
    ArithRshift,
    Any,
    All,
    Parity,
    Concat,
    Slice,
    When,
    Case,
    Reg,
}

pub(crate) enum SignalData<'a> {
    Wire,

    Input {
        owner: Option<&'a Instance<'a>>,
    },
    Output {
        owner: Option<&'a Instance<'a>>,
    },

    Constant {
        value: Value,
    },

    MemPort {
        memory: &'a Memory<'a>,
        pin: MemPin,
    },

    Op {
        kind: OpKind,
        args: OpArgs<'a>,
    },
}

pub(crate) enum OpArgs<'a> {
    Unary(&'a Signal<'a>),
    Binary(&'a Signal<'a>, &'a Signal<'a>),
    Shift {
        source: &'a Signal<'a>,
        distance: u32,
    },
    Slice {
        source: &'a Signal<'a>,
        start: u32,
        stop: u32,
    },
    When {
        cond: &'a Signal<'a>,
        if_true: &'a Signal<'a>,
        if_false: &'a Signal<'a>,
    },
    Case(CaseData<'a>),
    Reg(RegisterData<'a>),
}

impl<'a> Signal<'a> {
    /// Returns the bit width of this `Signal`, or `0` if it hasn't been resolved yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let w = c.wire(0);
    /// assert_eq!(w.width(), 0);
    /// w.drive(c.constant(3u32, 5).unwrap()).unwrap();
    /// assert_eq!(w.width(), 5);
    /// ```
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width.get()
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signed.get()
    }

    #[must_use]
    pub fn ty(&self) -> SignalType {
        SignalType {
            width: self.width(),
            signed: self.is_signed(),
        }
    }

    /// Returns the explicit name given to this `Signal`, if any.
    ///
    /// Signals without a name get one when their module is elaborated.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    /// Gives this `Signal` an explicit net name and returns it.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let w = c.wire(4).named("counter");
    /// assert_eq!(w.name().as_deref(), Some("counter"));
    /// ```
    pub fn named<S: Into<String>>(&'a self, name: S) -> &'a Signal<'a> {
        *self.name.borrow_mut() = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> SignalKind {
        match self.data {
            SignalData::Wire => SignalKind::Wire,
            SignalData::Input { .. } => SignalKind::Input,
            SignalData::Output { .. } => SignalKind::Output,
            SignalData::Constant { .. } => SignalKind::Constant,
            SignalData::MemPort { .. } => SignalKind::MemoryPort,
            SignalData::Op { kind, .. } => SignalKind::Operation(kind),
        }
    }

    /// Returns the instance this port belongs to, if this is an instance's input or output.
    #[must_use]
    pub fn owner(&self) -> Option<&'a Instance<'a>> {
        match self.data {
            SignalData::Input { owner } | SignalData::Output { owner } => owner,
            _ => None,
        }
    }

    /// Returns the signal driving this one.
    ///
    /// For registers, this is the next value.
    #[must_use]
    pub fn driver(&self) -> Option<&'a Signal<'a>> {
        self.driver.get()
    }

    /// Returns the value of a constant.
    #[must_use]
    pub fn constant_value(&self) -> Option<Value> {
        match self.data {
            SignalData::Constant { value } => Some(value),
            _ => None,
        }
    }

    /// Drives this `Signal` with `driver`. Equivalent to [`connect`]`(self, driver)`.
    ///
    /// [`connect`]: ./fn.connect.html
    pub fn drive<D: Into<Operand<'a>>>(&'a self, driver: D) -> Result<(), GraphError> {
        connect(self, driver)
    }

    /// Resizes this `Signal` to `new_width` bits.
    ///
    /// Equal widths give a wire driven by this signal, narrower widths the low bits, and wider widths zero-pad unsigned signals or replicate the sign bit of signed ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let s = c.signed_wire(4);
    /// assert_eq!(s.extend(8).unwrap().width(), 8);
    /// assert_eq!(s.extend(8).unwrap().is_signed(), true);
    /// assert_eq!(s.extend(2).unwrap().width(), 2);
    /// ```
    pub fn extend(&'a self, new_width: u32) -> Result<&'a Signal<'a>, GraphError> {
        let width = self.resolved_width()?;
        if new_width == 0 {
            return Err(GraphError::UnsupportedOperation(
                "cannot extend a signal to 0 bits".into(),
            ));
        }
        if new_width == width {
            let copy = self.context.alloc_signal(self.ty(), SignalData::Wire);
            connect(copy, self)?;
            return Ok(copy);
        }
        if new_width < width {
            return self.bits(new_width - 1, 0);
        }

        let pad_width = new_width - width;
        let pad = if self.is_signed() {
            let top = self.bit(width - 1)?;
            let mut pad = top;
            for _ in 1..pad_width {
                pad = pad.concat(top)?;
            }
            pad
        } else {
            self.context.constant(0u32, pad_width)?
        };
        pad.concat(self)
    }

    pub(crate) fn resolved_width(&self) -> Result<u32, GraphError> {
        match self.width() {
            0 => Err(GraphError::UnresolvedWidth(self.describe())),
            width => Ok(width),
        }
    }

    /// Human-readable identification used in error messages.
    pub(crate) fn describe(&self) -> String {
        if let Some(name) = self.name.borrow().as_ref() {
            return format!("\"{}\"", name);
        }
        let what = match &self.data {
            SignalData::Wire => "wire".to_string(),
            SignalData::Input { .. } => "input".to_string(),
            SignalData::Output { .. } => "output".to_string(),
            SignalData::Constant { value } => format!("constant {}", value),
            SignalData::MemPort { pin, .. } => pin.describe(),
            SignalData::Op { kind, .. } => format!("{:?} operation", kind),
        };
        format!("<unnamed {}-bit {}>", self.width(), what)
    }

    /// All signals whose values this signal depends on directly.
    pub(crate) fn upstream(&self) -> Vec<&'a Signal<'a>> {
        let mut ret = Vec::new();
        if let SignalData::Op { ref args, .. } = self.data {
            match args {
                OpArgs::Unary(source) => ret.push(*source),
                OpArgs::Binary(lhs, rhs) => {
                    ret.push(*lhs);
                    ret.push(*rhs);
                }
                OpArgs::Shift { source, .. } | OpArgs::Slice { source, .. } => ret.push(*source),
                OpArgs::When {
                    cond,
                    if_true,
                    if_false,
                } => {
                    ret.push(*cond);
                    ret.push(*if_true);
                    ret.push(*if_false);
                }
                OpArgs::Case(case) => {
                    ret.push(case.selector);
                    ret.extend(case.table.iter().map(|&(_, value)| value));
                    ret.extend(case.default);
                }
                OpArgs::Reg(reg) => {
                    ret.push(reg.clk);
                    ret.extend(reg.enable);
                    ret.extend(reg.reset);
                    ret.extend(reg.async_reset);
                }
            }
        }
        ret.extend(self.driver());
        ret
    }
}

/// Connects `driver` to `target`, making it the single driver of `target`.
///
/// Literals are promoted to a constant with `target`'s width and signedness. If one side has an unresolved width, it takes the width and signedness of the other side.
///
/// # Errors
///
/// Returns [`GraphError::MultipleDriver`] if `target` is already driven, [`GraphError::IllegalDrive`] if `target` can't be driven from the outside (constants, operations, instance outputs, module template inputs, memory read data), and [`GraphError::UnresolvedWidth`] or [`GraphError::WidthMismatch`] if the widths can't be reconciled.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let w = c.wire(8);
/// connect(w, 0x42).unwrap();
/// assert!(matches!(connect(w, 0x43), Err(GraphError::MultipleDriver { .. })));
/// ```
///
/// [`GraphError::MultipleDriver`]: ./enum.GraphError.html#variant.MultipleDriver
/// [`GraphError::IllegalDrive`]: ./enum.GraphError.html#variant.IllegalDrive
/// [`GraphError::UnresolvedWidth`]: ./enum.GraphError.html#variant.UnresolvedWidth
/// [`GraphError::WidthMismatch`]: ./enum.GraphError.html#variant.WidthMismatch
pub fn connect<'a, D: Into<Operand<'a>>>(
    target: &'a Signal<'a>,
    driver: D,
) -> Result<(), GraphError> {
    let reason = match target.data {
        SignalData::Constant { .. } => Some(IllegalDriveReason::ConstantTarget),
        SignalData::Op {
            kind: OpKind::Reg, ..
        } => None,
        SignalData::Op { .. } => Some(IllegalDriveReason::OperationTarget),
        SignalData::Output { owner: Some(_) } => Some(IllegalDriveReason::InstanceOutput),
        SignalData::Input { owner: None } => Some(IllegalDriveReason::FreeInput),
        SignalData::MemPort { pin, .. } if pin.is_driven_by_memory() => {
            Some(IllegalDriveReason::MemoryReadData)
        }
        _ => None,
    };
    if let Some(reason) = reason {
        return Err(GraphError::IllegalDrive {
            target: target.describe(),
            reason,
        });
    }
    if target.driver().is_some() {
        return Err(GraphError::MultipleDriver {
            target: target.describe(),
        });
    }

    let driver = match driver.into() {
        Operand::Signal(driver) => driver,
        Operand::Literal(value) => {
            target.resolved_width()?;
            target.context.constant_of(value, target.ty())?
        }
    };
    resolve_widths(target, driver)?;
    target.driver.set(Some(driver));
    Ok(())
}

fn resolve_widths<'a>(target: &'a Signal<'a>, driver: &'a Signal<'a>) -> Result<(), GraphError> {
    match (target.width(), driver.width()) {
        (0, 0) => Err(GraphError::UnresolvedWidth(format!(
            "{} and {}",
            target.describe(),
            driver.describe()
        ))),
        (0, width) => {
            target.width.set(width);
            target.signed.set(driver.is_signed());
            Ok(())
        }
        (width, 0) => {
            driver.width.set(width);
            driver.signed.set(target.is_signed());
            Ok(())
        }
        (expected, actual) if expected != actual => {
            Err(GraphError::WidthMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

impl<'a> fmt::Debug for Signal<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name.borrow())
            .field("kind", &self.kind())
            .field("width", &self.width())
            .field("signed", &self.is_signed())
            .finish()
    }
}

impl<'a> Eq for &'a Signal<'a> {}

impl<'a> Hash for &'a Signal<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(*self as *const _ as usize)
    }
}

impl<'a> PartialEq for &'a Signal<'a> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(*self, *other)
    }
}

fn or_panic<'a>(result: Result<&'a Signal<'a>, GraphError>) -> &'a Signal<'a> {
    match result {
        Ok(signal) => signal,
        Err(e) => panic!("{}", e),
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $kind:expr) => {
        /// Operator form of the builder method of the same name.
        ///
        /// # Panics
        ///
        /// Panics if the builder method returns an error.
        impl<'a, R: Into<Operand<'a>>> $trait<R> for &'a Signal<'a> {
            type Output = Self;

            fn $method(self, rhs: R) -> Self {
                or_panic(make_op($kind, self, Some(rhs.into())))
            }
        }
    };
}

binary_operator!(Add, add, OpKind::Add);
binary_operator!(Sub, sub, OpKind::Sub);
binary_operator!(Mul, mul, OpKind::Mul);
binary_operator!(BitAnd, bitand, OpKind::And);
binary_operator!(BitOr, bitor, OpKind::Or);
binary_operator!(BitXor, bitxor, OpKind::Xor);

impl<'a> Not for &'a Signal<'a> {
    type Output = Self;

    fn not(self) -> Self {
        or_panic(make_op(OpKind::Not, self, None))
    }
}
