use super::context::*;
use super::error::*;
use super::signal::*;
use super::value::*;

use log::warn;

use std::collections::HashSet;
use std::ops::{RangeFrom, RangeFull, RangeToInclusive};
use std::ptr;

impl OpKind {
    /// Infers the width and signedness of an operation's result from its operands.
    ///
    /// `x` is the first operand and `y` the second. Unary operators ignore `y`. For `Slice`, `y.width` is the number of selected bits. For `When`, `Case` and `Reg`, `y` is the shared type of the selectable values.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let x = SignalType::unsigned(3);
    /// let y = SignalType::signed(5);
    /// assert_eq!(OpKind::Add.infer(x, y), SignalType::signed(5));
    /// assert_eq!(OpKind::Mul.infer(x, y), SignalType::signed(8));
    /// assert_eq!(OpKind::Concat.infer(x, y), SignalType::unsigned(8));
    /// assert_eq!(OpKind::Lt.infer(x, y), SignalType::unsigned(1));
    /// ```
    #[must_use]
    pub fn infer(self, x: SignalType, y: SignalType) -> SignalType {
        match self {
            OpKind::Not => x,
            OpKind::Any | OpKind::All | OpKind::Parity => SignalType::unsigned(1),
            OpKind::Or | OpKind::And | OpKind::Xor | OpKind::Add | OpKind::Sub => SignalType {
                width: x.width.max(y.width),
                signed: x.signed || y.signed,
            },
            OpKind::Mul => SignalType {
                width: x.width + y.width,
                signed: x.signed || y.signed,
            },
            OpKind::Eq | OpKind::Neq | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge => {
                SignalType::unsigned(1)
            }
            OpKind::Lshift | OpKind::Rshift | OpKind::ArithLshift | OpKind::ArithRshift => x,
            OpKind::Concat => SignalType {
                width: x.width + y.width,
                signed: x.signed,
            },
            OpKind::Slice => SignalType {
                width: y.width,
                signed: x.signed,
            },
            OpKind::When | OpKind::Case | OpKind::Reg => y,
        }
    }

    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            OpKind::Not | OpKind::Any | OpKind::All | OpKind::Parity
        )
    }

    #[must_use]
    pub fn is_shift(self) -> bool {
        matches!(
            self,
            OpKind::Lshift | OpKind::Rshift | OpKind::ArithLshift | OpKind::ArithRshift
        )
    }

    fn requires_same_sign(self) -> bool {
        matches!(
            self,
            OpKind::Add
                | OpKind::Sub
                | OpKind::Mul
                | OpKind::Eq
                | OpKind::Neq
                | OpKind::Lt
                | OpKind::Le
                | OpKind::Gt
                | OpKind::Ge
        )
    }
}

pub(crate) struct CaseData<'a> {
    pub selector: &'a Signal<'a>,
    pub table: Vec<(u64, &'a Signal<'a>)>,
    pub default: Option<&'a Signal<'a>>,
    pub unique: bool,
}

/// A bit range for [`Signal::slice`], in `[start:stop]` order.
///
/// Missing bounds default to the full range, negative bounds count from the top of the signal, and `start < stop` selects the bits in reversed order.
///
/// [`Signal::slice`]: ./struct.Signal.html#method.slice
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SliceRange {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceRange {
    pub fn new(start: i64, stop: i64) -> SliceRange {
        SliceRange {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub fn with_step(self, step: i64) -> SliceRange {
        SliceRange {
            step: Some(step),
            ..self
        }
    }
}

impl From<(i64, i64)> for SliceRange {
    fn from((start, stop): (i64, i64)) -> Self {
        SliceRange::new(start, stop)
    }
}

impl From<RangeFull> for SliceRange {
    fn from(_: RangeFull) -> Self {
        SliceRange::default()
    }
}

impl From<RangeFrom<i64>> for SliceRange {
    fn from(range: RangeFrom<i64>) -> Self {
        SliceRange {
            start: Some(range.start),
            ..SliceRange::default()
        }
    }
}

impl From<RangeToInclusive<i64>> for SliceRange {
    fn from(range: RangeToInclusive<i64>) -> Self {
        SliceRange {
            stop: Some(range.end),
            ..SliceRange::default()
        }
    }
}

/// Normalizes `range` against a signal of `width` bits, returning `(start, stop)`.
///
/// # Errors
///
/// Returns [`GraphError::UnsupportedOperation`] for stepped ranges and [`GraphError::SliceOutOfRange`] if a bound is outside of the signal.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// assert_eq!(legalize_slice(8, ..), Ok((7, 0)));
/// assert_eq!(legalize_slice(8, (-1, -4)), Ok((7, 4)));
/// assert_eq!(legalize_slice(8, (2, 5)), Ok((2, 5)));
/// assert_eq!(legalize_slice(8, 3..), Ok((3, 0)));
/// ```
///
/// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
/// [`GraphError::SliceOutOfRange`]: ./enum.GraphError.html#variant.SliceOutOfRange
pub fn legalize_slice<R: Into<SliceRange>>(width: u32, range: R) -> Result<(u32, u32), GraphError> {
    let range = range.into();
    if range.step.is_some() {
        return Err(GraphError::UnsupportedOperation(
            "stepped slices are not implemented".into(),
        ));
    }

    let w = i64::from(width);
    let start = range.start.unwrap_or(w - 1);
    let stop = range.stop.unwrap_or(0);
    let normalize = |bound: i64| if bound < 0 { bound + w } else { bound };
    let (start_norm, stop_norm) = (normalize(start), normalize(stop));
    if !(0..w).contains(&start_norm) || !(0..w).contains(&stop_norm) {
        return Err(GraphError::SliceOutOfRange { start, stop, width });
    }
    Ok((start_norm as u32, stop_norm as u32))
}

/// Builds a unary or binary operation of `kind`.
///
/// Literal operands are promoted to constants with the other operand's width and signedness. Shift kinds take the distance as a literal in `y`.
///
/// # Errors
///
/// Returns [`GraphError::UnsupportedOperation`] for a wrong operand count, a signal shift distance, `Slice`/`When`/`Case`/`Reg` (which have their own builders) and operations without any signal operand. Returns [`GraphError::SignMismatch`] if an arithmetic or comparison operator mixes signedness.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let a = c.wire(4);
/// let sum = make_op(OpKind::Add, a, Some(3.into())).unwrap();
/// assert_eq!(sum.width(), 4);
/// assert!(make_op(OpKind::Add, a, Some(c.signed_wire(4).into())).is_err());
/// ```
///
/// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
/// [`GraphError::SignMismatch`]: ./enum.GraphError.html#variant.SignMismatch
pub fn make_op<'a, X: Into<Operand<'a>>>(
    kind: OpKind,
    x: X,
    y: Option<Operand<'a>>,
) -> Result<&'a Signal<'a>, GraphError> {
    match kind {
        OpKind::Slice => {
            return Err(GraphError::UnsupportedOperation(
                "slices take a bit range, see `Signal::slice`".into(),
            ))
        }
        OpKind::When | OpKind::Case | OpKind::Reg => {
            return Err(GraphError::UnsupportedOperation(format!(
                "{:?} has its own builder",
                kind
            )))
        }
        _ => (),
    }
    let x = x.into();

    if kind.is_unary() {
        if y.is_some() {
            return Err(GraphError::UnsupportedOperation(format!(
                "{:?} takes a single operand",
                kind
            )));
        }
        let x = signal_operand(kind, x)?;
        x.resolved_width()?;
        let ty = kind.infer(x.ty(), x.ty());
        return Ok(x.context.alloc_op(kind, ty, OpArgs::Unary(x)));
    }

    let y = y.ok_or_else(|| {
        GraphError::UnsupportedOperation(format!("{:?} takes two operands", kind))
    })?;

    if kind.is_shift() {
        let x = signal_operand(kind, x)?;
        let distance = match y {
            Operand::Literal(distance) => distance,
            Operand::Signal(_) => {
                return Err(GraphError::UnsupportedOperation(
                    "shift distances must be compile-time integers".into(),
                ))
            }
        };
        let distance = Some(distance)
            .filter(|distance| !distance.is_negative())
            .and_then(|distance| u32::try_from(distance.magnitude()).ok())
            .ok_or_else(|| GraphError::UnsupportedOperation(format!("shift distance {}", distance)))?;
        return make_shift(kind, x, distance);
    }

    let (x, y) = match (x, y) {
        (Operand::Signal(x), Operand::Signal(y)) => {
            if !ptr::eq(x.context, y.context) {
                return Err(GraphError::UnsupportedOperation(
                    "operands belong to different contexts".into(),
                ));
            }
            (x, y)
        }
        (Operand::Signal(x), Operand::Literal(value)) => {
            x.resolved_width()?;
            (x, x.context.constant_of(value, x.ty())?)
        }
        (Operand::Literal(value), Operand::Signal(y)) => {
            y.resolved_width()?;
            (y.context.constant_of(value, y.ty())?, y)
        }
        (Operand::Literal(_), Operand::Literal(_)) => {
            return Err(GraphError::UnsupportedOperation(format!(
                "{:?} needs at least one signal operand",
                kind
            )))
        }
    };
    x.resolved_width()?;
    y.resolved_width()?;
    if kind.requires_same_sign() && x.is_signed() != y.is_signed() {
        return Err(GraphError::SignMismatch { op: kind });
    }

    let ty = kind.infer(x.ty(), y.ty());
    Ok(x.context.alloc_op(kind, ty, OpArgs::Binary(x, y)))
}

fn signal_operand<'a>(kind: OpKind, x: Operand<'a>) -> Result<&'a Signal<'a>, GraphError> {
    x.as_signal().ok_or_else(|| {
        GraphError::UnsupportedOperation(format!("{:?} of a literal", kind))
    })
}

fn make_shift<'a>(
    kind: OpKind,
    x: &'a Signal<'a>,
    distance: u32,
) -> Result<&'a Signal<'a>, GraphError> {
    x.resolved_width()?;
    let kind = match (kind, x.is_signed()) {
        (OpKind::Lshift, true) => OpKind::ArithLshift,
        (OpKind::Rshift, true) => OpKind::ArithRshift,
        (OpKind::ArithLshift, false) => OpKind::Lshift,
        (OpKind::ArithRshift, false) => OpKind::Rshift,
        (kind, _) => kind,
    };
    let ty = kind.infer(x.ty(), x.ty());
    Ok(x.context.alloc_op(
        kind,
        ty,
        OpArgs::Shift {
            source: x,
            distance,
        },
    ))
}

/// Finds the type shared by a set of selectable values.
///
/// Signal operands decide the type and must agree with each other. Otherwise the literals get the narrowest type that holds all of them.
fn shared_type(kind: OpKind, operands: &[Operand<'_>]) -> Result<SignalType, GraphError> {
    let mut shared: Option<SignalType> = None;
    for signal in operands.iter().filter_map(Operand::as_signal) {
        let width = signal.resolved_width()?;
        match shared {
            None => shared = Some(signal.ty()),
            Some(ty) => {
                if ty.width != width {
                    return Err(GraphError::WidthMismatch {
                        expected: ty.width,
                        actual: width,
                    });
                }
                if ty.signed != signal.is_signed() {
                    return Err(GraphError::SignMismatch { op: kind });
                }
            }
        }
    }
    if let Some(ty) = shared {
        return Ok(ty);
    }

    let values = operands.iter().filter_map(|operand| match *operand {
        Operand::Literal(value) => Some(value),
        Operand::Signal(_) => None,
    });
    let signed = values.clone().any(|value| value.is_negative());
    let width = values
        .map(|value| {
            if signed {
                value.required_signed_bits()
            } else {
                value.natural_bits()
            }
        })
        .max()
        .unwrap_or(1);
    Ok(SignalType { width, signed })
}

fn promote<'a>(
    context: &'a Context<'a>,
    operand: Operand<'a>,
    ty: SignalType,
) -> Result<&'a Signal<'a>, GraphError> {
    match operand {
        Operand::Signal(signal) => Ok(signal),
        Operand::Literal(value) => context.constant_of(value, ty),
    }
}

/// Builds a 2:1 mux selecting `if_true` when `cond` is high.
///
/// A missing `if_false` selects zero. Literal branches take the type of the signal branch; if both branches are literals they get the narrowest type holding both.
///
/// # Errors
///
/// Returns [`GraphError::ConditionWidth`] if `cond` isn't 1 bit wide, and [`GraphError::WidthMismatch`] or [`GraphError::SignMismatch`] if two signal branches disagree.
///
/// [`GraphError::ConditionWidth`]: ./enum.GraphError.html#variant.ConditionWidth
/// [`GraphError::WidthMismatch`]: ./enum.GraphError.html#variant.WidthMismatch
/// [`GraphError::SignMismatch`]: ./enum.GraphError.html#variant.SignMismatch
pub fn make_when<'a, T: Into<Operand<'a>>>(
    cond: &'a Signal<'a>,
    if_true: T,
    if_false: Option<Operand<'a>>,
) -> Result<&'a Signal<'a>, GraphError> {
    let cond_width = cond.resolved_width()?;
    if cond_width != 1 {
        return Err(GraphError::ConditionWidth(cond_width));
    }

    let if_true = if_true.into();
    let mut operands = vec![if_true];
    operands.extend(if_false);
    let ty = shared_type(OpKind::When, &operands)?;

    let context = cond.context;
    let if_true = promote(context, if_true, ty)?;
    let if_false = match if_false {
        Some(if_false) => promote(context, if_false, ty)?,
        None => context.constant_of(Value::from(0), ty)?,
    };
    Ok(context.alloc_op(
        OpKind::When,
        OpKind::When.infer(ty, ty),
        OpArgs::When {
            cond,
            if_true,
            if_false,
        },
    ))
}

/// Builds a multi-way mux selecting the value whose key equals `selector`.
///
/// The case is `unique` when the table covers every selector value; the default is then unreachable and dropped. A non-unique case without a default selects zero for missing keys.
///
/// # Errors
///
/// Returns [`GraphError::InvalidCase`] for a signed selector, an empty table, a key that doesn't fit into the selector or a repeated key, and the errors of [`make_when`] for values that don't share a type.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let sel = c.wire(2);
/// let out = make_case(sel, vec![(0, 1), (1, 2), (2, 4), (3, 8)], None).unwrap();
/// assert_eq!(out.width(), 4);
/// ```
///
/// [`GraphError::InvalidCase`]: ./enum.GraphError.html#variant.InvalidCase
/// [`make_when`]: ./fn.make_when.html
pub fn make_case<'a, I, V>(
    selector: &'a Signal<'a>,
    table: I,
    default: Option<Operand<'a>>,
) -> Result<&'a Signal<'a>, GraphError>
where
    I: IntoIterator<Item = (u64, V)>,
    V: Into<Operand<'a>>,
{
    let width = selector.resolved_width()?;
    if selector.is_signed() {
        return Err(GraphError::InvalidCase("the selector must be unsigned".into()));
    }
    let table = table
        .into_iter()
        .map(|(key, value)| (key, value.into()))
        .collect::<Vec<(u64, Operand<'a>)>>();
    if table.is_empty() {
        return Err(GraphError::InvalidCase("the table is empty".into()));
    }

    let mut keys = HashSet::new();
    for &(key, _) in &table {
        if width < 64 && key >> width != 0 {
            return Err(GraphError::InvalidCase(format!(
                "key {} doesn't fit into a {}-bit selector",
                key, width
            )));
        }
        if !keys.insert(key) {
            return Err(GraphError::InvalidCase(format!(
                "key {} appears more than once",
                key
            )));
        }
    }

    let mut operands = table.iter().map(|&(_, value)| value).collect::<Vec<_>>();
    operands.extend(default);
    let ty = shared_type(OpKind::Case, &operands)?;

    let context = selector.context;
    let unique = width < 64 && table.len() as u64 == 1u64 << width;
    let default = match default {
        Some(_) if unique => {
            warn!(
                "Case on {} covers all {} selector values; the default is never selected.",
                selector.describe(),
                table.len()
            );
            None
        }
        Some(default) => Some(promote(context, default, ty)?),
        None if unique => None,
        None => Some(context.constant_of(Value::from(0), ty)?),
    };
    let table = table
        .into_iter()
        .map(|(key, value)| Ok((key, promote(context, value, ty)?)))
        .collect::<Result<Vec<_>, GraphError>>()?;

    Ok(context.alloc_op(
        OpKind::Case,
        OpKind::Case.infer(ty, ty),
        OpArgs::Case(CaseData {
            selector,
            table,
            default,
            unique,
        }),
    ))
}

/// Concatenates `operands`, the first one ending up in the most significant bits.
///
/// # Errors
///
/// Returns [`GraphError::UnsupportedOperation`] if `operands` is empty, and the errors of [`make_op`] for each pairwise concatenation.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let a = c.wire(1);
/// let b = c.wire(3);
/// let d = c.wire(4);
/// assert_eq!(concat_all(&[a.into(), b.into(), d.into()]).unwrap().width(), 8);
/// ```
///
/// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
/// [`make_op`]: ./fn.make_op.html
pub fn concat_all<'a>(operands: &[Operand<'a>]) -> Result<&'a Signal<'a>, GraphError> {
    let (first, rest) = operands.split_first().ok_or_else(|| {
        GraphError::UnsupportedOperation("concatenation of nothing".into())
    })?;
    let (second, rest) = match rest.split_first() {
        Some(split) => split,
        None => return signal_operand(OpKind::Concat, *first),
    };
    let mut acc = make_op(OpKind::Concat, *first, Some(*second))?;
    for operand in rest {
        acc = make_op(OpKind::Concat, acc, Some(*operand))?;
    }
    Ok(acc)
}

impl<'a> Signal<'a> {
    /// Bitwise NOT. Equivalent to [`make_op`]`(OpKind::Not, self, None)`.
    ///
    /// [`make_op`]: ./fn.make_op.html
    pub fn not(&'a self) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Not, self, None)
    }

    pub fn and<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::And, self, Some(rhs.into()))
    }

    pub fn or<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Or, self, Some(rhs.into()))
    }

    pub fn xor<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Xor, self, Some(rhs.into()))
    }

    /// Wrapping addition, as wide as the widest operand.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let a = c.wire(4);
    /// let b = c.wire(6);
    /// assert_eq!(a.add(b).unwrap().width(), 6);
    /// assert_eq!(a.add(1).unwrap().width(), 4);
    /// ```
    pub fn add<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Add, self, Some(rhs.into()))
    }

    pub fn sub<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Sub, self, Some(rhs.into()))
    }

    /// Full-width multiplication; the result is as wide as both operands combined.
    pub fn mul<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Mul, self, Some(rhs.into()))
    }

    pub fn eq<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Eq, self, Some(rhs.into()))
    }

    pub fn ne<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Neq, self, Some(rhs.into()))
    }

    pub fn lt<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Lt, self, Some(rhs.into()))
    }

    pub fn le<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Le, self, Some(rhs.into()))
    }

    pub fn gt<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Gt, self, Some(rhs.into()))
    }

    pub fn ge<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Ge, self, Some(rhs.into()))
    }

    /// Shifts left by a constant `distance`.
    ///
    /// Shifts of signed signals are emitted as arithmetic shifts.
    pub fn shl(&'a self, distance: u32) -> Result<&'a Signal<'a>, GraphError> {
        make_shift(OpKind::Lshift, self, distance)
    }

    /// Shifts right by a constant `distance`.
    ///
    /// Shifts of signed signals are emitted as arithmetic shifts, which replicate the sign bit.
    pub fn shr(&'a self, distance: u32) -> Result<&'a Signal<'a>, GraphError> {
        make_shift(OpKind::Rshift, self, distance)
    }

    /// OR reduction: `1` if any bit is set.
    pub fn any(&'a self) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Any, self, None)
    }

    /// AND reduction: `1` if every bit is set.
    pub fn all(&'a self) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::All, self, None)
    }

    /// XOR reduction.
    pub fn parity(&'a self) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Parity, self, None)
    }

    /// Concatenates `self` (most significant bits) with `rhs` (least significant bits).
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let a = c.signed_wire(3);
    /// let b = c.wire(5);
    /// let ab = a.concat(b).unwrap();
    /// assert_eq!(ab.width(), 8);
    /// assert_eq!(ab.is_signed(), true);
    /// ```
    pub fn concat<R: Into<Operand<'a>>>(&'a self, rhs: R) -> Result<&'a Signal<'a>, GraphError> {
        make_op(OpKind::Concat, self, Some(rhs.into()))
    }

    /// Selects the bits in `range`. See [`legalize_slice`] for how bounds are interpreted.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let s = c.wire(8);
    /// assert_eq!(s.slice((5, 2)).unwrap().width(), 4);
    /// assert_eq!(s.slice(..).unwrap().width(), 8);
    /// assert_eq!(s.slice((0, 7)).unwrap().width(), 8); // Reversed
    /// assert!(s.slice((8, 0)).is_err());
    /// ```
    ///
    /// [`legalize_slice`]: ./fn.legalize_slice.html
    pub fn slice<R: Into<SliceRange>>(&'a self, range: R) -> Result<&'a Signal<'a>, GraphError> {
        let width = self.resolved_width()?;
        let (start, stop) = legalize_slice(width, range)?;
        let span = SignalType::unsigned(start.max(stop) - start.min(stop) + 1);
        Ok(self.context.alloc_op(
            OpKind::Slice,
            OpKind::Slice.infer(self.ty(), span),
            OpArgs::Slice {
                source: self,
                start,
                stop,
            },
        ))
    }

    /// Selects a single bit.
    pub fn bit(&'a self, index: u32) -> Result<&'a Signal<'a>, GraphError> {
        self.slice((i64::from(index), i64::from(index)))
    }

    /// Selects bits `high` down to `low`, inclusive.
    pub fn bits(&'a self, high: u32, low: u32) -> Result<&'a Signal<'a>, GraphError> {
        self.slice((i64::from(high), i64::from(low)))
    }

    /// Uses `self` as a condition to select between `if_true` and `if_false`. See [`make_when`].
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let cond = c.wire(1);
    /// let a = c.wire(8);
    /// let m = cond.mux(a, 0xff).unwrap();
    /// assert_eq!(m.width(), 8);
    /// ```
    ///
    /// [`make_when`]: ./fn.make_when.html
    pub fn mux<T: Into<Operand<'a>>, F: Into<Operand<'a>>>(
        &'a self,
        if_true: T,
        if_false: F,
    ) -> Result<&'a Signal<'a>, GraphError> {
        make_when(self, if_true, Some(if_false.into()))
    }

    /// Selects `if_true` when `self` is high, and zero otherwise.
    pub fn when<T: Into<Operand<'a>>>(&'a self, if_true: T) -> Result<&'a Signal<'a>, GraphError> {
        make_when(self, if_true, None)
    }

    /// Uses `self` as the selector of a multi-way mux. See [`make_case`].
    ///
    /// [`make_case`]: ./fn.make_case.html
    pub fn case<I, V>(
        &'a self,
        table: I,
        default: Option<Operand<'a>>,
    ) -> Result<&'a Signal<'a>, GraphError>
    where
        I: IntoIterator<Item = (u64, V)>,
        V: Into<Operand<'a>>,
    {
        make_case(self, table, default)
    }

    /// Returns `true` if this is a `Case` that covers every selector value.
    #[must_use]
    pub fn is_unique_case(&self) -> bool {
        matches!(
            self.data,
            SignalData::Op {
                args: OpArgs::Case(CaseData { unique: true, .. }),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    use rstest::rstest;

    #[rstest]
    #[case(OpKind::Not, 5, false, 3, false, 5, false)]
    #[case(OpKind::Not, 5, true, 3, false, 5, true)]
    #[case(OpKind::Any, 5, true, 3, false, 1, false)]
    #[case(OpKind::All, 5, false, 3, false, 1, false)]
    #[case(OpKind::Parity, 5, false, 3, false, 1, false)]
    #[case(OpKind::Or, 5, false, 3, true, 5, true)]
    #[case(OpKind::And, 2, false, 7, false, 7, false)]
    #[case(OpKind::Xor, 2, true, 7, false, 7, true)]
    #[case(OpKind::Add, 4, false, 4, false, 4, false)]
    #[case(OpKind::Sub, 3, true, 9, true, 9, true)]
    #[case(OpKind::Mul, 3, false, 9, false, 12, false)]
    #[case(OpKind::Mul, 3, true, 9, true, 12, true)]
    #[case(OpKind::Eq, 3, true, 3, true, 1, false)]
    #[case(OpKind::Neq, 3, false, 3, false, 1, false)]
    #[case(OpKind::Lt, 8, true, 8, true, 1, false)]
    #[case(OpKind::Le, 8, false, 8, false, 1, false)]
    #[case(OpKind::Gt, 8, false, 8, false, 1, false)]
    #[case(OpKind::Ge, 8, true, 8, true, 1, false)]
    #[case(OpKind::Lshift, 6, false, 32, false, 6, false)]
    #[case(OpKind::Rshift, 6, false, 32, false, 6, false)]
    #[case(OpKind::ArithLshift, 6, true, 32, false, 6, true)]
    #[case(OpKind::ArithRshift, 6, true, 32, false, 6, true)]
    #[case(OpKind::Concat, 6, true, 2, false, 8, true)]
    #[case(OpKind::Concat, 6, false, 2, true, 8, false)]
    #[case(OpKind::Slice, 6, true, 2, false, 2, true)]
    #[case(OpKind::When, 6, false, 6, false, 6, false)]
    #[case(OpKind::Case, 3, true, 3, true, 3, true)]
    #[case(OpKind::Reg, 16, false, 16, false, 16, false)]
    fn infer_table(
        #[case] kind: OpKind,
        #[case] x_width: u32,
        #[case] x_signed: bool,
        #[case] y_width: u32,
        #[case] y_signed: bool,
        #[case] width: u32,
        #[case] signed: bool,
    ) {
        let x = SignalType {
            width: x_width,
            signed: x_signed,
        };
        let y = SignalType {
            width: y_width,
            signed: y_signed,
        };
        assert_eq!(kind.infer(x, y), SignalType { width, signed });
    }

    #[rstest]
    #[case(OpKind::Or)]
    #[case(OpKind::And)]
    #[case(OpKind::Xor)]
    #[case(OpKind::Add)]
    #[case(OpKind::Sub)]
    fn binary_width_is_max_of_operands(#[case] kind: OpKind) {
        let c = Context::new();

        let x = c.wire(3);
        let y = c.wire(11);

        assert_eq!(make_op(kind, x, Some(y.into())).unwrap().width(), 11);
        assert_eq!(make_op(kind, y, Some(x.into())).unwrap().width(), 11);
    }

    #[rstest]
    #[case(OpKind::Eq)]
    #[case(OpKind::Neq)]
    #[case(OpKind::Lt)]
    #[case(OpKind::Le)]
    #[case(OpKind::Gt)]
    #[case(OpKind::Ge)]
    fn comparisons_are_one_bit(#[case] kind: OpKind) {
        let c = Context::new();

        let x = c.signed_wire(7);
        let y = c.signed_wire(7);

        let r = make_op(kind, x, Some(y.into())).unwrap();
        assert_eq!(r.ty(), SignalType::unsigned(1));
    }

    #[rstest]
    #[case(OpKind::Add)]
    #[case(OpKind::Sub)]
    #[case(OpKind::Mul)]
    #[case(OpKind::Eq)]
    #[case(OpKind::Ge)]
    fn sign_mismatch_error(#[case] kind: OpKind) {
        let c = Context::new();

        let x = c.wire(4);
        let y = c.signed_wire(4);

        assert_eq!(
            make_op(kind, x, Some(y.into())),
            Err(GraphError::SignMismatch { op: kind })
        );
    }

    #[test]
    fn bitwise_ops_allow_mixed_sign() {
        let c = Context::new();

        let x = c.wire(4);
        let y = c.signed_wire(4);

        assert!(x.or(y).unwrap().is_signed());
        assert!(x.and(y).unwrap().is_signed());
        assert!(x.concat(y).is_ok());
    }

    #[test]
    fn literal_operand_promoted_to_other_type() {
        let c = Context::new();

        let x = c.signed_wire(6);
        let r = x.sub(-3).unwrap();

        let rhs = match r.data {
            SignalData::Op {
                args: OpArgs::Binary(_, rhs),
                ..
            } => rhs,
            _ => unreachable!(),
        };
        assert_eq!(rhs.kind(), SignalKind::Constant);
        assert_eq!(rhs.ty(), SignalType::signed(6));
    }

    #[test]
    fn literal_operand_overflow_error() {
        let c = Context::new();

        let x = c.wire(4);

        assert!(matches!(
            x.add(100),
            Err(GraphError::ConstantOverflow { value, .. }) if value == Value::from(100)
        ));
    }

    #[test]
    fn all_literal_operands_error() {
        assert!(matches!(
            make_op(OpKind::Add, 1, Some(2.into())),
            Err(GraphError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn operand_count_errors() {
        let c = Context::new();

        let x = c.wire(4);

        assert!(matches!(
            make_op(OpKind::Not, x, Some(x.into())),
            Err(GraphError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            make_op(OpKind::Add, x, None),
            Err(GraphError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            make_op(OpKind::Slice, x, None),
            Err(GraphError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            make_op(OpKind::Reg, x, None),
            Err(GraphError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn unresolved_operand_error() {
        let c = Context::new();

        let x = c.wire(0);

        assert!(matches!(x.not(), Err(GraphError::UnresolvedWidth(_))));
        assert!(matches!(
            c.wire(3).add(x),
            Err(GraphError::UnresolvedWidth(_))
        ));
    }

    #[test]
    fn shift_distance_must_be_literal() {
        let c = Context::new();

        let x = c.wire(8);

        assert!(matches!(
            make_op(OpKind::Lshift, x, Some(c.wire(3).into())),
            Err(GraphError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            make_op(OpKind::Rshift, x, Some((-1).into())),
            Err(GraphError::UnsupportedOperation(_))
        ));
        assert_eq!(
            make_op(OpKind::Lshift, x, Some(3.into())).unwrap().width(),
            8
        );
    }

    #[rstest]
    #[case(OpKind::Lshift, false, OpKind::Lshift)]
    #[case(OpKind::Lshift, true, OpKind::ArithLshift)]
    #[case(OpKind::Rshift, false, OpKind::Rshift)]
    #[case(OpKind::Rshift, true, OpKind::ArithRshift)]
    #[case(OpKind::ArithLshift, false, OpKind::Lshift)]
    #[case(OpKind::ArithLshift, true, OpKind::ArithLshift)]
    #[case(OpKind::ArithRshift, false, OpKind::Rshift)]
    #[case(OpKind::ArithRshift, true, OpKind::ArithRshift)]
    fn shift_direction_follows_signedness(
        #[case] requested: OpKind,
        #[case] signed: bool,
        #[case] built: OpKind,
    ) {
        let c = Context::new();

        let x = if signed { c.signed_wire(8) } else { c.wire(8) };
        let r = make_op(requested, x, Some(2.into())).unwrap();

        assert_eq!(r.kind(), SignalKind::Operation(built));
    }

    #[test]
    fn slice_legalization() {
        assert_eq!(legalize_slice(8, ..), Ok((7, 0)));
        assert_eq!(legalize_slice(8, (7, 0)), Ok((7, 0)));
        assert_eq!(legalize_slice(8, (-1, 0)), Ok((7, 0)));
        assert_eq!(legalize_slice(8, (5, -8)), Ok((5, 0)));
        assert_eq!(legalize_slice(8, 4..), Ok((4, 0)));
        assert_eq!(legalize_slice(8, ..=3), Ok((7, 3)));
        assert_eq!(legalize_slice(8, (1, 6)), Ok((1, 6)));
    }

    #[test]
    fn slice_legalization_is_idempotent() {
        for width in 1..10u32 {
            for start in 0..width {
                for stop in 0..=start {
                    let legal = legalize_slice(width, (i64::from(start), i64::from(stop)));
                    assert_eq!(legal, Ok((start, stop)));
                }
            }
        }
    }

    #[test]
    fn slice_out_of_range_error() {
        assert_eq!(
            legalize_slice(8, (8, 0)),
            Err(GraphError::SliceOutOfRange {
                start: 8,
                stop: 0,
                width: 8
            })
        );
        assert!(matches!(
            legalize_slice(8, (0, -9)),
            Err(GraphError::SliceOutOfRange { .. })
        ));
    }

    #[test]
    fn stepped_slice_error() {
        assert!(matches!(
            legalize_slice(8, SliceRange::new(7, 0).with_step(2)),
            Err(GraphError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn open_slice_equals_full_slice() {
        let c = Context::new();

        let s = c.signed_wire(5);
        let open = s.slice(..).unwrap();
        let full = s.bits(4, 0).unwrap();

        assert_eq!(open.ty(), full.ty());
        assert_eq!(open.ty(), SignalType::signed(5));
    }

    #[test]
    fn when_condition_width_error() {
        let c = Context::new();

        let cond = c.wire(2);

        assert_eq!(
            cond.mux(c.wire(3), c.wire(3)),
            Err(GraphError::ConditionWidth(2))
        );
    }

    #[test]
    fn when_defaults_to_zero() {
        let c = Context::new();

        let cond = c.wire(1);
        let m = cond.when(c.signed_wire(5)).unwrap();

        assert_eq!(m.ty(), SignalType::signed(5));
        let if_false = match m.data {
            SignalData::Op {
                args: OpArgs::When { if_false, .. },
                ..
            } => if_false,
            _ => unreachable!(),
        };
        assert_eq!(if_false.constant_value(), Some(Value::from(0)));
        assert_eq!(if_false.ty(), SignalType::signed(5));
    }

    #[test]
    fn when_literal_branch_takes_signal_type() {
        let c = Context::new();

        let cond = c.wire(1);
        let m = cond.mux(7, c.wire(12)).unwrap();

        assert_eq!(m.ty(), SignalType::unsigned(12));
    }

    #[test]
    fn when_branch_mismatch_errors() {
        let c = Context::new();

        let cond = c.wire(1);

        assert_eq!(
            cond.mux(c.wire(3), c.wire(4)),
            Err(GraphError::WidthMismatch {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(
            cond.mux(c.wire(3), c.signed_wire(3)),
            Err(GraphError::SignMismatch { op: OpKind::When })
        );
    }

    #[test]
    fn full_case_is_unique() {
        let c = Context::new();

        let sel = c.wire(3);
        let out = sel
            .case((0..8u64).map(|key| (key, c.wire(8))), None)
            .unwrap();

        assert!(out.is_unique_case());
        assert_eq!(out.width(), 8);
        match out.data {
            SignalData::Op {
                args: OpArgs::Case(ref case),
                ..
            } => assert!(case.default.is_none()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn partial_case_defaults_to_zero() {
        let c = Context::new();

        let sel = c.wire(3);
        let out = sel.case(vec![(0, c.wire(8)), (5, c.wire(8))], None).unwrap();

        assert!(!out.is_unique_case());
        match out.data {
            SignalData::Op {
                args: OpArgs::Case(ref case),
                ..
            } => assert_eq!(
                case.default.and_then(|d| d.constant_value()),
                Some(Value::from(0))
            ),
            _ => unreachable!(),
        }
    }

    #[test]
    fn case_literal_values_get_shared_type() {
        let c = Context::new();

        let sel = c.wire(2);

        let out = sel.case(vec![(0, 1), (1, 9)], None).unwrap();
        assert_eq!(out.ty(), SignalType::unsigned(4));

        let out = sel.case(vec![(0, 3), (1, -1)], None).unwrap();
        assert_eq!(out.ty(), SignalType::signed(3));

        let out = sel.case(vec![(0, 0)], None).unwrap();
        assert_eq!(out.ty(), SignalType::unsigned(1));
    }

    #[test]
    fn case_signal_value_type_is_authoritative() {
        let c = Context::new();

        let sel = c.wire(1);
        let out = sel
            .case(vec![(0, Operand::from(2)), (1, c.signed_wire(6).into())], None)
            .unwrap();

        assert_eq!(out.ty(), SignalType::signed(6));
    }

    #[test]
    fn case_errors() {
        let c = Context::new();

        let sel = c.wire(2);

        assert!(matches!(
            c.signed_wire(2).case(vec![(0, 1)], None),
            Err(GraphError::InvalidCase(_))
        ));
        assert!(matches!(
            sel.case(Vec::<(u64, i32)>::new(), None),
            Err(GraphError::InvalidCase(_))
        ));
        assert!(matches!(
            sel.case(vec![(4, 1)], None),
            Err(GraphError::InvalidCase(_))
        ));
        assert!(matches!(
            sel.case(vec![(1, 1), (1, 2)], None),
            Err(GraphError::InvalidCase(_))
        ));
        assert!(matches!(
            sel.case(vec![(0, c.wire(3)), (1, c.wire(4))], None),
            Err(GraphError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn concat_all_first_operand_is_msb() {
        let c = Context::new();

        let a = c.signed_wire(1);
        let b = c.wire(2);
        let d = c.wire(3);

        let r = concat_all(&[a.into(), b.into(), d.into()]).unwrap();
        assert_eq!(r.ty(), SignalType::signed(6));
        assert!(concat_all(&[]).is_err());
        assert_eq!(concat_all(&[b.into()]), Ok(b));
    }
}
