use super::context::*;
use super::error::*;
use super::signal::*;
use super::value::*;

/// Control signals and reset values of a register.
pub(crate) struct RegisterData<'a> {
    pub clk: &'a Signal<'a>,
    pub enable: Option<&'a Signal<'a>>,
    pub reset: Option<&'a Signal<'a>>,
    pub reset_value: Value,
    pub async_reset: Option<&'a Signal<'a>>,
    pub async_reset_value: Value,
}

/// The flip-flop template used for a register, selected by which control signals it has.
///
/// All control signals are active-high. When several are asserted, the async reset wins over the sync reset, which wins over the enable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FlipFlop {
    Plain,
    Enable,
    Reset,
    ResetEnable,
    AsyncReset,
    AsyncResetEnable,
    AsyncSyncReset,
    AsyncSyncResetEnable,
}

impl FlipFlop {
    pub const ALL: [FlipFlop; 8] = [
        FlipFlop::Plain,
        FlipFlop::Enable,
        FlipFlop::Reset,
        FlipFlop::ResetEnable,
        FlipFlop::AsyncReset,
        FlipFlop::AsyncResetEnable,
        FlipFlop::AsyncSyncReset,
        FlipFlop::AsyncSyncResetEnable,
    ];

    /// Selects the template for a register with the given control signals.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// assert_eq!(FlipFlop::select(true, true, false), FlipFlop::ResetEnable);
    /// assert_eq!(FlipFlop::select(false, false, true), FlipFlop::AsyncReset);
    /// ```
    #[must_use]
    pub fn select(has_enable: bool, has_reset: bool, has_async_reset: bool) -> FlipFlop {
        match (has_enable, has_reset, has_async_reset) {
            (false, false, false) => FlipFlop::Plain,
            (true, false, false) => FlipFlop::Enable,
            (false, true, false) => FlipFlop::Reset,
            (true, true, false) => FlipFlop::ResetEnable,
            (false, false, true) => FlipFlop::AsyncReset,
            (true, false, true) => FlipFlop::AsyncResetEnable,
            (false, true, true) => FlipFlop::AsyncSyncReset,
            (true, true, true) => FlipFlop::AsyncSyncResetEnable,
        }
    }

    #[must_use]
    pub fn has_enable(self) -> bool {
        matches!(
            self,
            FlipFlop::Enable
                | FlipFlop::ResetEnable
                | FlipFlop::AsyncResetEnable
                | FlipFlop::AsyncSyncResetEnable
        )
    }

    #[must_use]
    pub fn has_reset(self) -> bool {
        matches!(
            self,
            FlipFlop::Reset
                | FlipFlop::ResetEnable
                | FlipFlop::AsyncSyncReset
                | FlipFlop::AsyncSyncResetEnable
        )
    }

    #[must_use]
    pub fn has_async_reset(self) -> bool {
        matches!(
            self,
            FlipFlop::AsyncReset
                | FlipFlop::AsyncResetEnable
                | FlipFlop::AsyncSyncReset
                | FlipFlop::AsyncSyncResetEnable
        )
    }
}

/// Configures a register before it's created, returned by [`Context::reg`].
///
/// The register's next value is connected afterwards with [`Signal::drive`].
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let m = c.module("counter").unwrap();
/// let clk = m.input("clk", 1).unwrap();
/// let rst = m.input("rst", 1).unwrap();
/// let en = m.input("en", 1).unwrap();
///
/// let count = c
///     .reg(8, clk)
///     .enable(en)
///     .reset(rst)
///     .reset_value(0xffu32)
///     .build()
///     .unwrap();
/// count.drive(count.add(1).unwrap()).unwrap();
/// assert_eq!(count.flip_flop(), Some(FlipFlop::ResetEnable));
///
/// m.output("count", 8).unwrap().drive(count).unwrap();
/// ```
///
/// [`Context::reg`]: ./struct.Context.html#method.reg
/// [`Signal::drive`]: ./struct.Signal.html#method.drive
#[must_use]
pub struct RegisterBuilder<'a> {
    context: &'a Context<'a>,
    ty: SignalType,
    clk: &'a Signal<'a>,
    enable: Option<&'a Signal<'a>>,
    reset: Option<&'a Signal<'a>>,
    reset_value: Option<Value>,
    async_reset: Option<&'a Signal<'a>>,
    async_reset_value: Option<Value>,
    name: Option<String>,
}

impl<'a> RegisterBuilder<'a> {
    pub(super) fn new(context: &'a Context<'a>, width: u32, clk: &'a Signal<'a>) -> Self {
        RegisterBuilder {
            context,
            ty: SignalType::unsigned(width),
            clk,
            enable: None,
            reset: None,
            reset_value: None,
            async_reset: None,
            async_reset_value: None,
            name: None,
        }
    }

    pub fn signed(mut self) -> Self {
        self.ty.signed = true;
        self
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn enable(mut self, enable: &'a Signal<'a>) -> Self {
        self.enable = Some(enable);
        self
    }

    /// Adds a synchronous reset. The reset value defaults to `0`.
    pub fn reset(mut self, reset: &'a Signal<'a>) -> Self {
        self.reset = Some(reset);
        self
    }

    pub fn reset_value<V: Into<Value>>(mut self, value: V) -> Self {
        self.reset_value = Some(value.into());
        self
    }

    /// Adds an asynchronous reset. The reset value defaults to `0`.
    pub fn async_reset(mut self, async_reset: &'a Signal<'a>) -> Self {
        self.async_reset = Some(async_reset);
        self
    }

    pub fn async_reset_value<V: Into<Value>>(mut self, value: V) -> Self {
        self.async_reset_value = Some(value.into());
        self
    }

    /// Creates the register.
    ///
    /// Control signal widths are checked when the register is validated, since they may still be unresolved here.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnsupportedOperation`] if a reset value is given without the matching reset, and [`GraphError::ConstantOverflow`] if a reset value doesn't fit into the register.
    ///
    /// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
    /// [`GraphError::ConstantOverflow`]: ./enum.GraphError.html#variant.ConstantOverflow
    pub fn build(self) -> Result<&'a Signal<'a>, GraphError> {
        if self.reset.is_none() && self.reset_value.is_some() {
            return Err(GraphError::UnsupportedOperation(
                "a reset value requires a reset".into(),
            ));
        }
        if self.async_reset.is_none() && self.async_reset_value.is_some() {
            return Err(GraphError::UnsupportedOperation(
                "an async reset value requires an async reset".into(),
            ));
        }

        let reset_value = self.reset_value.unwrap_or_else(|| Value::from(0));
        let async_reset_value = self.async_reset_value.unwrap_or_else(|| Value::from(0));
        if self.ty.width != 0 {
            for value in [reset_value, async_reset_value] {
                if !value.fits(self.ty.width, self.ty.signed) {
                    return Err(GraphError::ConstantOverflow {
                        value,
                        width: self.ty.width,
                        signed: self.ty.signed,
                    });
                }
            }
        }

        let reg = self.context.alloc_op(
            OpKind::Reg,
            self.ty,
            OpArgs::Reg(RegisterData {
                clk: self.clk,
                enable: self.enable,
                reset: self.reset,
                reset_value,
                async_reset: self.async_reset,
                async_reset_value,
            }),
        );
        if let Some(name) = self.name {
            reg.named(name);
        }
        Ok(reg)
    }
}

impl<'a> Signal<'a> {
    /// Creates a plain register clocked by `clk` whose next value is `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let clk = c.wire(1);
    /// let d = c.wire(4);
    /// let q = d.reg(clk).unwrap();
    /// assert_eq!(q.flip_flop(), Some(FlipFlop::Plain));
    /// assert_eq!(q.driver(), Some(d));
    /// ```
    pub fn reg(&'a self, clk: &'a Signal<'a>) -> Result<&'a Signal<'a>, GraphError> {
        let width = self.resolved_width()?;
        let mut builder = RegisterBuilder::new(self.context, width, clk);
        if self.is_signed() {
            builder = builder.signed();
        }
        let reg = builder.build()?;
        reg.drive(self)?;
        Ok(reg)
    }

    pub(crate) fn register_data(&self) -> Option<&RegisterData<'a>> {
        match self.data {
            SignalData::Op {
                args: OpArgs::Reg(ref data),
                ..
            } => Some(data),
            _ => None,
        }
    }

    /// Returns the flip-flop template of a register, or `None` if this isn't a register.
    #[must_use]
    pub fn flip_flop(&self) -> Option<FlipFlop> {
        self.register_data().map(|data| {
            FlipFlop::select(
                data.enable.is_some(),
                data.reset.is_some(),
                data.async_reset.is_some(),
            )
        })
    }

    /// Checks that a register is driven and that its control signals are 1 bit wide.
    ///
    /// Signals other than registers are always valid.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::RegisterConfig`] listing every problem found.
    ///
    /// [`GraphError::RegisterConfig`]: ./enum.GraphError.html#variant.RegisterConfig
    pub fn validate_register(&self) -> Result<(), GraphError> {
        let data = match self.register_data() {
            Some(data) => data,
            None => return Ok(()),
        };

        let mut problems = Vec::new();
        if self.driver().is_none() {
            problems.push(RegisterProblem::MissingDriver);
        }
        match data.clk.width() {
            0 => problems.push(RegisterProblem::MissingClock),
            1 => (),
            width => problems.push(RegisterProblem::ClockWidth(width)),
        }
        let controls: [(Option<&Signal<'a>>, fn(u32) -> RegisterProblem); 3] = [
            (data.enable, RegisterProblem::EnableWidth),
            (data.reset, RegisterProblem::ResetWidth),
            (data.async_reset, RegisterProblem::AsyncResetWidth),
        ];
        for (control, problem) in controls {
            if let Some(control) = control {
                if control.width() != 1 {
                    problems.push(problem(control.width()));
                }
            }
        }
        let width = self.width();
        if width != 0 {
            let resets = [
                (data.reset.is_some(), data.reset_value),
                (data.async_reset.is_some(), data.async_reset_value),
            ];
            for (used, value) in resets {
                if used && !value.fits(width, self.is_signed()) {
                    problems.push(RegisterProblem::ResetValueOverflow {
                        value,
                        width,
                    });
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GraphError::RegisterConfig {
                register: self.describe(),
                problems,
            })
        }
    }
}
