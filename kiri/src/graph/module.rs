use super::context::*;
use super::error::*;
use super::instance::*;
use super::signal::*;

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

/// A named, reusable hardware design unit, created by the [`Context`]::[`module`] method.
///
/// A `Module` exposes an ordered list of input and output ports. Its internal logic is whatever is reachable backwards from its outputs.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let m = c.module("Passthrough").unwrap();
/// let i = m.input("i", 1).unwrap();
/// m.output("o", 1).unwrap().drive(i).unwrap();
/// ```
///
/// [`Context`]: ./struct.Context.html
/// [`module`]: ./struct.Context.html#method.module
#[must_use]
pub struct Module<'a> {
    pub(super) context: &'a Context<'a>,

    pub(crate) name: String,

    pub(crate) ports: RefCell<Vec<(String, &'a Signal<'a>)>>,
    pub(crate) params: RefCell<Vec<(String, String)>>,
    pub(crate) output_file: RefCell<Option<String>>,
}

impl<'a> Module<'a> {
    pub(super) fn new(context: &'a Context<'a>, name: String) -> Module<'a> {
        Module {
            context,

            name,

            ports: RefCell::new(Vec::new()),
            params: RefCell::new(Vec::new()),
            output_file: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn add_port(
        &'a self,
        name: String,
        ty: SignalType,
        data: SignalData<'a>,
    ) -> Result<&'a Signal<'a>, GraphError> {
        if self.ports.borrow().iter().any(|(port, _)| *port == name) {
            return Err(GraphError::DuplicatePort {
                module: self.name.clone(),
                port: name,
            });
        }
        let signal = self.context.alloc_signal(ty, data).named(name.clone());
        self.ports.borrow_mut().push((name, signal));
        Ok(signal)
    }

    /// Creates an unsigned input port called `name` with `width` bits.
    ///
    /// A `width` of `0` is resolved when the port is first connected to a signal with a known width.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicatePort`] if this `Module` already has a port called `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let m = c.module("m").unwrap();
    /// let a = m.input("a", 8).unwrap();
    /// assert!(m.input("a", 8).is_err());
    /// ```
    ///
    /// [`GraphError::DuplicatePort`]: ./enum.GraphError.html#variant.DuplicatePort
    pub fn input<S: Into<String>>(&'a self, name: S, width: u32) -> Result<&'a Signal<'a>, GraphError> {
        self.add_port(
            name.into(),
            SignalType::unsigned(width),
            SignalData::Input { owner: None },
        )
    }

    pub fn signed_input<S: Into<String>>(
        &'a self,
        name: S,
        width: u32,
    ) -> Result<&'a Signal<'a>, GraphError> {
        self.add_port(
            name.into(),
            SignalType::signed(width),
            SignalData::Input { owner: None },
        )
    }

    /// Creates an unsigned output port called `name` with `width` bits.
    ///
    /// The returned [`Signal`] is driven with [`Signal::drive`] and can be read inside this `Module` like any other signal.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicatePort`] if this `Module` already has a port called `name`.
    ///
    /// [`Signal`]: ./struct.Signal.html
    /// [`Signal::drive`]: ./struct.Signal.html#method.drive
    /// [`GraphError::DuplicatePort`]: ./enum.GraphError.html#variant.DuplicatePort
    pub fn output<S: Into<String>>(
        &'a self,
        name: S,
        width: u32,
    ) -> Result<&'a Signal<'a>, GraphError> {
        self.add_port(
            name.into(),
            SignalType::unsigned(width),
            SignalData::Output { owner: None },
        )
    }

    pub fn signed_output<S: Into<String>>(
        &'a self,
        name: S,
        width: u32,
    ) -> Result<&'a Signal<'a>, GraphError> {
        self.add_port(
            name.into(),
            SignalType::signed(width),
            SignalData::Output { owner: None },
        )
    }

    /// Looks up the port called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownPort`] if there's no such port.
    ///
    /// [`GraphError::UnknownPort`]: ./enum.GraphError.html#variant.UnknownPort
    pub fn port(&self, name: &str) -> Result<&'a Signal<'a>, GraphError> {
        self.ports
            .borrow()
            .iter()
            .find(|(port, _)| port == name)
            .map(|&(_, signal)| signal)
            .ok_or_else(|| GraphError::UnknownPort {
                owner: format!("Module \"{}\"", self.name),
                port: name.into(),
            })
    }

    /// All ports, in declaration order.
    #[must_use]
    pub fn ports(&self) -> Vec<(String, &'a Signal<'a>)> {
        self.ports.borrow().clone()
    }

    #[must_use]
    pub fn inputs(&self) -> Vec<(String, &'a Signal<'a>)> {
        self.ports_of_kind(SignalKind::Input)
    }

    #[must_use]
    pub fn outputs(&self) -> Vec<(String, &'a Signal<'a>)> {
        self.ports_of_kind(SignalKind::Output)
    }

    fn ports_of_kind(&self, kind: SignalKind) -> Vec<(String, &'a Signal<'a>)> {
        self.ports
            .borrow()
            .iter()
            .filter(|(_, signal)| signal.kind() == kind)
            .cloned()
            .collect()
    }

    pub(crate) fn is_port(&self, signal: &'a Signal<'a>) -> bool {
        self.ports.borrow().iter().any(|&(_, port)| port == signal)
    }

    /// Records a construction parameter; parameters are emitted as comments above the module header.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let fifo = c.module("Fifo_8x16").unwrap();
    /// fifo.param("depth", 16).param("width", 8);
    /// ```
    pub fn param<S: Into<String>, V: fmt::Display>(&self, name: S, value: V) -> &Self {
        self.params
            .borrow_mut()
            .push((name.into(), value.to_string()));
        self
    }

    /// Sets the output file this `Module` is written to. Modules sharing a file are concatenated.
    ///
    /// By default, each `Module` gets its own file named after it.
    pub fn set_output_file<S: Into<String>>(&self, file_name: S) -> &Self {
        *self.output_file.borrow_mut() = Some(file_name.into());
        self
    }

    /// Returns the output file name this `Module` is written to.
    #[must_use]
    pub fn output_file(&self) -> String {
        match self.output_file.borrow().as_ref() {
            Some(file_name) => file_name.clone(),
            None => format!("{}.sv", self.name),
        }
    }

    /// Creates an [`Instance`] of this `Module`. Equivalent to [`Context::instance`].
    ///
    /// [`Instance`]: ./struct.Instance.html
    /// [`Context::instance`]: ./struct.Context.html#method.instance
    pub fn instantiate(&'a self) -> &'a Instance<'a> {
        self.context.instance(self)
    }

    /// Checks that every output port is driven.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UndrivenPort`] listing every undriven output.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let m = c.module("Top").unwrap();
    /// let _ = m.output("q", 4).unwrap();
    /// assert_eq!(
    ///     m.validate().unwrap_err().to_string(),
    ///     "Module \"Top\" has undriven ports: q."
    /// );
    /// ```
    ///
    /// [`GraphError::UndrivenPort`]: ./enum.GraphError.html#variant.UndrivenPort
    pub fn validate(&self) -> Result<(), GraphError> {
        let undriven = self
            .outputs()
            .into_iter()
            .filter(|(_, signal)| signal.driver().is_none())
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        if undriven.is_empty() {
            Ok(())
        } else {
            Err(GraphError::UndrivenPort {
                owner: format!("Module \"{}\"", self.name),
                ports: undriven,
            })
        }
    }
}

impl<'a> Eq for &'a Module<'a> {}

impl<'a> Hash for &'a Module<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(*self as *const _ as usize)
    }
}

impl<'a> PartialEq for &'a Module<'a> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(*self, *other)
    }
}
