use super::context::*;
use super::error::*;
use super::module::*;
use super::signal::*;
use super::value::*;

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

/// An instance of a [`Module`], created by the [`Context`]::[`instance`] method.
///
/// An `Instance` owns a fresh copy of each of the module's inputs, which the caller drives, and a proxy signal for each of its outputs, which the caller reads.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// // Inner module (simple pass-through)
/// let inner = c.module("Inner").unwrap();
/// let i = inner.input("i", 32).unwrap();
/// inner.output("o", 32).unwrap().drive(i).unwrap();
///
/// // Outer module (wraps a single `Inner` instance)
/// let outer = c.module("Outer").unwrap();
/// let inner_inst = c.instance(inner).named("inner_inst");
/// inner_inst.bind("i", outer.input("i", 32).unwrap()).unwrap();
/// outer.output("o", 32).unwrap().drive(inner_inst.output("o").unwrap()).unwrap();
/// ```
///
/// [`Module`]: ./struct.Module.html
/// [`Context`]: ./struct.Context.html
/// [`instance`]: ./struct.Context.html#method.instance
#[must_use]
pub struct Instance<'a> {
    pub(super) context: &'a Context<'a>,

    pub(crate) module: &'a Module<'a>,
    pub(crate) name: RefCell<Option<String>>,

    pub(crate) inputs: RefCell<Vec<(String, &'a Signal<'a>)>>,
    pub(crate) outputs: RefCell<Vec<(String, &'a Signal<'a>)>>,
}

impl<'a> Instance<'a> {
    pub(super) fn new(context: &'a Context<'a>, module: &'a Module<'a>) -> Instance<'a> {
        Instance {
            context,

            module,
            name: RefCell::new(None),

            inputs: RefCell::new(Vec::new()),
            outputs: RefCell::new(Vec::new()),
        }
    }

    /// Creates this instance's port copies. Outputs are pre-wired to the module's own output signals.
    pub(super) fn create_ports(&'a self) {
        for (name, port) in self.module.ports() {
            match port.kind() {
                SignalKind::Input => {
                    let copy = self
                        .context
                        .alloc_signal(port.ty(), SignalData::Input { owner: Some(self) })
                        .named(name.clone());
                    self.inputs.borrow_mut().push((name, copy));
                }
                _ => {
                    let proxy = self
                        .context
                        .alloc_signal(port.ty(), SignalData::Output { owner: Some(self) });
                    proxy.driver.set(Some(port));
                    self.outputs.borrow_mut().push((name, proxy));
                }
            }
        }
    }

    #[must_use]
    pub fn module(&self) -> &'a Module<'a> {
        self.module
    }

    /// Gives this `Instance` an explicit instance name and returns it.
    pub fn named<S: Into<String>>(&'a self, name: S) -> &'a Instance<'a> {
        *self.name.borrow_mut() = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    /// Returns this instance's copy of the input called `name`, which is driven by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownPort`] if the module has no such input.
    ///
    /// [`GraphError::UnknownPort`]: ./enum.GraphError.html#variant.UnknownPort
    pub fn input(&self, name: &str) -> Result<&'a Signal<'a>, GraphError> {
        find_port(&self.inputs.borrow(), name).ok_or_else(|| self.unknown_port(name))
    }

    /// Returns the proxy signal for the output called `name`, which can be read by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownPort`] if the module has no such output.
    ///
    /// [`GraphError::UnknownPort`]: ./enum.GraphError.html#variant.UnknownPort
    pub fn output(&self, name: &str) -> Result<&'a Signal<'a>, GraphError> {
        find_port(&self.outputs.borrow(), name).ok_or_else(|| self.unknown_port(name))
    }

    /// Connects the port called `name`: an input is driven by `signal`, and an output drives `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownPort`] if there's no such port, [`GraphError::UnsupportedOperation`] if a literal is bound to an output, and any error of [`connect`].
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let inc = c.module("Inc").unwrap();
    /// let x = inc.input("x", 4).unwrap();
    /// inc.output("y", 4).unwrap().drive(x.add(1).unwrap()).unwrap();
    ///
    /// let result = c.wire(4);
    /// let inst = c.instance(inc);
    /// inst.bind("x", 3).unwrap();
    /// inst.bind("y", result).unwrap();
    /// assert_eq!(result.driver(), Some(inst.output("y").unwrap()));
    /// ```
    ///
    /// [`GraphError::UnknownPort`]: ./enum.GraphError.html#variant.UnknownPort
    /// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
    /// [`connect`]: ./fn.connect.html
    pub fn bind<S: Into<Operand<'a>>>(&'a self, name: &str, signal: S) -> Result<(), GraphError> {
        if let Some(input) = find_port(&self.inputs.borrow(), name) {
            return connect(input, signal);
        }
        let output = self.output(name)?;
        match signal.into() {
            Operand::Signal(target) => connect(target, output),
            Operand::Literal(_) => Err(GraphError::UnsupportedOperation(format!(
                "binding a literal to output \"{}\"",
                name
            ))),
        }
    }

    /// Checks that every input of this instance is driven.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UndrivenPort`] listing every undriven input.
    ///
    /// [`GraphError::UndrivenPort`]: ./enum.GraphError.html#variant.UndrivenPort
    pub fn validate(&self) -> Result<(), GraphError> {
        let undriven = self
            .inputs
            .borrow()
            .iter()
            .filter(|(_, input)| input.driver().is_none())
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        if undriven.is_empty() {
            Ok(())
        } else {
            Err(GraphError::UndrivenPort {
                owner: self.describe(),
                ports: undriven,
            })
        }
    }

    fn unknown_port(&self, name: &str) -> GraphError {
        GraphError::UnknownPort {
            owner: self.describe(),
            port: name.into(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self.name.borrow().as_ref() {
            Some(name) => format!("Instance \"{}\" of \"{}\"", name, self.module.name),
            None => format!("Instance of \"{}\"", self.module.name),
        }
    }
}

fn find_port<'a>(ports: &[(String, &'a Signal<'a>)], name: &str) -> Option<&'a Signal<'a>> {
    ports
        .iter()
        .find(|(port, _)| port == name)
        .map(|&(_, signal)| signal)
}

impl<'a> fmt::Debug for Instance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name.borrow())
            .field("module", &self.module.name)
            .finish()
    }
}

impl<'a> Eq for &'a Instance<'a> {}

impl<'a> Hash for &'a Instance<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(*self as *const _ as usize)
    }
}

impl<'a> PartialEq for &'a Instance<'a> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(*self, *other)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn adder<'a>(c: &'a Context<'a>) -> &'a Module<'a> {
        let m = c.module("Adder").unwrap();
        let a = m.input("a", 4).unwrap();
        let b = m.input("b", 4).unwrap();
        m.output("q", 4).unwrap().drive(a.add(b).unwrap()).unwrap();
        m
    }

    #[test]
    fn inputs_are_owned_copies() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m);

        let a = inst.input("a").unwrap();
        assert_ne!(a, m.port("a").unwrap());
        assert_eq!(a.owner(), Some(inst));
        assert_eq!(a.width(), 4);
        assert!(a.driver().is_none());
    }

    #[test]
    fn outputs_are_proxies_of_module_outputs() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m);

        let q = inst.output("q").unwrap();
        assert_eq!(q.driver(), Some(m.port("q").unwrap()));
        assert_eq!(q.owner(), Some(inst));
    }

    #[test]
    fn instance_inputs_are_drivable() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m);

        inst.input("a").unwrap().drive(c.wire(4)).unwrap();
        inst.bind("b", 7).unwrap();
        assert!(matches!(
            inst.bind("b", 7),
            Err(GraphError::MultipleDriver { .. })
        ));
    }

    #[test]
    fn unknown_port_errors() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m);

        assert!(matches!(
            inst.input("q"),
            Err(GraphError::UnknownPort { .. })
        ));
        assert!(matches!(
            inst.output("a"),
            Err(GraphError::UnknownPort { .. })
        ));
        assert!(matches!(
            inst.bind("c", c.wire(4)),
            Err(GraphError::UnknownPort { .. })
        ));
    }

    #[test]
    fn bind_literal_to_output_error() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m);

        assert!(matches!(
            inst.bind("q", 1),
            Err(GraphError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn validate_lists_every_undriven_input() {
        let c = Context::new();

        let m = adder(&c);
        let inst = c.instance(m).named("add0");

        assert_eq!(
            inst.validate(),
            Err(GraphError::UndrivenPort {
                owner: "Instance \"add0\" of \"Adder\"".into(),
                ports: vec!["a".into(), "b".into()],
            })
        );
        inst.bind("a", 1).unwrap();
        inst.bind("b", 2).unwrap();
        assert!(inst.validate().is_ok());
    }

    #[test]
    fn instance_with_binds_ports() {
        let c = Context::new();

        let m = adder(&c);
        let x = c.wire(4);
        let q = c.wire(4);
        let inst = c
            .instance_with(m, &[("a", x.into()), ("b", 1.into()), ("q", q.into())])
            .unwrap();

        assert_eq!(inst.input("a").unwrap().driver(), Some(x));
        assert_eq!(q.driver(), Some(inst.output("q").unwrap()));
        assert!(inst.validate().is_ok());
    }
}
