use super::error::*;
use super::instance::*;
use super::mem::*;
use super::module::*;
use super::register::*;
use super::signal::*;
use super::value::*;

use log::debug;
use typed_arena::Arena;

use std::cell::{Cell, RefCell};

/// A top-level container/owner object for a signal graph.
///
/// A `Context` owns every part of a graph: signals, [`Module`]s, [`Instance`]s and [`Memory`]s. Everything it creates lives as long as the `Context` itself.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let m = c.module("MyModule").unwrap();
/// let i = m.input("in", 1).unwrap();
/// m.output("out", 1).unwrap().drive(i).unwrap();
/// ```
///
/// [`Module`]: ./struct.Module.html
/// [`Instance`]: ./struct.Instance.html
/// [`Memory`]: ./struct.Memory.html
#[must_use]
pub struct Context<'a> {
    signal_arena: Arena<Signal<'a>>,
    module_arena: Arena<Module<'a>>,
    instance_arena: Arena<Instance<'a>>,
    memory_arena: Arena<Memory<'a>>,

    pub(super) modules: RefCell<Vec<&'a Module<'a>>>,
}

impl<'a> Context<'a> {
    /// Creates a new, empty `Context`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    /// ```
    pub fn new() -> Context<'a> {
        Context {
            signal_arena: Arena::new(),
            module_arena: Arena::new(),
            instance_arena: Arena::new(),
            memory_arena: Arena::new(),

            modules: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn alloc_signal(&'a self, ty: SignalType, data: SignalData<'a>) -> &'a Signal<'a> {
        self.signal_arena.alloc(Signal {
            context: self,

            name: RefCell::new(None),
            width: Cell::new(ty.width),
            signed: Cell::new(ty.signed),
            driver: Cell::new(None),

            data,
        })
    }

    pub(crate) fn alloc_op(&'a self, kind: OpKind, ty: SignalType, args: OpArgs<'a>) -> &'a Signal<'a> {
        self.alloc_signal(ty, SignalData::Op { kind, args })
    }

    pub(crate) fn alloc_memory(&'a self, memory: Memory<'a>) -> &'a Memory<'a> {
        self.memory_arena.alloc(memory)
    }

    /// Creates a new [`Module`] called `name` in this `Context`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateModule`] if a [`Module`] with the same `name` already exists in this `Context`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let _ = c.module("A").unwrap(); // Unique name, OK
    /// let _ = c.module("B").unwrap(); // Unique name, OK
    ///
    /// assert!(c.module("A").is_err()); // Non-unique name
    /// ```
    ///
    /// [`Module`]: ./struct.Module.html
    /// [`GraphError::DuplicateModule`]: ./enum.GraphError.html#variant.DuplicateModule
    pub fn module<S: Into<String>>(&'a self, name: S) -> Result<&'a Module<'a>, GraphError> {
        let name = name.into();
        if self.find_module(&name).is_some() {
            return Err(GraphError::DuplicateModule(name));
        }
        let module = self.module_arena.alloc(Module::new(self, name));
        self.modules.borrow_mut().push(module);
        Ok(module)
    }

    /// Returns the [`Module`] called `name`, building it with `build` if it doesn't exist yet.
    ///
    /// This gives one [`Module`] per specialization no matter how many times it's requested.
    ///
    /// # Errors
    ///
    /// Returns any error returned by `build`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// fn delay<'a>(c: &'a Context<'a>, width: u32) -> Result<&'a Module<'a>, GraphError> {
    ///     c.specialize(format!("Delay_{}", width), |m| {
    ///         m.param("width", width);
    ///         let clk = m.input("clk", 1)?;
    ///         let d = m.input("d", width)?;
    ///         m.output("q", width)?.drive(d.reg(clk)?)
    ///     })
    /// }
    ///
    /// let c = Context::new();
    ///
    /// let a = delay(&c, 8).unwrap();
    /// let b = delay(&c, 8).unwrap();
    /// assert!(std::ptr::eq(a, b));
    /// ```
    ///
    /// [`Module`]: ./struct.Module.html
    pub fn specialize<S, F>(&'a self, name: S, build: F) -> Result<&'a Module<'a>, GraphError>
    where
        S: Into<String>,
        F: FnOnce(&'a Module<'a>) -> Result<(), GraphError>,
    {
        let name = name.into();
        if let Some(module) = self.find_module(&name) {
            debug!("Reusing module \"{}\"", name);
            return Ok(module);
        }
        let module = self.module(name)?;
        build(module)?;
        Ok(module)
    }

    fn find_module(&self, name: &str) -> Option<&'a Module<'a>> {
        self.modules
            .borrow()
            .iter()
            .find(|module| module.name == name)
            .copied()
    }

    /// Creates an unsigned wire with `width` bits, or with a width resolved on first connection if `width` is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let w = c.wire(8);
    /// w.drive(0x42).unwrap();
    /// ```
    pub fn wire(&'a self, width: u32) -> &'a Signal<'a> {
        self.alloc_signal(SignalType::unsigned(width), SignalData::Wire)
    }

    pub fn signed_wire(&'a self, width: u32) -> &'a Signal<'a> {
        self.alloc_signal(SignalType::signed(width), SignalData::Wire)
    }

    /// Creates an unsigned constant with `width` bits.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConstantOverflow`] if `value` doesn't fit into `width` unsigned bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiri::*;
    ///
    /// let c = Context::new();
    ///
    /// let eight_bit_const = c.constant(0xffu32, 8).unwrap();
    /// let one_bit_const = c.constant(false, 1).unwrap();
    /// assert!(c.constant(0x100u32, 8).is_err());
    /// ```
    ///
    /// [`GraphError::ConstantOverflow`]: ./enum.GraphError.html#variant.ConstantOverflow
    pub fn constant<V: Into<Value>>(&'a self, value: V, width: u32) -> Result<&'a Signal<'a>, GraphError> {
        self.constant_of(value.into(), SignalType::unsigned(width))
    }

    /// Creates a signed (two's complement) constant with `width` bits.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConstantOverflow`] if `value` doesn't fit into `width` signed bits.
    ///
    /// [`GraphError::ConstantOverflow`]: ./enum.GraphError.html#variant.ConstantOverflow
    pub fn signed_constant<V: Into<Value>>(
        &'a self,
        value: V,
        width: u32,
    ) -> Result<&'a Signal<'a>, GraphError> {
        self.constant_of(value.into(), SignalType::signed(width))
    }

    pub(crate) fn constant_of(&'a self, value: Value, ty: SignalType) -> Result<&'a Signal<'a>, GraphError> {
        if !value.fits(ty.width, ty.signed) {
            return Err(GraphError::ConstantOverflow {
                value,
                width: ty.width,
                signed: ty.signed,
            });
        }
        Ok(self.alloc_signal(ty, SignalData::Constant { value }))
    }

    /// Starts building a register with `width` bits clocked on the rising edge of `clk`.
    ///
    /// See [`RegisterBuilder`] for the optional control signals.
    ///
    /// [`RegisterBuilder`]: ./struct.RegisterBuilder.html
    pub fn reg(&'a self, width: u32, clk: &'a Signal<'a>) -> RegisterBuilder<'a> {
        RegisterBuilder::new(self, width, clk)
    }

    /// Starts building a memory with `2^address_width` elements of `data_width` bits, clocked on the rising edge of `clk`.
    ///
    /// See [`MemoryBuilder`] for the port configuration.
    ///
    /// [`MemoryBuilder`]: ./struct.MemoryBuilder.html
    pub fn memory(
        &'a self,
        address_width: u32,
        data_width: u32,
        clk: &'a Signal<'a>,
    ) -> MemoryBuilder<'a> {
        MemoryBuilder::new(self, address_width, data_width, clk)
    }

    /// Creates an [`Instance`] of `module` with unconnected inputs.
    ///
    /// [`Instance`]: ./struct.Instance.html
    pub fn instance(&'a self, module: &'a Module<'a>) -> &'a Instance<'a> {
        let instance = self.instance_arena.alloc(Instance::new(self, module));
        instance.create_ports();
        instance
    }

    /// Creates an [`Instance`] of `module` and binds ports by name with [`Instance::bind`].
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Instance::bind`].
    ///
    /// [`Instance`]: ./struct.Instance.html
    /// [`Instance::bind`]: ./struct.Instance.html#method.bind
    pub fn instance_with(
        &'a self,
        module: &'a Module<'a>,
        bindings: &[(&str, Operand<'a>)],
    ) -> Result<&'a Instance<'a>, GraphError> {
        let instance = self.instance(module);
        for &(name, signal) in bindings {
            instance.bind(name, signal)?;
        }
        Ok(instance)
    }
}

impl<'a> Default for Context<'a> {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_no_modules() {
        let c = Context::new();

        assert!(c.modules.borrow().is_empty());
    }

    #[test]
    fn duplicate_module_error() {
        let c = Context::new();

        let _ = c.module("A").unwrap();

        assert_eq!(
            c.module("A").err(),
            Some(GraphError::DuplicateModule("A".into()))
        );
    }

    #[test]
    fn specialize_builds_once() {
        let c = Context::new();

        let mut builds = 0;
        for _ in 0..3 {
            c.specialize("Leaf", |m| {
                builds += 1;
                m.output("o", 1)?.drive(0)
            })
            .unwrap();
        }

        assert_eq!(builds, 1);
        assert_eq!(c.modules.borrow().len(), 1);
    }

    #[test]
    fn constant_ranges() {
        let c = Context::new();

        assert!(c.constant(255u32, 8).is_ok());
        assert!(c.constant(256u32, 8).is_err());
        assert!(c.constant(-1, 8).is_err());
        assert!(c.signed_constant(-128, 8).is_ok());
        assert!(c.signed_constant(128, 8).is_err());
        assert!(c.constant(0u32, 0).is_err());
    }

    #[test]
    fn constants_span_the_full_128_bit_range() {
        let c = Context::new();

        let max = c.constant(u128::MAX, 128).unwrap();
        assert_eq!(max.constant_value(), Some(Value::from(u128::MAX)));

        let min = c.signed_constant(i128::MIN, 128).unwrap();
        assert_eq!(min.constant_value(), Some(Value::from(i128::MIN)));

        // 2^127 is positive, so it needs 129 signed bits
        assert_eq!(
            c.signed_constant(1u128 << 127, 128).err(),
            Some(GraphError::ConstantOverflow {
                value: Value::from(1u128 << 127),
                width: 128,
                signed: true,
            })
        );
    }
}
