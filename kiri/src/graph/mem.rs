use super::context::*;
use super::error::*;
use super::signal::*;
use super::value::*;

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::ptr;

/// What a read/write port returns when it's read and written in the same cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadWritePolicy {
    /// The read returns the value being written.
    WriteThrough,
    /// The read returns the value stored before the write.
    ReadFirst,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MemPortKind {
    Read,
    Write,
    ReadWrite,
}

impl MemPortKind {
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            MemPortKind::Read => "r",
            MemPortKind::Write => "w",
            MemPortKind::ReadWrite => "rw",
        }
    }

    fn description(self) -> &'static str {
        match self {
            MemPortKind::Read => "read",
            MemPortKind::Write => "write",
            MemPortKind::ReadWrite => "read/write",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PinRole {
    Address,
    Data,
    Enable,
    WriteData,
    ReadData,
    WriteEnable,
}

impl PinRole {
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            PinRole::Address => "addr",
            PinRole::Data => "data",
            PinRole::Enable => "en",
            PinRole::WriteData => "wdata",
            PinRole::ReadData => "rdata",
            PinRole::WriteEnable => "we",
        }
    }
}

/// Identifies one signal of one memory port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct MemPin {
    pub kind: MemPortKind,
    pub index: usize,
    pub role: PinRole,
}

impl MemPin {
    /// Read data is driven by the memory array; every other pin is driven by the user.
    pub(crate) fn is_driven_by_memory(&self) -> bool {
        matches!(
            (self.kind, self.role),
            (MemPortKind::Read, PinRole::Data) | (_, PinRole::ReadData)
        )
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "{} port {} {}",
            self.kind.description(),
            self.index,
            self.role.suffix()
        )
    }
}

/// A read port. `data` is driven by the memory.
#[derive(Clone, Copy)]
pub struct ReadPort<'a> {
    pub address: &'a Signal<'a>,
    pub data: &'a Signal<'a>,
    /// Only present for memories with registered reads.
    pub enable: Option<&'a Signal<'a>>,
}

#[derive(Clone, Copy)]
pub struct WritePort<'a> {
    pub address: &'a Signal<'a>,
    pub data: &'a Signal<'a>,
    pub enable: &'a Signal<'a>,
}

/// A combined read/write port. `read_data` is driven by the memory.
#[derive(Clone, Copy)]
pub struct ReadWritePort<'a> {
    pub address: &'a Signal<'a>,
    pub write_data: &'a Signal<'a>,
    pub read_data: &'a Signal<'a>,
    pub write_enable: &'a Signal<'a>,
    pub enable: &'a Signal<'a>,
    pub policy: ReadWritePolicy,
}

/// Configures a memory before it's created, returned by [`Context::memory`].
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let clk = c.wire(1);
/// let ram = c
///     .memory(4, 8, clk)
///     .read_ports(1)
///     .write_ports(1)
///     .registered_read()
///     .build()
///     .unwrap();
/// assert_eq!(ram.depth(), 16);
/// ```
///
/// [`Context::memory`]: ./struct.Context.html#method.memory
#[must_use]
pub struct MemoryBuilder<'a> {
    context: &'a Context<'a>,
    address_width: u32,
    data_width: u32,
    clk: &'a Signal<'a>,
    read_ports: usize,
    write_ports: usize,
    read_write_ports: Vec<ReadWritePolicy>,
    registered_read: bool,
    name: Option<String>,
}

impl<'a> MemoryBuilder<'a> {
    pub(super) fn new(
        context: &'a Context<'a>,
        address_width: u32,
        data_width: u32,
        clk: &'a Signal<'a>,
    ) -> Self {
        MemoryBuilder {
            context,
            address_width,
            data_width,
            clk,
            read_ports: 0,
            write_ports: 0,
            read_write_ports: Vec::new(),
            registered_read: false,
            name: None,
        }
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn read_ports(mut self, count: usize) -> Self {
        self.read_ports = count;
        self
    }

    pub fn write_ports(mut self, count: usize) -> Self {
        self.write_ports = count;
        self
    }

    /// Adds a read/write port with the given same-cycle policy.
    pub fn read_write_port(mut self, policy: ReadWritePolicy) -> Self {
        self.read_write_ports.push(policy);
        self
    }

    /// Makes read ports clocked and enable-qualified instead of combinational.
    pub fn registered_read(mut self) -> Self {
        self.registered_read = true;
        self
    }

    fn check_ports(&self) -> Result<(), MemoryPortRule> {
        let rw = self.read_write_ports.len();
        if self.read_ports + self.write_ports + rw == 0 {
            return Err(MemoryPortRule::NoPorts);
        }
        if rw > 2 {
            return Err(MemoryPortRule::TooManyReadWritePorts);
        }
        if rw == 2 && self.read_ports + self.write_ports != 0 {
            return Err(MemoryPortRule::TrueDualPortExclusive);
        }
        if rw > 0 && self.write_ports > 0 {
            return Err(MemoryPortRule::ReadWriteWithWritePort);
        }
        if self.write_ports > 0 && self.read_ports == 0 {
            return Err(MemoryPortRule::WriteWithoutReadPort);
        }
        if rw > 0 && !self.registered_read {
            return Err(MemoryPortRule::ReadWriteRequiresRegisteredRead);
        }
        Ok(())
    }

    /// Creates the memory and all of its port signals.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PortCount`] if the port combination isn't supported, [`GraphError::UnsupportedOperation`] for a zero data width or an address width outside of `1..=32`, and [`GraphError::WidthMismatch`] if the clock has a resolved width other than 1.
    ///
    /// [`GraphError::PortCount`]: ./enum.GraphError.html#variant.PortCount
    /// [`GraphError::UnsupportedOperation`]: ./enum.GraphError.html#variant.UnsupportedOperation
    /// [`GraphError::WidthMismatch`]: ./enum.GraphError.html#variant.WidthMismatch
    pub fn build(self) -> Result<&'a Memory<'a>, GraphError> {
        self.check_ports().map_err(GraphError::PortCount)?;
        if self.data_width == 0 {
            return Err(GraphError::UnsupportedOperation(
                "memories need a nonzero data width".into(),
            ));
        }
        if !(1..=32).contains(&self.address_width) {
            return Err(GraphError::UnsupportedOperation(format!(
                "memory address width {}",
                self.address_width
            )));
        }
        match self.clk.width() {
            0 | 1 => (),
            actual => return Err(GraphError::WidthMismatch { expected: 1, actual }),
        }

        let memory = self.context.alloc_memory(Memory {
            context: self.context,
            name: RefCell::new(self.name),
            address_width: self.address_width,
            data_width: self.data_width,
            clk: self.clk,
            registered_read: self.registered_read,
            read_ports: RefCell::new(Vec::new()),
            write_ports: RefCell::new(Vec::new()),
            read_write_ports: RefCell::new(Vec::new()),
            initial_contents: RefCell::new(None),
        });

        for index in 0..self.read_ports {
            let port = ReadPort {
                address: memory.pin(MemPortKind::Read, index, PinRole::Address),
                data: memory.pin(MemPortKind::Read, index, PinRole::Data),
                enable: if self.registered_read {
                    Some(memory.pin(MemPortKind::Read, index, PinRole::Enable))
                } else {
                    None
                },
            };
            memory.read_ports.borrow_mut().push(port);
        }
        for index in 0..self.write_ports {
            let port = WritePort {
                address: memory.pin(MemPortKind::Write, index, PinRole::Address),
                data: memory.pin(MemPortKind::Write, index, PinRole::Data),
                enable: memory.pin(MemPortKind::Write, index, PinRole::Enable),
            };
            memory.write_ports.borrow_mut().push(port);
        }
        for (index, policy) in self.read_write_ports.into_iter().enumerate() {
            let port = ReadWritePort {
                address: memory.pin(MemPortKind::ReadWrite, index, PinRole::Address),
                write_data: memory.pin(MemPortKind::ReadWrite, index, PinRole::WriteData),
                read_data: memory.pin(MemPortKind::ReadWrite, index, PinRole::ReadData),
                write_enable: memory.pin(MemPortKind::ReadWrite, index, PinRole::WriteEnable),
                enable: memory.pin(MemPortKind::ReadWrite, index, PinRole::Enable),
                policy,
            };
            memory.read_write_ports.borrow_mut().push(port);
        }
        Ok(memory)
    }
}

/// A memory array with independently configured read, write and read/write ports, created by [`Context::memory`].
///
/// Each port exposes its pins as signals: drive the address, data and enable pins, and read the data pins that are driven by the memory.
///
/// Memories without a write-capable port are ROMs and need initial contents.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let m = c.module("lut").unwrap();
/// let clk = m.input("clk", 1).unwrap();
/// let index = m.input("index", 2).unwrap();
///
/// let rom = c.memory(2, 8, clk).read_ports(1).build().unwrap().named("rom");
/// rom.initial_contents(&[1u8, 2, 4, 8]).unwrap();
/// let port = rom.read_port(0).unwrap();
/// port.address.drive(index).unwrap();
///
/// m.output("value", 8).unwrap().drive(port.data).unwrap();
/// ```
///
/// [`Context::memory`]: ./struct.Context.html#method.memory
#[must_use]
pub struct Memory<'a> {
    pub(super) context: &'a Context<'a>,

    pub(crate) name: RefCell<Option<String>>,
    pub(crate) address_width: u32,
    pub(crate) data_width: u32,
    pub(crate) clk: &'a Signal<'a>,
    pub(crate) registered_read: bool,

    pub(crate) read_ports: RefCell<Vec<ReadPort<'a>>>,
    pub(crate) write_ports: RefCell<Vec<WritePort<'a>>>,
    pub(crate) read_write_ports: RefCell<Vec<ReadWritePort<'a>>>,

    pub(crate) initial_contents: RefCell<Option<Vec<Value>>>,
}

impl<'a> Memory<'a> {
    fn pin(&'a self, kind: MemPortKind, index: usize, role: PinRole) -> &'a Signal<'a> {
        let width = match role {
            PinRole::Address => self.address_width,
            PinRole::Data | PinRole::WriteData | PinRole::ReadData => self.data_width,
            PinRole::Enable | PinRole::WriteEnable => 1,
        };
        self.context.alloc_signal(
            SignalType::unsigned(width),
            SignalData::MemPort {
                memory: self,
                pin: MemPin { kind, index, role },
            },
        )
    }

    pub fn named<S: Into<String>>(&'a self, name: S) -> &'a Memory<'a> {
        *self.name.borrow_mut() = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    #[must_use]
    pub fn address_width(&self) -> u32 {
        self.address_width
    }

    #[must_use]
    pub fn data_width(&self) -> u32 {
        self.data_width
    }

    /// Number of elements in this memory.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 << self.address_width
    }

    pub fn read_port(&self, index: usize) -> Result<ReadPort<'a>, GraphError> {
        self.read_ports
            .borrow()
            .get(index)
            .copied()
            .ok_or_else(|| self.unknown_port("read", index))
    }

    pub fn write_port(&self, index: usize) -> Result<WritePort<'a>, GraphError> {
        self.write_ports
            .borrow()
            .get(index)
            .copied()
            .ok_or_else(|| self.unknown_port("write", index))
    }

    pub fn read_write_port(&self, index: usize) -> Result<ReadWritePort<'a>, GraphError> {
        self.read_write_ports
            .borrow()
            .get(index)
            .copied()
            .ok_or_else(|| self.unknown_port("read/write", index))
    }

    fn unknown_port(&self, kind: &'static str, index: usize) -> GraphError {
        GraphError::UnknownMemoryPort {
            memory: self.describe(),
            kind,
            index,
        }
    }

    /// Specifies the power-up contents of this memory, one value per element.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidInitialContents`] if contents were already given, if `contents.len()` isn't [`depth`], or if a value doesn't fit into [`data_width`] bits.
    ///
    /// [`GraphError::InvalidInitialContents`]: ./enum.GraphError.html#variant.InvalidInitialContents
    /// [`depth`]: #method.depth
    /// [`data_width`]: #method.data_width
    pub fn initial_contents<V: Clone + Into<Value>>(&self, contents: &[V]) -> Result<(), GraphError> {
        let invalid = |reason: String| GraphError::InvalidInitialContents {
            memory: self.describe(),
            reason,
        };
        if self.initial_contents.borrow().is_some() {
            return Err(invalid("contents were already specified".into()));
        }
        if contents.len() != self.depth() {
            return Err(invalid(format!(
                "{} element(s) were given, but the memory has {}",
                contents.len(),
                self.depth()
            )));
        }
        let contents = contents
            .iter()
            .cloned()
            .map(Into::into)
            .collect::<Vec<Value>>();
        if let Some((index, value)) = contents
            .iter()
            .enumerate()
            .find(|(_, value)| !value.fits(self.data_width, false))
        {
            return Err(invalid(format!(
                "element {} ({}) doesn't fit into {} bit(s)",
                index,
                value,
                self.data_width
            )));
        }
        *self.initial_contents.borrow_mut() = Some(contents);
        Ok(())
    }

    pub(crate) fn has_write_capable_port(&self) -> bool {
        !self.write_ports.borrow().is_empty() || !self.read_write_ports.borrow().is_empty()
    }

    /// Every pin signal of every port, in port order.
    pub(crate) fn pins(&self) -> Vec<&'a Signal<'a>> {
        let mut ret = Vec::new();
        for port in self.read_ports.borrow().iter() {
            ret.push(port.address);
            ret.extend(port.enable);
            ret.push(port.data);
        }
        for port in self.write_ports.borrow().iter() {
            ret.push(port.address);
            ret.push(port.data);
            ret.push(port.enable);
        }
        for port in self.read_write_ports.borrow().iter() {
            ret.push(port.address);
            ret.push(port.write_data);
            ret.push(port.write_enable);
            ret.push(port.enable);
            ret.push(port.read_data);
        }
        ret
    }

    /// Checks that every user-driven pin is driven and that the contents are determined.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UndrivenPort`] listing every undriven pin, or [`GraphError::MemoryWithoutContents`] for a ROM without initial contents.
    ///
    /// [`GraphError::UndrivenPort`]: ./enum.GraphError.html#variant.UndrivenPort
    /// [`GraphError::MemoryWithoutContents`]: ./enum.GraphError.html#variant.MemoryWithoutContents
    pub fn validate(&self) -> Result<(), GraphError> {
        let undriven = self
            .pins()
            .into_iter()
            .filter(|pin| pin.driver().is_none())
            .filter_map(|pin| match pin.data {
                SignalData::MemPort { pin, .. } if !pin.is_driven_by_memory() => {
                    Some(pin.describe())
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        if !undriven.is_empty() {
            return Err(GraphError::UndrivenPort {
                owner: format!("Memory {}", self.describe()),
                ports: undriven,
            });
        }
        if !self.has_write_capable_port() && self.initial_contents.borrow().is_none() {
            return Err(GraphError::MemoryWithoutContents(self.describe()));
        }
        Ok(())
    }

    pub(crate) fn describe(&self) -> String {
        match self.name.borrow().as_ref() {
            Some(name) => format!("\"{}\"", name),
            None => format!(
                "<unnamed {}x{}-bit memory>",
                self.depth(),
                self.data_width
            ),
        }
    }
}

impl<'a> Eq for &'a Memory<'a> {}

impl<'a> Hash for &'a Memory<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(*self as *const _ as usize)
    }
}

impl<'a> PartialEq for &'a Memory<'a> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(*self, *other)
    }
}
