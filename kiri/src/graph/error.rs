use super::signal::OpKind;
use super::value::Value;

use thiserror::Error;

use std::fmt;

/// Why a [`connect`](./fn.connect.html) was refused.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IllegalDriveReason {
    /// Constants are never driven.
    ConstantTarget,
    /// Operations compute their own value from their operands.
    OperationTarget,
    /// An instance's outputs are driven by the instantiated module.
    InstanceOutput,
    /// A module template's input is only driven through an instance.
    FreeInput,
    /// Memory read data is driven by the memory array.
    MemoryReadData,
}

impl fmt::Display for IllegalDriveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IllegalDriveReason::ConstantTarget => "constants cannot be driven",
            IllegalDriveReason::OperationTarget => "operations cannot be driven",
            IllegalDriveReason::InstanceOutput => {
                "instance outputs are driven by the instantiated module"
            }
            IllegalDriveReason::FreeInput => {
                "module inputs can only be driven through an instance"
            }
            IllegalDriveReason::MemoryReadData => "memory read data is driven by the memory",
        })
    }
}

/// A single problem found when validating a register.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegisterProblem {
    MissingDriver,
    MissingClock,
    ClockWidth(u32),
    EnableWidth(u32),
    ResetWidth(u32),
    AsyncResetWidth(u32),
    ResetValueOverflow { value: Value, width: u32 },
}

impl fmt::Display for RegisterProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterProblem::MissingDriver => write!(f, "no next value is driven"),
            RegisterProblem::MissingClock => write!(f, "the clock has an unresolved width"),
            RegisterProblem::ClockWidth(w) => write!(f, "the clock is {} bits wide instead of 1", w),
            RegisterProblem::EnableWidth(w) => {
                write!(f, "the enable is {} bits wide instead of 1", w)
            }
            RegisterProblem::ResetWidth(w) => write!(f, "the reset is {} bits wide instead of 1", w),
            RegisterProblem::AsyncResetWidth(w) => {
                write!(f, "the async reset is {} bits wide instead of 1", w)
            }
            RegisterProblem::ResetValueOverflow { value, width } => {
                write!(f, "the reset value {} doesn't fit into {} bit(s)", value, width)
            }
        }
    }
}

/// The memory port combination rule that was violated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoryPortRule {
    NoPorts,
    TooManyReadWritePorts,
    TrueDualPortExclusive,
    ReadWriteWithWritePort,
    WriteWithoutReadPort,
    ReadWriteRequiresRegisteredRead,
}

impl fmt::Display for MemoryPortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemoryPortRule::NoPorts => "a memory needs at least one port",
            MemoryPortRule::TooManyReadWritePorts => "a memory has at most 2 read/write ports",
            MemoryPortRule::TrueDualPortExclusive => {
                "a memory with 2 read/write ports cannot have read or write ports"
            }
            MemoryPortRule::ReadWriteWithWritePort => {
                "a memory with a read/write port cannot have a write port"
            }
            MemoryPortRule::WriteWithoutReadPort => "a write port requires a read port",
            MemoryPortRule::ReadWriteRequiresRegisteredRead => {
                "read/write ports require registered reads"
            }
        })
    }
}

fn list(items: &[String]) -> String {
    items.join(", ")
}

fn signedness(signed: &bool) -> &'static str {
    if *signed {
        "signed"
    } else {
        "unsigned"
    }
}

fn join_problems(items: &[RegisterProblem]) -> String {
    items
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Represents a structural defect in a signal graph.
///
/// Errors that only depend on the entities involved are returned while the graph is built, the rest when a module is validated or elaborated.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GraphError {
    #[error("Signal {target} is already driven.")]
    MultipleDriver { target: String },

    #[error("Cannot drive {target}: {reason}.")]
    IllegalDrive {
        target: String,
        reason: IllegalDriveReason,
    },

    #[error("Cannot resolve the width of {0}.")]
    UnresolvedWidth(String),

    #[error("Bit widths don't match ({expected} and {actual}, respectively).")]
    WidthMismatch { expected: u32, actual: u32 },

    #[error("Operands of {op:?} must have the same signedness.")]
    SignMismatch { op: OpKind },

    #[error("Unsupported operation: {0}.")]
    UnsupportedOperation(String),

    #[error("Slice [{start}:{stop}] is out of range for a signal with a width of {width} bits.")]
    SliceOutOfRange { start: i64, stop: i64, width: u32 },

    #[error("Cannot fit the value '{value}' into {width} {} bit(s).", signedness(.signed))]
    ConstantOverflow {
        value: Value,
        width: u32,
        signed: bool,
    },

    #[error("Conditions must be 1 bit wide, but a {0}-bit signal was given.")]
    ConditionWidth(u32),

    #[error("Invalid case: {0}.")]
    InvalidCase(String),

    #[error("Illegal memory port combination: {0}.")]
    PortCount(MemoryPortRule),

    #[error("Register {register} is misconfigured: {}.", join_problems(.problems))]
    RegisterConfig {
        register: String,
        problems: Vec<RegisterProblem>,
    },

    #[error("{owner} has undriven ports: {}.", list(.ports))]
    UndrivenPort { owner: String, ports: Vec<String> },

    #[error("Module \"{module}\" uses undriven signals: {}.", list(.signals))]
    UndrivenSignal {
        module: String,
        signals: Vec<String>,
    },

    #[error("Module \"{module}\" uses signals with unresolved widths: {}.", list(.signals))]
    UnresolvedWidths {
        module: String,
        signals: Vec<String>,
    },

    #[error("Module \"{module}\" has conflicting names: {}.", list(.names))]
    NameConflict { module: String, names: Vec<String> },

    #[error("Module \"{module}\" already has a port called \"{port}\".")]
    DuplicatePort { module: String, port: String },

    #[error("{owner} has no port called \"{port}\".")]
    UnknownPort { owner: String, port: String },

    #[error("A module called \"{0}\" already exists in this context.")]
    DuplicateModule(String),

    #[error("Module \"{module}\" uses port \"{port}\" of another module.")]
    ForeignPort { module: String, port: String },

    #[error("Module \"{0}\" contains an instance of itself.")]
    RecursiveInstance(String),

    #[error("Memory {0} has neither a write port nor initial contents.")]
    MemoryWithoutContents(String),

    #[error("Memory {memory} has no {kind} port {index}.")]
    UnknownMemoryPort {
        memory: String,
        kind: &'static str,
        index: usize,
    },

    #[error("Memory {memory} initial contents: {reason}.")]
    InvalidInitialContents { memory: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregated_messages_list_every_item() {
        let e = GraphError::UndrivenPort {
            owner: "Module \"Top\"".into(),
            ports: vec!["a".into(), "b".into()],
        };
        assert_eq!(e.to_string(), "Module \"Top\" has undriven ports: a, b.");

        let e = GraphError::RegisterConfig {
            register: "r".into(),
            problems: vec![RegisterProblem::MissingDriver, RegisterProblem::ClockWidth(2)],
        };
        assert_eq!(
            e.to_string(),
            "Register r is misconfigured: no next value is driven; the clock is 2 bits wide instead of 1."
        );
    }

    #[test]
    fn overflow_message_names_signedness() {
        let e = GraphError::ConstantOverflow {
            value: Value::from(300),
            width: 8,
            signed: false,
        };
        assert_eq!(e.to_string(), "Cannot fit the value '300' into 8 unsigned bit(s).");
    }
}
