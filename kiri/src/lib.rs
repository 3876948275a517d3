//! An [HDL](https://en.wikipedia.org/wiki/Hardware_description_language) embedded in [Rust](https://www.rust-lang.org/) that elaborates to [SystemVerilog](system_verilog/index.html).
//!
//! kiri provides an API to describe [`Module`]s composed of [`Signal`]s, registers, memories and [`Instance`]s of other modules. Widths and signedness are inferred while the graph is built, and structural problems (multiple drivers, width mismatches, undriven ports, ...) are reported as [`GraphError`]s instead of ending up in the generated code.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! kiri = "0.1"
//! ```
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> Result<(), kiri::system_verilog::CodegenError> {
//! use kiri::*;
//!
//! // Create a context, which will contain our module(s)
//! let c = Context::new();
//!
//! // Create a module
//! let counter = c.module("Counter")?;
//! let clk = counter.input("clk", 1)?;
//! let en = counter.input("en", 1)?;
//!
//! // An 8-bit counter that counts up while `en` is high
//! let value = c.reg(8, clk).enable(en).named("value").build()?;
//! value.drive(value.add(1)?)?;
//! counter.output("value_out", 8)?.drive(value)?;
//!
//! // Generate SystemVerilog code
//! system_verilog::generate(counter, std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Module`]: ./struct.Module.html
//! [`Signal`]: ./struct.Signal.html
//! [`Instance`]: ./struct.Instance.html
//! [`GraphError`]: ./enum.GraphError.html

// Must be kept up-to-date with version in Cargo.toml
#![doc(html_root_url = "https://docs.rs/kiri/0.1.0")]

mod code_writer;
mod graph;
pub mod system_verilog;

pub use graph::*;
