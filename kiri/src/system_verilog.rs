//! SystemVerilog code generation.
//!
//! [`elaborate`] traces each requested [`Module`] backwards from its outputs, names every net, and emits one `module ... endmodule` text per [`Module`] specialization, recursing into instantiated modules.
//!
//! [`elaborate`]: ./fn.elaborate.html
//! [`Module`]: ../struct.Module.html

mod compiler;
mod ir;
mod module_decls;
mod names;
mod trace;

use compiler::*;
use module_decls::*;
use trace::*;

use crate::code_writer;
use crate::graph::*;

use log::debug;
use thiserror::Error;

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Represents an error that stopped SystemVerilog generation.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] fmt::Error),

    #[error("Code writer attempted to unindent past the first column.")]
    IndentUnderflow,
}

impl From<code_writer::Error> for CodegenError {
    fn from(e: code_writer::Error) -> Self {
        match e {
            code_writer::Error::IndentUnderflow => CodegenError::IndentUnderflow,
            code_writer::Error::Format(e) => CodegenError::Format(e),
        }
    }
}

/// Controls which modules [`elaborate`] emits.
///
/// [`elaborate`]: ./fn.elaborate.html
#[derive(Clone, Debug, Default)]
pub struct ElaborationOptions {
    top_only: bool,
}

impl ElaborationOptions {
    pub fn new() -> ElaborationOptions {
        ElaborationOptions::default()
    }

    /// Only emit the requested modules, without the modules they instantiate.
    pub fn top_only(mut self, top_only: bool) -> Self {
        self.top_only = top_only;
        self
    }
}

/// The text of every module sharing one output file, in discovery order.
#[derive(Clone, Debug)]
pub struct OutputUnit {
    file_name: String,
    modules: Vec<String>,
    text: String,
}

impl OutputUnit {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Names of the modules in this unit, in the order they appear in [`text`].
    ///
    /// [`text`]: #method.text
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The result of [`elaborate`]: one [`OutputUnit`] per output file.
///
/// [`elaborate`]: ./fn.elaborate.html
/// [`OutputUnit`]: ./struct.OutputUnit.html
#[derive(Clone, Debug)]
pub struct Elaboration {
    units: Vec<OutputUnit>,
}

impl Elaboration {
    pub fn units(&self) -> &[OutputUnit] {
        &self.units
    }

    pub fn unit(&self, file_name: &str) -> Option<&OutputUnit> {
        self.units.iter().find(|unit| unit.file_name == file_name)
    }

    /// Writes each unit to its own file in `dir`, creating `dir` if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::Io`] if a directory or file can't be written.
    ///
    /// [`CodegenError::Io`]: ./enum.CodegenError.html#variant.Io
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(), CodegenError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for unit in &self.units {
            let path = dir.join(&unit.file_name);
            fs::write(&path, &unit.text)?;
            debug!("Wrote {} module(s) to {}", unit.modules.len(), path.display());
        }
        Ok(())
    }

    /// Writes every unit to `w`, one after another.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::Io`] if writing fails.
    ///
    /// [`CodegenError::Io`]: ./enum.CodegenError.html#variant.Io
    pub fn write_all<W: io::Write>(&self, mut w: W) -> Result<(), CodegenError> {
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                w.write_all(b"\n")?;
            }
            w.write_all(unit.text.as_bytes())?;
        }
        Ok(())
    }
}

/// Elaborates `tops` and, unless [`ElaborationOptions::top_only`] is set, every module they instantiate.
///
/// Each [`Module`] is elaborated once no matter how often it's instantiated. Modules are grouped into [`OutputUnit`]s by [`Module::output_file`].
///
/// # Errors
///
/// Returns [`CodegenError::Graph`] with the first structural problem found. Errors that concern a single entity list every problem of that entity.
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let sub = c.module("Sub").unwrap();
/// let i = sub.input("i", 1).unwrap();
/// sub.output("o", 1).unwrap().drive(i.not().unwrap()).unwrap();
///
/// let top = c.module("Top").unwrap();
/// let x = top.input("x", 1).unwrap();
/// let a = c.instance(sub);
/// a.bind("i", x).unwrap();
/// let b = c.instance(sub);
/// b.bind("i", a.output("o").unwrap()).unwrap();
/// top.output("y", 1).unwrap().drive(b.output("o").unwrap()).unwrap();
///
/// let e = system_verilog::elaborate(&[top], &system_verilog::ElaborationOptions::new()).unwrap();
/// assert_eq!(e.units().len(), 2);
/// assert_eq!(e.unit("Sub.sv").unwrap().modules(), ["Sub"]);
/// ```
///
/// [`ElaborationOptions::top_only`]: ./struct.ElaborationOptions.html#method.top_only
/// [`Module`]: ../struct.Module.html
/// [`Module::output_file`]: ../struct.Module.html#method.output_file
/// [`OutputUnit`]: ./struct.OutputUnit.html
/// [`CodegenError::Graph`]: ./enum.CodegenError.html#variant.Graph
pub fn elaborate<'a>(
    tops: &[&'a Module<'a>],
    options: &ElaborationOptions,
) -> Result<Elaboration, CodegenError> {
    let mut queue = tops.iter().copied().collect::<VecDeque<_>>();
    let mut elaborated = HashSet::new();
    let mut units: Vec<OutputUnit> = Vec::new();

    while let Some(module) = queue.pop_front() {
        if !elaborated.insert(module.name.clone()) {
            debug!("Module \"{}\" was already elaborated", module.name);
            continue;
        }

        let (text, instances) = elaborate_module(module)?;

        if !options.top_only {
            for instance in instances {
                if !elaborated.contains(&instance.module.name) {
                    debug!(
                        "Module \"{}\" instantiates \"{}\"",
                        module.name, instance.module.name
                    );
                    queue.push_back(instance.module);
                }
            }
        }

        let file_name = module.output_file();
        match units.iter_mut().find(|unit| unit.file_name == file_name) {
            Some(unit) => {
                debug!("Appending module \"{}\" to {}", module.name, file_name);
                unit.text.push('\n');
                unit.text.push_str(&text);
                unit.modules.push(module.name.clone());
            }
            None => units.push(OutputUnit {
                file_name,
                modules: vec![module.name.clone()],
                text,
            }),
        }
    }

    Ok(Elaboration { units })
}

fn elaborate_module<'a>(
    module: &'a Module<'a>,
) -> Result<(String, Vec<&'a Instance<'a>>), CodegenError> {
    module.validate()?;
    let trace = Trace::new(module)?;
    let decls = ModuleDecls::new(module, &trace)?;
    debug!(
        "Traced module \"{}\": {} signal(s), {} instance(s), {} memory(ies)",
        module.name,
        trace.signals.len(),
        trace.instances.len(),
        trace.memories.len()
    );

    let mut text = String::new();
    let mut w = code_writer::CodeWriter::new(&mut text);
    Compiler::new(module, &trace, &decls).compile(&mut w)?;

    Ok((text, trace.instances))
}

/// Elaborates `m` with every module it instantiates and writes the result to `w`.
///
/// # Errors
///
/// Returns any error of [`elaborate`] or [`Elaboration::write_all`].
///
/// # Examples
///
/// ```
/// use kiri::*;
///
/// let c = Context::new();
///
/// let inverter = c.module("Inverter").unwrap();
/// let i = inverter.input("i", 1).unwrap();
/// inverter.output("o", 1).unwrap().drive(i.not().unwrap()).unwrap();
///
/// let mut out = Vec::new();
/// system_verilog::generate(inverter, &mut out).unwrap();
/// assert!(String::from_utf8(out).unwrap().contains("always_comb o = ~i;"));
/// ```
///
/// [`elaborate`]: ./fn.elaborate.html
/// [`Elaboration::write_all`]: ./struct.Elaboration.html#method.write_all
pub fn generate<'a, W: io::Write>(m: &'a Module<'a>, w: W) -> Result<(), CodegenError> {
    elaborate(&[m], &ElaborationOptions::default())?.write_all(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of<'a>(m: &'a Module<'a>) -> String {
        let e = elaborate(&[m], &ElaborationOptions::new().top_only(true)).unwrap();
        e.units()[0].text().to_string()
    }

    #[test]
    fn adder_output_is_assigned_directly() {
        let c = Context::new();

        let m = c.module("Adder").unwrap();
        let a = m.input("a", 4).unwrap();
        let b = m.input("b", 4).unwrap();
        m.output("q", 4).unwrap().drive(a.add(b).unwrap()).unwrap();

        assert_eq!(
            text_of(m),
            "module Adder (\n\
             \x20   input logic [3:0] a,\n\
             \x20   input logic [3:0] b,\n\
             \x20   output logic [3:0] q\n\
             );\n\
             \n\
             \x20   always_comb q = a + b;\n\
             endmodule\n"
        );
    }

    #[test]
    fn enable_reset_register_template() {
        let c = Context::new();

        let m = c.module("Reg").unwrap();
        let clk = m.input("clk", 1).unwrap();
        let en = m.input("en", 1).unwrap();
        let rst = m.input("rst", 1).unwrap();
        let d = m.input("d", 8).unwrap();
        let r = c
            .reg(8, clk)
            .enable(en)
            .reset(rst)
            .reset_value(0xffu32)
            .build()
            .unwrap();
        r.drive(d).unwrap();
        m.output("q", 8).unwrap().drive(r).unwrap();

        assert_eq!(r.flip_flop(), Some(FlipFlop::ResetEnable));
        let text = text_of(m);
        assert!(text.contains(
            "    always_ff @(posedge clk) begin\n\
             \x20       if (rst) q <= 8'hff;\n\
             \x20       else if (en) q <= d;\n\
             \x20   end\n"
        ));
    }

    #[test]
    fn async_reset_register_template() {
        let c = Context::new();

        let m = c.module("Reg").unwrap();
        let clk = m.input("clk", 1).unwrap();
        let arst = m.input("arst", 1).unwrap();
        let d = m.signed_input("d", 4).unwrap();
        let r = c
            .reg(4, clk)
            .signed()
            .async_reset(arst)
            .async_reset_value(-2)
            .build()
            .unwrap();
        r.drive(d).unwrap();
        m.signed_output("q", 4).unwrap().drive(r).unwrap();

        let text = text_of(m);
        assert!(text.contains(
            "    always_ff @(posedge clk or posedge arst) begin\n\
             \x20       if (arst) q <= -4'sd2;\n\
             \x20       else q <= d;\n\
             \x20   end\n"
        ));
    }

    #[test]
    fn complete_case_has_no_default() {
        let c = Context::new();

        let m = c.module("Lut").unwrap();
        let sel = m.input("sel", 3).unwrap();
        let table = (0..8u64).map(|k| (k, 200 + k * 3)).collect::<Vec<_>>();
        let out = sel.case(table, None).unwrap();
        m.output("q", 8).unwrap().drive(out).unwrap();

        assert!(out.is_unique_case());
        let text = text_of(m);
        assert!(text.contains("localparam logic [7:0] const_7 = 8'hdd;"));
        assert!(text.contains("        unique case (sel)\n"));
        assert!(text.contains("3'h7: q = const_7;"));
        assert!(!text.contains("default:"));
    }

    #[test]
    fn partial_case_has_default() {
        let c = Context::new();

        let m = c.module("Lut").unwrap();
        let sel = m.input("sel", 2).unwrap();
        let out = sel.case([(0u64, 1u32), (2, 3)], None).unwrap();
        m.output("q", 2).unwrap().drive(out).unwrap();

        let text = text_of(m);
        assert!(text.contains("        case (sel)\n"));
        assert!(text.contains("default: q = const_2;"));
    }

    #[test]
    fn signed_operation_driving_unsigned_output() {
        let c = Context::new();

        let m = c.module("Mixed").unwrap();
        let a = m.signed_input("a", 4).unwrap();
        let b = m.signed_input("b", 4).unwrap();
        let sum = a.add(b).unwrap();
        m.output("q", 4).unwrap().drive(sum).unwrap();
        m.signed_output("r", 4).unwrap().drive(sum.shr(1).unwrap()).unwrap();
        m.output("lt", 1).unwrap().drive(sum.lt(b).unwrap()).unwrap();

        let text = text_of(m);
        assert!(text.contains("    logic signed [3:0] wire_0;\n"));
        assert!(text.contains("    always_comb wire_0 = a + b;\n"));
        assert!(text.contains("    always_comb r = wire_0 >>> 1;\n"));
        assert!(text.contains("    always_comb lt = wire_0 < b;\n"));
        assert!(text.contains("    always_comb q = wire_0;\n"));
    }

    #[test]
    fn hierarchy_is_memoized() {
        let c = Context::new();

        let sub = c.module("Sub").unwrap();
        let i = sub.input("i", 1).unwrap();
        sub.output("o", 1).unwrap().drive(i.not().unwrap()).unwrap();

        let top = c.module("Top").unwrap();
        let x = top.input("x", 1).unwrap();
        let first = c.instance(sub);
        first.bind("i", x).unwrap();
        let second = c.instance(sub);
        second.bind("i", first.output("o").unwrap()).unwrap();
        top.output("y", 1).unwrap().drive(second.output("o").unwrap()).unwrap();

        let e = elaborate(&[top], &ElaborationOptions::new()).unwrap();
        let files = e
            .units()
            .iter()
            .map(|unit| unit.file_name())
            .collect::<Vec<_>>();
        assert_eq!(files, vec!["Top.sv", "Sub.sv"]);

        let text = e.unit("Top.sv").unwrap().text();
        assert!(text.contains(
            "    Sub Sub_inst_0 (\n\
             \x20       .i(x),\n\
             \x20       .o(Sub_inst_0_o)\n\
             \x20   );\n"
        ));
        assert!(text.contains(".i(Sub_inst_0_o),"));
        assert!(text.contains("always_comb y = Sub_inst_1_o;"));
    }

    #[test]
    fn top_only_skips_submodules() {
        let c = Context::new();

        let sub = c.module("Sub").unwrap();
        let i = sub.input("i", 1).unwrap();
        sub.output("o", 1).unwrap().drive(i).unwrap();

        let top = c.module("Top").unwrap();
        let inst = c.instance(sub);
        inst.bind("i", top.input("x", 1).unwrap()).unwrap();
        top.output("y", 1).unwrap().drive(inst.output("o").unwrap()).unwrap();

        let e = elaborate(&[top], &ElaborationOptions::new().top_only(true)).unwrap();
        assert_eq!(e.units().len(), 1);
    }

    #[test]
    fn shared_output_file_concatenates_modules() {
        let c = Context::new();

        let sub = c.module("Sub").unwrap();
        let i = sub.input("i", 1).unwrap();
        sub.output("o", 1).unwrap().drive(i).unwrap();
        sub.set_output_file("all.sv");

        let top = c.module("Top").unwrap();
        top.set_output_file("all.sv");
        let inst = c.instance(sub);
        inst.bind("i", top.input("x", 1).unwrap()).unwrap();
        top.output("y", 1).unwrap().drive(inst.output("o").unwrap()).unwrap();

        let e = elaborate(&[top], &ElaborationOptions::new()).unwrap();
        assert_eq!(e.units().len(), 1);
        let unit = e.unit("all.sv").unwrap();
        assert_eq!(unit.modules(), ["Top", "Sub"]);
        assert!(unit.text().find("module Top").unwrap() < unit.text().find("module Sub").unwrap());
    }

    #[test]
    fn undriven_output_error_names_port() {
        let c = Context::new();

        let m = c.module("Top").unwrap();
        let i = m.input("i", 1).unwrap();
        m.output("a", 1).unwrap().drive(i).unwrap();
        let _ = m.output("b", 1).unwrap();

        match elaborate(&[m], &ElaborationOptions::new()) {
            Err(CodegenError::Graph(GraphError::UndrivenPort { ports, .. })) => {
                assert_eq!(ports, vec!["b".to_string()])
            }
            _ => panic!("expected an undriven port error"),
        }
    }

    #[test]
    fn elaboration_is_deterministic() {
        fn build<'a>(c: &'a Context<'a>) -> &'a Module<'a> {
            let m = c.module("Top").unwrap();
            let clk = m.input("clk", 1).unwrap();
            let a = m.input("a", 8).unwrap();
            let x = a.add(3).unwrap().xor(a.shl(1).unwrap()).unwrap();
            let r = x.reg(clk).unwrap();
            m.output("q", 8).unwrap().drive(r.sub(1).unwrap()).unwrap();
            m
        }

        let first = Context::new();
        let second = Context::new();
        let mut a = Vec::new();
        let mut b = Vec::new();
        generate(build(&first), &mut a).unwrap();
        generate(build(&second), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn params_are_commented_above_header() {
        let c = Context::new();

        let m = c.module("Delay_4").unwrap();
        m.param("width", 4);
        let clk = m.input("clk", 1).unwrap();
        let d = m.input("d", 4).unwrap();
        m.output("q", 4).unwrap().drive(d.reg(clk).unwrap()).unwrap();

        let text = text_of(m);
        assert!(text.starts_with("// width = 4\nmodule Delay_4 (\n"));
        assert!(text.contains("always_ff @(posedge clk) q <= d;"));
    }

    #[test]
    fn memory_blocks() {
        let c = Context::new();

        let m = c.module("Ram").unwrap();
        let clk = m.input("clk", 1).unwrap();
        let addr = m.input("addr", 2).unwrap();
        let we = m.input("we", 1).unwrap();
        let wdata = m.input("wdata", 8).unwrap();
        let mem = c
            .memory(2, 8, clk)
            .read_ports(1)
            .write_ports(1)
            .build()
            .unwrap()
            .named("ram");
        let r = mem.read_port(0).unwrap();
        r.address.drive(addr).unwrap();
        let wp = mem.write_port(0).unwrap();
        wp.address.drive(addr).unwrap();
        wp.data.drive(wdata).unwrap();
        wp.enable.drive(we).unwrap();
        m.output("rdata", 8).unwrap().drive(r.data).unwrap();

        let text = text_of(m);
        assert!(text.contains("    logic [7:0] ram [0:3];\n"));
        assert!(text.contains("always_comb ram_w0_addr = addr;"));
        assert!(text.contains("if (ram_w0_en) ram[ram_w0_addr] <= ram_w0_data;"));
        assert!(text.contains("always_comb ram_r0_data = ram[ram_r0_addr];"));
        assert!(text.contains("always_comb rdata = ram_r0_data;"));
    }

    #[test]
    fn read_write_port_policies() {
        let c = Context::new();

        let m = c.module("Tdp").unwrap();
        let clk = m.input("clk", 1).unwrap();
        let ins = (0..2)
            .map(|i| {
                (
                    m.input(format!("addr{}", i), 1).unwrap(),
                    m.input(format!("wdata{}", i), 4).unwrap(),
                    m.input(format!("we{}", i), 1).unwrap(),
                    m.input(format!("en{}", i), 1).unwrap(),
                )
            })
            .collect::<Vec<_>>();
        let mem = c
            .memory(1, 4, clk)
            .read_write_port(ReadWritePolicy::ReadFirst)
            .read_write_port(ReadWritePolicy::WriteThrough)
            .registered_read()
            .build()
            .unwrap()
            .named("m");
        for (i, &(addr, wdata, we, en)) in ins.iter().enumerate() {
            let port = mem.read_write_port(i).unwrap();
            port.address.drive(addr).unwrap();
            port.write_data.drive(wdata).unwrap();
            port.write_enable.drive(we).unwrap();
            port.enable.drive(en).unwrap();
            m.output(format!("rdata{}", i), 4)
                .unwrap()
                .drive(port.read_data)
                .unwrap();
        }

        let text = text_of(m);
        assert!(text.contains("m_rw0_rdata <= m[m_rw0_addr];"));
        assert!(text.contains("m_rw1_rdata <= m_rw1_we ? m_rw1_wdata : m[m_rw1_addr];"));
    }

    #[test]
    fn rom_contents_are_initialized() {
        let c = Context::new();

        let m = c.module("Rom").unwrap();
        let clk = m.input("clk", 1).unwrap();
        let addr = m.input("addr", 1).unwrap();
        let en = m.input("en", 1).unwrap();
        let rom = c
            .memory(1, 8, clk)
            .read_ports(1)
            .registered_read()
            .build()
            .unwrap()
            .named("rom");
        rom.initial_contents(&[0x12u8, 0x34]).unwrap();
        let port = rom.read_port(0).unwrap();
        port.address.drive(addr).unwrap();
        port.enable.unwrap().drive(en).unwrap();
        m.output("q", 8).unwrap().drive(port.data).unwrap();

        let text = text_of(m);
        assert!(text.contains(
            "    initial begin\n\
             \x20       rom[0] = 8'h12;\n\
             \x20       rom[1] = 8'h34;\n\
             \x20   end\n"
        ));
        assert!(text.contains("if (rom_r0_en) rom_r0_data <= rom[rom_r0_addr];"));
    }

    #[test]
    fn slices_and_reversal() {
        let c = Context::new();

        let m = c.module("Bits").unwrap();
        let a = m.input("a", 8).unwrap();
        m.output("hi", 4).unwrap().drive(a.bits(7, 4).unwrap()).unwrap();
        m.output("rev", 8).unwrap().drive(a.slice((0, 7)).unwrap()).unwrap();
        m.output("b", 1).unwrap().drive(a.bit(2).unwrap()).unwrap();

        let text = text_of(m);
        assert!(text.contains("always_comb hi = a[7:4];"));
        assert!(text.contains("always_comb rev = {<<{a[7:0]}};"));
        assert!(text.contains("always_comb b = a[2];"));
    }
}
