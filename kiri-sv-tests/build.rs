use kiri::system_verilog::*;
use kiri::*;

use std::env;
use std::path::Path;

#[derive(Debug)]
enum Error {
    Codegen(CodegenError),
    Env(env::VarError),
}

impl From<CodegenError> for Error {
    fn from(error: CodegenError) -> Error {
        Error::Codegen(error)
    }
}

impl From<GraphError> for Error {
    fn from(error: GraphError) -> Error {
        Error::Codegen(error.into())
    }
}

impl From<env::VarError> for Error {
    fn from(error: env::VarError) -> Error {
        Error::Env(error)
    }
}

fn main() -> Result<(), Error> {
    let out_dir = env::var("OUT_DIR")?;

    // Same designs from two fresh contexts; the tests check that both runs emit identical text
    for dir in ["sv", "sv_again"] {
        let c = Context::new();
        let tops = designs(&c)?;
        elaborate(&tops, &ElaborationOptions::new())?.write_to_dir(Path::new(&out_dir).join(dir))?;
    }

    Ok(())
}

fn designs<'a>(c: &'a Context<'a>) -> Result<Vec<&'a Module<'a>>, GraphError> {
    let mut tops = vec![
        adder(c)?,
        lut(c)?,
        top(c)?,
        signed_ops(c)?,
        counter(c)?,
        ram(c)?,
        rom(c)?,
        true_dual_port(c)?,
    ];
    for &flip_flop in FlipFlop::ALL.iter() {
        tops.push(register(c, flip_flop)?);
    }
    Ok(tops)
}

fn adder<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Adder")?;

    let a = m.input("a", 4)?;
    let b = m.input("b", 4)?;
    m.output("q", 4)?.drive(a.add(b)?)?;

    Ok(m)
}

fn lut<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Lut")?;

    let sel = m.input("sel", 3)?;
    let onehot = sel.case((0..8u64).map(|k| (k, 1u64 << k)), None)?;
    m.output("onehot", 8)?.drive(onehot)?;

    Ok(m)
}

fn inverter<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    c.specialize("Inverter", |m| {
        let i = m.input("i", 1)?;
        m.output("o", 1)?.drive(i.not()?)
    })
}

fn top<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Top")?;

    let x = m.input("x", 1)?;
    let first = c.instance(inverter(c)?);
    first.bind("i", x)?;
    let second = c.instance(inverter(c)?);
    second.bind("i", first.output("o")?)?;
    m.output("y", 1)?.drive(second.output("o")?)?;

    Ok(m)
}

fn signed_ops<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("SignedOps")?;

    let a = m.signed_input("a", 8)?;
    let b = m.signed_input("b", 8)?;
    m.output("lt", 1)?.drive(a.lt(b)?)?;
    m.signed_output("shifted", 8)?.drive(a.shr(2)?)?;
    m.signed_output("product", 16)?.drive(a.mul(b)?)?;
    m.signed_output("offset", 8)?.drive(a.add(-3)?)?;

    Ok(m)
}

fn counter<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Counter")?;

    let clk = m.input("clk", 1)?;
    let en = m.input("en", 1)?;
    let value = c.reg(8, clk).enable(en).named("value").build()?;
    value.drive(value.add(1)?)?;
    m.output("value_out", 8)?.drive(value)?;

    Ok(m)
}

fn ram<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Ram")?;

    let clk = m.input("clk", 1)?;
    let read_addr = m.input("read_addr", 4)?;
    let write_addr = m.input("write_addr", 4)?;
    let write_data = m.input("write_data", 16)?;
    let write_enable = m.input("write_enable", 1)?;

    let mem = c
        .memory(4, 16, clk)
        .read_ports(1)
        .write_ports(1)
        .build()?
        .named("ram");
    let read = mem.read_port(0)?;
    read.address.drive(read_addr)?;
    let write = mem.write_port(0)?;
    write.address.drive(write_addr)?;
    write.data.drive(write_data)?;
    write.enable.drive(write_enable)?;
    m.output("read_data", 16)?.drive(read.data)?;

    Ok(m)
}

fn rom<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("Rom")?;

    let clk = m.input("clk", 1)?;
    let addr = m.input("addr", 2)?;
    let en = m.input("en", 1)?;

    let mem = c.memory(2, 8, clk).read_ports(1).registered_read().build()?;
    mem.initial_contents(&[0x01u8, 0x23, 0x45, 0x67])?;
    let port = mem.read_port(0)?;
    port.address.drive(addr)?;
    if let Some(enable) = port.enable {
        enable.drive(en)?;
    }
    m.output("data", 8)?.drive(port.data)?;

    Ok(m)
}

fn true_dual_port<'a>(c: &'a Context<'a>) -> Result<&'a Module<'a>, GraphError> {
    let m = c.module("TrueDualPort")?;

    let clk = m.input("clk", 1)?;
    let mem = c
        .memory(3, 8, clk)
        .read_write_port(ReadWritePolicy::ReadFirst)
        .read_write_port(ReadWritePolicy::WriteThrough)
        .registered_read()
        .build()?
        .named("bank");
    for (index, side) in ["a", "b"].iter().enumerate() {
        let port = mem.read_write_port(index)?;
        port.address.drive(m.input(format!("{}_addr", side), 3)?)?;
        port.write_data.drive(m.input(format!("{}_wdata", side), 8)?)?;
        port.write_enable.drive(m.input(format!("{}_we", side), 1)?)?;
        port.enable.drive(m.input(format!("{}_en", side), 1)?)?;
        m.output(format!("{}_rdata", side), 8)?.drive(port.read_data)?;
    }

    Ok(m)
}

fn register<'a>(c: &'a Context<'a>, flip_flop: FlipFlop) -> Result<&'a Module<'a>, GraphError> {
    c.specialize(format!("Reg_{:?}", flip_flop), |m| {
        m.param("flip_flop", format!("{:?}", flip_flop));
        m.set_output_file("registers.sv");

        let clk = m.input("clk", 1)?;
        let mut builder = c.reg(8, clk);
        if flip_flop.has_async_reset() {
            builder = builder
                .async_reset(m.input("arst", 1)?)
                .async_reset_value(0x55u32);
        }
        if flip_flop.has_reset() {
            builder = builder.reset(m.input("rst", 1)?).reset_value(0xffu32);
        }
        if flip_flop.has_enable() {
            builder = builder.enable(m.input("en", 1)?);
        }
        let d = m.input("d", 8)?;

        let r = builder.build()?;
        r.drive(d)?;
        m.output("q", 8)?.drive(r)
    })
}
