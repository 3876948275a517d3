use super::ir::*;
use super::module_decls::*;
use super::trace::*;
use super::CodegenError;

use crate::code_writer::CodeWriter;
use crate::graph::*;

use std::fmt;

/// Emits one module's SystemVerilog text from its trace and net names.
pub struct Compiler<'a, 'b> {
    module: &'a Module<'a>,
    trace: &'b Trace<'a>,
    decls: &'b ModuleDecls<'a>,
}

impl<'a, 'b> Compiler<'a, 'b> {
    pub fn new(module: &'a Module<'a>, trace: &'b Trace<'a>, decls: &'b ModuleDecls<'a>) -> Self {
        Compiler {
            module,
            trace,
            decls,
        }
    }

    pub fn compile<W: fmt::Write>(&self, w: &mut CodeWriter<W>) -> Result<(), CodegenError> {
        self.write_header(w)?;

        w.indent();
        if self.write_decls(w)? {
            w.append_newline()?;
        }

        for &instance in &self.trace.instances {
            self.write_instance(instance, w)?;
        }
        for &signal in &self.trace.signals {
            self.write_signal(signal, w)?;
        }
        for &memory in &self.trace.memories {
            self.write_memory(memory, w)?;
        }
        self.write_outputs(w)?;
        w.unindent()?;

        w.append_line("endmodule")?;
        Ok(())
    }

    fn write_header<W: fmt::Write>(&self, w: &mut CodeWriter<W>) -> Result<(), CodegenError> {
        for (name, value) in self.module.params.borrow().iter() {
            w.append_line(&format!("// {} = {}", name, value))?;
        }
        w.append_line(&format!("module {} (", self.module.name))?;
        w.indent();
        let ports = self.module.ports();
        let num_ports = ports.len();
        for (i, (name, port)) in ports.into_iter().enumerate() {
            let direction = match port.kind() {
                SignalKind::Input => "input",
                _ => "output",
            };
            w.append_indent()?;
            w.append(&format!("{} {} {}", direction, type_decl(port.ty()), name))?;
            if i < num_ports - 1 {
                w.append(",")?;
            }
            w.append_newline()?;
        }
        w.unindent()?;
        w.append_line(");")?;
        w.append_newline()?;
        Ok(())
    }

    /// Returns whether anything was declared.
    fn write_decls<W: fmt::Write>(&self, w: &mut CodeWriter<W>) -> Result<bool, CodegenError> {
        let mut any = false;
        for &instance in &self.trace.instances {
            for &(_, proxy) in instance.outputs.borrow().iter() {
                let decl = NodeDecl {
                    name: self.decls.net(proxy)?.to_string(),
                    ty: proxy.ty(),
                };
                w.append_line(&decl.to_string())?;
                any = true;
            }
        }

        for &signal in &self.trace.signals {
            if self.decls.is_adopted(signal) {
                continue;
            }
            let name = self.decls.net(signal)?;
            any = true;
            match signal.data {
                SignalData::Constant { value } => {
                    w.append_line(&format!(
                        "localparam {} {} = {};",
                        type_decl(signal.ty()),
                        name,
                        Expr::from_value(value, signal.ty())
                    ))?;
                }
                _ => {
                    let decl = NodeDecl {
                        name: name.to_string(),
                        ty: signal.ty(),
                    };
                    w.append_line(&decl.to_string())?;
                }
            }
        }

        for &memory in &self.trace.memories {
            w.append_line(&format!(
                "logic [{}:0] {} [0:{}];",
                memory.data_width - 1,
                self.decls.memory_name(memory),
                memory.depth() - 1
            ))?;
            any = true;
        }

        Ok(any)
    }

    fn write_instance<W: fmt::Write>(
        &self,
        instance: &'a Instance<'a>,
        w: &mut CodeWriter<W>,
    ) -> Result<(), CodegenError> {
        let mut bindings = Vec::new();
        for (name, port) in instance.module.ports() {
            let net = match port.kind() {
                SignalKind::Input => self.decls.net(instance.input(&name)?)?,
                _ => self.decls.net(instance.output(&name)?)?,
            };
            bindings.push(format!(".{}({})", name, net));
        }

        w.append_line(&format!(
            "{} {} (",
            instance.module.name,
            self.decls.instance_name(instance)
        ))?;
        w.indent();
        let num_bindings = bindings.len();
        for (i, binding) in bindings.into_iter().enumerate() {
            w.append_indent()?;
            w.append(&binding)?;
            if i < num_bindings - 1 {
                w.append(",")?;
            }
            w.append_newline()?;
        }
        w.unindent()?;
        w.append_line(");")?;
        Ok(())
    }

    fn net_expr(&self, signal: &'a Signal<'a>) -> Result<Box<Expr>, CodegenError> {
        Ok(Box::new(Expr::from_ref(self.decls.net(signal)?)))
    }

    fn write_signal<W: fmt::Write>(
        &self,
        signal: &'a Signal<'a>,
        w: &mut CodeWriter<W>,
    ) -> Result<(), CodegenError> {
        let target = self.decls.net(signal)?;
        let expr = match signal.data {
            SignalData::Wire => Expr::from_ref(self.decls.driver_net(signal)?),
            SignalData::MemPort { pin, .. } if !pin.is_driven_by_memory() => {
                Expr::from_ref(self.decls.driver_net(signal)?)
            }
            SignalData::Op { kind, ref args } => match *args {
                OpArgs::Unary(source) => Expr::UnOp {
                    source: self.net_expr(source)?,
                    op: UnOp::from_kind(kind).ok_or_else(|| unexpected(kind))?,
                },
                OpArgs::Binary(lhs, rhs) => {
                    let lhs = self.net_expr(lhs)?;
                    let rhs = self.net_expr(rhs)?;
                    match kind {
                        OpKind::Concat => Expr::Concat { lhs, rhs },
                        _ => Expr::BinOp {
                            lhs,
                            rhs,
                            op: BinOp::from_kind(kind).ok_or_else(|| unexpected(kind))?,
                        },
                    }
                }
                OpArgs::Shift { source, distance } => Expr::Shift {
                    source: self.net_expr(source)?,
                    op: ShiftOp::from_kind(kind).ok_or_else(|| unexpected(kind))?,
                    distance,
                },
                OpArgs::Slice {
                    source,
                    start,
                    stop,
                } => {
                    let source = self.net_expr(source)?;
                    if start >= stop {
                        Expr::Bits {
                            source,
                            range_high: start,
                            range_low: stop,
                        }
                    } else {
                        Expr::Reverse {
                            source,
                            range_high: stop,
                            range_low: start,
                        }
                    }
                }
                OpArgs::When {
                    cond,
                    if_true,
                    if_false,
                } => Expr::Ternary {
                    cond: self.net_expr(cond)?,
                    when_true: self.net_expr(if_true)?,
                    when_false: self.net_expr(if_false)?,
                },
                OpArgs::Case(ref case) => return self.write_case(signal, case, w),
                OpArgs::Reg(ref data) => return self.write_register(signal, data, w),
            },
            // Constants are localparams, memory read data is written by the memory's blocks
            _ => return Ok(()),
        };
        w.append_line(&format!("always_comb {} = {};", target, expr))?;
        Ok(())
    }

    fn write_case<W: fmt::Write>(
        &self,
        signal: &'a Signal<'a>,
        case: &CaseData<'a>,
        w: &mut CodeWriter<W>,
    ) -> Result<(), CodegenError> {
        let target = self.decls.net(signal)?;
        let selector_ty = SignalType::unsigned(case.selector.width());

        w.append_line("always_comb begin")?;
        w.indent();
        w.append_line(&format!(
            "{}case ({})",
            if case.unique { "unique " } else { "" },
            self.decls.net(case.selector)?
        ))?;
        w.indent();
        for &(key, value) in &case.table {
            w.append_line(&format!(
                "{}: {} = {};",
                Expr::from_value(Value::from(key), selector_ty),
                target,
                self.decls.net(value)?
            ))?;
        }
        if let Some(default) = case.default {
            w.append_line(&format!("default: {} = {};", target, self.decls.net(default)?))?;
        }
        w.unindent()?;
        w.append_line("endcase")?;
        w.unindent()?;
        w.append_line("end")?;
        Ok(())
    }

    fn write_register<W: fmt::Write>(
        &self,
        signal: &'a Signal<'a>,
        data: &RegisterData<'a>,
        w: &mut CodeWriter<W>,
    ) -> Result<(), CodegenError> {
        let target = self.decls.net(signal)?;
        let next = self.decls.driver_net(signal)?;
        let clk = self.decls.net(data.clk)?;

        if signal.flip_flop() == Some(FlipFlop::Plain) {
            w.append_line(&format!(
                "always_ff @(posedge {}) {} <= {};",
                clk, target, next
            ))?;
            return Ok(());
        }

        let mut sensitivity = format!("posedge {}", clk);
        // Highest priority first
        let mut branches = Vec::new();
        if let Some(async_reset) = data.async_reset {
            let async_reset = self.decls.net(async_reset)?;
            sensitivity.push_str(&format!(" or posedge {}", async_reset));
            branches.push((
                async_reset,
                Expr::from_value(data.async_reset_value, signal.ty()).to_string(),
            ));
        }
        if let Some(reset) = data.reset {
            branches.push((
                self.decls.net(reset)?,
                Expr::from_value(data.reset_value, signal.ty()).to_string(),
            ));
        }
        if let Some(enable) = data.enable {
            branches.push((self.decls.net(enable)?, next.to_string()));
        }

        let mut lines = branches
            .into_iter()
            .enumerate()
            .map(|(i, (cond, value))| {
                format!(
                    "{}if ({}) {} <= {};",
                    if i == 0 { "" } else { "else " },
                    cond,
                    target,
                    value
                )
            })
            .collect::<Vec<_>>();
        if data.enable.is_none() {
            lines.push(format!("else {} <= {};", target, next));
        }
        w.append_block(&format!("always_ff @({})", sensitivity), lines)?;
        Ok(())
    }

    fn write_memory<W: fmt::Write>(
        &self,
        memory: &'a Memory<'a>,
        w: &mut CodeWriter<W>,
    ) -> Result<(), CodegenError> {
        let name = self.decls.memory_name(memory);
        let clocked = format!("always_ff @(posedge {})", self.decls.net(memory.clk)?);
        let element = SignalType::unsigned(memory.data_width);

        if let Some(contents) = memory.initial_contents.borrow().as_ref() {
            let lines = contents
                .iter()
                .enumerate()
                .map(|(i, &value)| format!("{}[{}] = {};", name, i, Expr::from_value(value, element)));
            w.append_block("initial", lines)?;
        }

        for port in memory.write_ports.borrow().iter() {
            w.append_block(
                &clocked,
                [format!(
                    "if ({}) {}[{}] <= {};",
                    self.decls.net(port.enable)?,
                    name,
                    self.decls.net(port.address)?,
                    self.decls.net(port.data)?
                )],
            )?;
        }

        for port in memory.read_ports.borrow().iter() {
            let read = Expr::Index {
                memory: name.to_string(),
                address: self.net_expr(port.address)?,
            };
            let data = self.decls.net(port.data)?;
            match port.enable {
                Some(enable) if memory.registered_read => {
                    w.append_block(
                        &clocked,
                        [format!("if ({}) {} <= {};", self.decls.net(enable)?, data, read)],
                    )?;
                }
                _ => {
                    w.append_line(&format!("always_comb {} = {};", data, read))?;
                }
            }
        }

        for port in memory.read_write_ports.borrow().iter() {
            let address = self.decls.net(port.address)?;
            let write_data = self.decls.net(port.write_data)?;
            let write_enable = self.decls.net(port.write_enable)?;
            let read_data = self.decls.net(port.read_data)?;
            let read = match port.policy {
                ReadWritePolicy::ReadFirst => format!("{}[{}]", name, address),
                ReadWritePolicy::WriteThrough => format!(
                    "{} ? {} : {}[{}]",
                    write_enable, write_data, name, address
                ),
            };

            w.append_line(&format!("{} begin", clocked))?;
            w.indent();
            w.append_block(
                &format!("if ({})", self.decls.net(port.enable)?),
                [
                    format!("if ({}) {}[{}] <= {};", write_enable, name, address, write_data),
                    format!("{} <= {};", read_data, read),
                ],
            )?;
            w.unindent()?;
            w.append_line("end")?;
        }

        Ok(())
    }

    fn write_outputs<W: fmt::Write>(&self, w: &mut CodeWriter<W>) -> Result<(), CodegenError> {
        for (name, output) in self.module.outputs() {
            let net = self.decls.driver_net(output)?;
            if net != name {
                w.append_line(&format!("always_comb {} = {};", name, net))?;
            }
        }
        Ok(())
    }
}

fn unexpected(kind: OpKind) -> CodegenError {
    CodegenError::Graph(GraphError::UnsupportedOperation(format!(
        "{:?} with these operands",
        kind
    )))
}
