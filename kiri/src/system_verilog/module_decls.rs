use super::names::*;
use super::trace::*;

use crate::graph::*;

use std::collections::{HashMap, HashSet};

/// Net, instance and memory names for one elaborated module.
pub struct ModuleDecls<'a> {
    module_name: String,

    names: HashMap<&'a Signal<'a>, String>,
    adopted: HashSet<&'a Signal<'a>>,
    instance_names: HashMap<&'a Instance<'a>, String>,
    memory_names: HashMap<&'a Memory<'a>, String>,
}

impl<'a> ModuleDecls<'a> {
    pub fn new(module: &'a Module<'a>, trace: &Trace<'a>) -> Result<ModuleDecls<'a>, GraphError> {
        let mut ret = ModuleDecls {
            module_name: module.name.clone(),

            names: HashMap::new(),
            adopted: HashSet::new(),
            instance_names: HashMap::new(),
            memory_names: HashMap::new(),
        };

        let proxies = trace
            .instances
            .iter()
            .flat_map(|instance| {
                instance
                    .outputs
                    .borrow()
                    .iter()
                    .map(|(port, proxy)| (*instance, port.clone(), *proxy))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let explicit = module
            .ports()
            .into_iter()
            .map(|(name, _)| name)
            .chain(trace.signals.iter().filter_map(|signal| signal.name()))
            .chain(proxies.iter().filter_map(|(_, _, proxy)| proxy.name()))
            .chain(trace.instances.iter().filter_map(|instance| instance.name()))
            .chain(trace.memories.iter().filter_map(|memory| memory.name()))
            .collect::<Vec<_>>();
        let mut counts = HashMap::new();
        for name in &explicit {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        let mut conflicts = counts
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>();
        if !conflicts.is_empty() {
            conflicts.sort();
            return Err(GraphError::NameConflict {
                module: module.name.clone(),
                names: conflicts,
            });
        }

        let mut allocator = NameAllocator::new();
        for name in &explicit {
            allocator.reserve(name);
        }

        for (name, port) in module.ports() {
            ret.names.insert(port, name);
        }
        for &memory in &trace.memories {
            let name = memory.name().unwrap_or_else(|| allocator.fresh("mem"));
            ret.memory_names.insert(memory, name);
        }
        for &instance in &trace.instances {
            let name = instance
                .name()
                .unwrap_or_else(|| allocator.fresh(&format!("{}_inst", instance.module.name)));
            ret.instance_names.insert(instance, name);
        }
        for (instance, port, proxy) in proxies {
            let name = match proxy.name() {
                Some(name) => name,
                None => allocator.derive(format!("{}_{}", ret.instance_names[&instance], port)),
            };
            ret.names.insert(proxy, name);
        }

        let traced = trace.signals.iter().copied().collect::<HashSet<_>>();
        for (name, output) in module.outputs() {
            if let Some(driver) = output.driver() {
                let adoptable = traced.contains(&driver)
                    && driver.name().is_none()
                    && matches!(driver.kind(), SignalKind::Operation(_))
                    && driver.ty() == output.ty()
                    && !ret.adopted.contains(&driver);
                if adoptable {
                    ret.adopted.insert(driver);
                    ret.names.insert(driver, name);
                }
            }
        }

        for &signal in &trace.signals {
            if ret.adopted.contains(&signal) {
                continue;
            }
            let name = match signal.name() {
                Some(name) => name,
                None => match signal.data {
                    SignalData::MemPort { memory, pin } => allocator.derive(format!(
                        "{}_{}{}_{}",
                        ret.memory_names[&memory],
                        pin.kind.prefix(),
                        pin.index,
                        pin.role.suffix()
                    )),
                    SignalData::Constant { .. } => allocator.fresh("const"),
                    SignalData::Op {
                        kind: OpKind::Reg, ..
                    } => allocator.fresh("reg"),
                    _ => allocator.fresh("wire"),
                },
            };
            ret.names.insert(signal, name);
        }

        Ok(ret)
    }

    /// The net a consumer refers to when reading `signal`.
    ///
    /// Instance inputs aren't nets of their own, so they resolve to whatever drives them.
    pub fn net(&self, signal: &'a Signal<'a>) -> Result<&str, GraphError> {
        if let SignalData::Input { owner: Some(_) } = signal.data {
            return match signal.driver() {
                Some(driver) => self.net(driver),
                None => Err(self.undriven(signal)),
            };
        }
        self.names
            .get(&signal)
            .map(String::as_str)
            .ok_or_else(|| self.undriven(signal))
    }

    /// The net driving `signal`.
    pub fn driver_net(&self, signal: &'a Signal<'a>) -> Result<&str, GraphError> {
        match signal.driver() {
            Some(driver) => self.net(driver),
            None => Err(self.undriven(signal)),
        }
    }

    /// Whether `signal` is emitted straight into an output port instead of a net of its own.
    pub fn is_adopted(&self, signal: &'a Signal<'a>) -> bool {
        self.adopted.contains(&signal)
    }

    pub fn instance_name(&self, instance: &'a Instance<'a>) -> &str {
        &self.instance_names[&instance]
    }

    pub fn memory_name(&self, memory: &'a Memory<'a>) -> &str {
        &self.memory_names[&memory]
    }

    fn undriven(&self, signal: &'a Signal<'a>) -> GraphError {
        GraphError::UndrivenSignal {
            module: self.module_name.clone(),
            signals: vec![signal.describe()],
        }
    }
}
