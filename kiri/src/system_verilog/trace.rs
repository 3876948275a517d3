use crate::graph::*;

use log::trace;

use std::collections::HashSet;
use std::ptr;

/// The part of a module's graph reachable from its outputs, in emission order.
///
/// Emission order is the reverse of the order in which the walk discovers signals. A chain is emitted drivers first, but a signal shared by several consumers may be emitted after one of them; `always_comb` blocks don't depend on their textual order.
pub struct Trace<'a> {
    pub signals: Vec<&'a Signal<'a>>,
    pub instances: Vec<&'a Instance<'a>>,
    pub memories: Vec<&'a Memory<'a>>,
}

impl<'a> Trace<'a> {
    /// Walks backwards from `module`'s outputs and collects everything that has to be emitted.
    ///
    /// Instance outputs jump straight to the instance's input drivers, since instance inputs aren't emitted as nets of their own.
    pub fn new(module: &'a Module<'a>) -> Result<Trace<'a>, GraphError> {
        let mut frontier = module
            .outputs()
            .into_iter()
            .filter_map(|(_, output)| output.driver())
            .collect::<Vec<_>>();

        let mut visited_signals = HashSet::new();
        let mut visited_instances = HashSet::new();
        let mut visited_memories = HashSet::new();
        let mut signals = Vec::new();
        let mut instances = Vec::new();
        let mut memories = Vec::new();
        let mut undriven = Vec::new();

        while let Some(signal) = frontier.pop() {
            match signal.data {
                SignalData::Output {
                    owner: Some(instance),
                } => {
                    if !visited_instances.insert(instance) {
                        continue;
                    }
                    if ptr::eq(instance.module, module) {
                        return Err(GraphError::RecursiveInstance(module.name.clone()));
                    }
                    instance.validate()?;
                    trace!("Found {}", instance.describe());
                    instances.push(instance);
                    for (_, input) in instance.inputs.borrow().iter() {
                        frontier.extend(input.driver());
                    }
                }
                SignalData::Input { owner: Some(_) } => match signal.driver() {
                    Some(driver) => frontier.push(driver),
                    None => undriven.push(signal.describe()),
                },
                SignalData::Input { owner: None } | SignalData::Output { owner: None } => {
                    if !module.is_port(signal) {
                        return Err(GraphError::ForeignPort {
                            module: module.name.clone(),
                            port: signal.name().unwrap_or_else(|| signal.describe()),
                        });
                    }
                }
                _ => {
                    if !visited_signals.insert(signal) {
                        continue;
                    }
                    signals.push(signal);
                    if let SignalData::MemPort { memory, .. } = signal.data {
                        if visited_memories.insert(memory) {
                            memories.push(memory);
                            frontier.push(memory.clk);
                            frontier.extend(memory.pins());
                        }
                    }
                    frontier.extend(signal.upstream());
                }
            }
        }

        signals.reverse();
        instances.reverse();
        memories.reverse();

        let ret = Trace {
            signals,
            instances,
            memories,
        };
        ret.validate(module, undriven)?;
        Ok(ret)
    }

    fn validate(&self, module: &'a Module<'a>, mut undriven: Vec<String>) -> Result<(), GraphError> {
        let unresolved = module
            .ports()
            .into_iter()
            .filter(|(_, port)| port.width() == 0)
            .map(|(name, _)| name)
            .chain(
                self.signals
                    .iter()
                    .filter(|signal| signal.width() == 0)
                    .map(|signal| signal.describe()),
            )
            .chain(self.instances.iter().flat_map(|instance| {
                instance
                    .outputs
                    .borrow()
                    .iter()
                    .filter(|(_, proxy)| proxy.width() == 0)
                    .map(|(port, _)| format!("{} output \"{}\"", instance.describe(), port))
                    .collect::<Vec<_>>()
            }))
            .collect::<Vec<_>>();
        if !unresolved.is_empty() {
            return Err(GraphError::UnresolvedWidths {
                module: module.name.clone(),
                signals: unresolved,
            });
        }

        undriven.extend(
            self.signals
                .iter()
                .filter(|signal| signal.kind() == SignalKind::Wire && signal.driver().is_none())
                .map(|signal| signal.describe()),
        );
        if !undriven.is_empty() {
            return Err(GraphError::UndrivenSignal {
                module: module.name.clone(),
                signals: undriven,
            });
        }

        for signal in &self.signals {
            signal.validate_register()?;
        }
        for memory in &self.memories {
            memory.validate()?;
        }
        Ok(())
    }
}
