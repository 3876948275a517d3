use std::collections::{HashMap, HashSet};

/// Hands out unique net names within one module.
///
/// Explicit names are reserved up front; generated names are `<prefix>_<N>` with one counter per prefix, skipping anything already taken.
pub struct NameAllocator {
    taken: HashSet<String>,
    counters: HashMap<String, u32>,
}

impl NameAllocator {
    pub fn new() -> NameAllocator {
        NameAllocator {
            taken: HashSet::new(),
            counters: HashMap::new(),
        }
    }

    /// Reserves `name`, returning `false` if it was already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let name = format!("{}_{}", prefix, counter);
            *counter += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Claims `name` if it's free, and falls back to a fresh name with `name` as prefix otherwise.
    pub fn derive(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            name
        } else {
            self.fresh(&name)
        }
    }
}
