use std::collections::HashMap;

use crate::host::ProgramHost;

/// Memoized type lookups against a host.
///
/// Keyed by the name as written, negative answers included. Unbounded: it
/// lives for one round and sees a handful of exception names, so nothing is
/// ever evicted.
#[derive(Debug, Default)]
pub struct TypeResolver {
    cache: HashMap<String, Option<String>>,
    misses: usize,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<H: ProgramHost + ?Sized>(&mut self, host: &H, name: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(name) {
            return hit.clone();
        }
        self.misses += 1;
        let resolved = host.lookup_type(name);
        tracing::trace!(name, resolved = ?resolved, "type lookup");
        self.cache.insert(name.to_string(), resolved.clone());
        resolved
    }

    /// Host lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Program;

    #[test]
    fn repeated_names_hit_the_cache() {
        let program = Program::default();
        let mut resolver = TypeResolver::new();
        for _ in 0..3 {
            assert_eq!(
                resolver.resolve(&program, "IllegalArgumentException").as_deref(),
                Some("java.lang.IllegalArgumentException")
            );
            assert_eq!(resolver.resolve(&program, "Missing"), None);
        }
        assert_eq!(resolver.lookups(), 2);
    }
}
