//! The pending-component-remap table threaded through `Component.update`'s
//! cascade (spec.md §9: "implement this as an explicit parameter threaded
//! through the call chain — never as ambient mutable state").

use std::collections::{BTreeSet, HashMap};

use graphstore_proto::Locator;

/// Maps an old component locator to the new one it was superseded by,
/// during a single `Component.update` cascade. Accumulates if more than one
/// component is updated in the same operation.
#[derive(Debug, Default, Clone)]
pub struct ComponentRemap(HashMap<Locator, Locator>);

impl ComponentRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Locator, to: Locator) {
        self.0.insert(from, to);
    }

    /// Replace every locator in `components` that this table has an entry
    /// for; locators with no entry pass through unchanged.
    pub fn apply(&self, components: &BTreeSet<Locator>) -> BTreeSet<Locator> {
        components
            .iter()
            .map(|locator| self.0.get(locator).copied().unwrap_or(*locator))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_proto::new_id;

    #[test]
    fn apply_rewrites_mapped_locators_only() {
        let old = Locator::first(new_id());
        let new = old.increment();
        let untouched = Locator::first(new_id());

        let mut remap = ComponentRemap::new();
        remap.insert(old, new);

        let components = BTreeSet::from([old, untouched]);
        let remapped = remap.apply(&components);

        assert_eq!(remapped, BTreeSet::from([new, untouched]));
    }
}
