//! List reconciliation
//!
//! The pure diff engine: given the old and new decoded resource lists,
//! produce the discrete modifications that lead from one to the other.

use std::collections::HashMap;

use super::codec::ResourceEntry;

/// Kind of a single list modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationKind {
    Added,
    Enabled,
    Disabled,
    Removed,
}

/// One modification of a resource list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub kind: ModificationKind,
    pub id: String,
}

impl Modification {
    fn new(kind: ModificationKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Diffs two resource lists.
///
/// Additions and flag flips are emitted in the order their ids appear in
/// `new`; removals follow afterwards in unspecified order. Pure: identical
/// inputs always produce identical output.
pub fn reconcile(old: &[ResourceEntry], new: &[ResourceEntry]) -> Vec<Modification> {
    let mut unseen: HashMap<&str, bool> = old
        .iter()
        .map(|entry| (entry.id.as_str(), entry.enabled))
        .collect();

    let mut modifications = Vec::new();

    for entry in new {
        match unseen.remove(entry.id.as_str()) {
            None => modifications.push(Modification::new(ModificationKind::Added, &entry.id)),
            Some(was_enabled) if was_enabled != entry.enabled => {
                let kind = if entry.enabled {
                    ModificationKind::Enabled
                } else {
                    ModificationKind::Disabled
                };
                modifications.push(Modification::new(kind, &entry.id));
            }
            Some(_) => {}
        }
    }

    for (id, _) in unseen {
        modifications.push(Modification::new(ModificationKind::Removed, id));
    }

    modifications
}
