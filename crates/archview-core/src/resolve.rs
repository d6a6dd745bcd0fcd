use std::collections::HashSet;

use crate::ArchitectureBody;

/// Map a possibly-unqualified relation endpoint onto a qualified node id.
///
/// Precedence: an exact id wins, then `System.reference` for each system,
/// then a container or component found by local id inside a system. Short
/// names shared by several systems resolve to the first system in declaration
/// order. `None` means the edge should be dropped.
pub fn resolve(reference: &str, body: &ArchitectureBody, known_ids: &HashSet<String>) -> Option<String> {
    if known_ids.contains(reference) {
        return Some(reference.to_string());
    }

    for system in &body.systems {
        let candidate = format!("{}.{}", system.id, reference);
        if known_ids.contains(&candidate) {
            return Some(candidate);
        }
    }

    for system in &body.systems {
        for container in &system.containers {
            if container.id == reference {
                return Some(format!("{}.{}", system.id, reference));
            }
            if container.components.iter().any(|c| c.id == reference) {
                return Some(format!("{}.{}.{}", system.id, container.id, reference));
            }
        }
    }

    None
}
