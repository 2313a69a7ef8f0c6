use crate::record::Handle;
use crate::registry::Registry;

/// Handles whose observed reference count falls short of the recorded
/// one, in registry iteration order. Pure scan; the registry is not
/// touched.
pub fn leak_candidates(registry: &Registry) -> Vec<Handle> {
    registry
        .iter()
        .filter(|record| record.is_leak_candidate())
        .map(|record| record.handle)
        .collect()
}
