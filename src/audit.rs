use std::io::Write;

use log::debug;

use crate::classify;
use crate::registry::Registry;
use crate::report::{self, ReportScope};
use crate::snapshot::{RuntimeView, Snapshot};
use crate::walk;
use crate::{AuditResult, AuditSummary};

/// Build the fully attributed registry for `snapshot`: seed it from the
/// handle table, then run the three source walkers. The walkers fill
/// disjoint lists on each record, so their order never changes the
/// outcome.
pub fn build_registry<V: RuntimeView>(snapshot: &Snapshot, view: &V) -> Registry {
    let mut registry = Registry::new();
    for entry in &snapshot.handle_table {
        registry.add_handle(entry, view);
    }
    walk::contexts(&mut registry, &snapshot.contexts, view);
    walk::globals(&mut registry, &snapshot.globals);
    walk::hashtables(&mut registry, &snapshot.hashtable_entries, snapshot.version);
    registry
}

/// Run one audit pass over `snapshot` and write the report to `sink`.
pub fn run<V: RuntimeView, W: Write>(
    snapshot: &Snapshot,
    view: &V,
    sink: &mut W,
    scope: ReportScope,
) -> AuditResult<AuditSummary> {
    let registry = build_registry(snapshot, view);
    let leaks = classify::leak_candidates(&registry);
    debug!(
        "audited {} handles, {} leak candidates",
        registry.len(),
        leaks.len()
    );
    report::write(sink, &registry, &leaks, view, snapshot.capacity, scope)?;
    Ok(AuditSummary {
        capacity: snapshot.capacity,
        audited: registry.len(),
        leaked: leaks.len(),
    })
}
