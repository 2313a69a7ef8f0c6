use std::io::Write;

use crate::AuditResult;
use crate::record::{Handle, HandleKind, HandleRecord};
use crate::registry::Registry;
use crate::snapshot::RuntimeView;

/// Which records a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Full,
    LeaksOnly,
}

const RULE: &str = "---------------------------------------";

/// Render the audit report: a summary block followed by one block per
/// handle in registry order (leak candidates only under
/// [`ReportScope::LeaksOnly`]). Sections with nothing to show are
/// omitted from a handle's block.
pub fn write<V: RuntimeView, W: Write>(
    sink: &mut W,
    registry: &Registry,
    leaks: &[Handle],
    view: &V,
    capacity: u32,
    scope: ReportScope,
) -> AuditResult<()> {
    writeln!(sink, "{RULE}")?;
    writeln!(sink, "       handle leak audit report")?;
    writeln!(sink, "{RULE}")?;
    writeln!(sink, "handle capacity: {capacity}")?;
    writeln!(sink, "handles audited: {}", registry.len())?;
    writeln!(sink, "leak candidates: {}", leaks.len())?;
    writeln!(sink, "{RULE}")?;

    match scope {
        ReportScope::Full => {
            for record in registry.iter() {
                write_record(sink, record, view)?;
            }
        }
        ReportScope::LeaksOnly => {
            for handle in leaks {
                if let Some(record) = registry.get(*handle) {
                    write_record(sink, record, view)?;
                }
            }
        }
    }
    Ok(())
}

fn write_record<V: RuntimeView, W: Write>(
    sink: &mut W,
    record: &HandleRecord,
    view: &V,
) -> AuditResult<()> {
    writeln!(sink, "handle: {}", record.handle)?;
    writeln!(sink, "  references: {}", record.recorded)?;

    if let Some(object) = record.object {
        match view.object_tag(object) {
            Some(tag) => {
                writeln!(sink, "  object tag: {tag}")?;
                writeln!(sink, "  kind: {}", HandleKind::from_tag(tag))?;
            }
            None => writeln!(sink, "  kind: unknown")?,
        }
    }

    let sites = view.creation_sites(record.handle);
    if !sites.is_empty() {
        writeln!(sink, "  created at:")?;
        for site in &sites {
            writeln!(sink, "    | {}+{}", site.invocation, site.offset)?;
        }
    }

    if !record.global_refs.is_empty() || !record.local_refs.is_empty() {
        writeln!(sink, "  referencing variables:")?;
        for name in record.global_refs.iter().chain(&record.local_refs) {
            writeln!(sink, "    | {name}")?;
        }
    }

    if !record.hashtable_refs.is_empty() {
        writeln!(sink, "  referencing hashtables:")?;
        for name in &record.hashtable_refs {
            writeln!(sink, "    | {name}")?;
        }
    }
    Ok(())
}
