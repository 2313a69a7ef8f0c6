use log::{debug, info};

use crate::record::Handle;
use crate::registry::{RefSlot, Registry};
use crate::snapshot::{
    ExecutionContext, HashtableEntry, RuntimeVersion, RuntimeView, VariableRecord, VariableValue,
};

/// Attribute every global variable that currently holds an audited
/// handle. Array variables contribute one attribution per index.
pub fn globals(registry: &mut Registry, globals: &[VariableRecord]) {
    for var in globals {
        add_variable(registry, RefSlot::Global, var, None);
    }
}

/// Walk every active execution context, attributing frame locals to the
/// enclosing invocation as `invocation!name`. A context's chain ends
/// when no caller frame exists or when an invocation boundary or return
/// position cannot be resolved; either way the remaining contexts still
/// get walked.
pub fn contexts<V: RuntimeView>(registry: &mut Registry, contexts: &[ExecutionContext], view: &V) {
    for ctx in contexts {
        if ctx.position == 0 {
            continue;
        }
        let mut pos = ctx.position;
        for frame in &ctx.frames {
            let Some(invocation) = view.enclosing_invocation(pos) else {
                debug!("no invocation encloses position {pos:#x}, ending chain");
                break;
            };
            for var in &frame.locals {
                add_variable(registry, RefSlot::Local, var, Some(&invocation));
            }
            let Some(code) = frame.return_code else {
                break;
            };
            match view.return_position(code) {
                Some(next) if next != 0 => pos = next,
                _ => {
                    debug!("return record {code:#x} does not resolve, ending chain");
                    break;
                }
            }
        }
    }
}

/// Attribute every hashtable entry to the handle it stores. Entries
/// whose table cannot be mapped to an owning handle are kept and marked
/// unknown. Runtimes older than [`RuntimeVersion::MIN_HASHTABLE_SCAN`]
/// do not expose their hashtable storage, so the walker leaves every
/// record untouched there.
pub fn hashtables(registry: &mut Registry, entries: &[HashtableEntry], version: RuntimeVersion) {
    if version < RuntimeVersion::MIN_HASHTABLE_SCAN {
        info!(
            "runtime {:#x} predates hashtable enumeration, skipping {} entries",
            version.0,
            entries.len()
        );
        return;
    }
    for entry in entries {
        let name = match registry.hashtable_owner(entry.table_id) {
            Some(owner) => format!("handle: {owner} [{}][{}]", entry.type_key, entry.item_key),
            None => format!("handle: unknown [{}][{}]", entry.type_key, entry.item_key),
        };
        registry.add_reference(RefSlot::Hashtable, entry.handle, name);
    }
}

fn add_variable(registry: &mut Registry, slot: RefSlot, var: &VariableRecord, scope: Option<&str>) {
    match &var.value {
        VariableValue::Handle(value) => {
            let name = match scope {
                Some(invocation) => format!("{invocation}!{}", var.name),
                None => var.name.clone(),
            };
            registry.add_reference(slot, Handle(*value), name);
        }
        VariableValue::HandleArray(values) => {
            for (i, value) in values.iter().enumerate() {
                let name = match scope {
                    Some(invocation) => format!("{invocation}!{}[{i}]", var.name),
                    None => format!("{}[{i}]", var.name),
                };
                registry.add_reference(slot, Handle(*value), name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{FrameRecord, HandleTableEntry, StaticView};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn seeded_registry(handles: &[u32]) -> Registry {
        let view = StaticView::default();
        let mut registry = Registry::new();
        for &h in handles {
            let entry = HandleTableEntry {
                handle: Handle(h),
                object: None,
                recorded: 1,
            };
            registry.add_handle(&entry, &view);
        }
        registry
    }

    #[test]
    fn test_global_array_attribution_is_exact() {
        let mut registry = seeded_registry(&[0x100000, 0x100001, 0x100002, 0x100003]);
        globals(
            &mut registry,
            &[VariableRecord::array("g", vec![0x100000, 0x100001, 0x100002])],
        );

        for (i, h) in [0x100000, 0x100001, 0x100002].into_iter().enumerate() {
            let record = registry.get(Handle(h)).unwrap();
            assert_eq!(record.global_refs, vec![format!("g[{i}]")]);
        }
        assert!(registry.get(Handle(0x100003)).unwrap().global_refs.is_empty());
    }

    #[test]
    fn test_global_scalar_outside_audited_set_ignored() {
        let mut registry = seeded_registry(&[0x100000]);
        globals(
            &mut registry,
            &[
                VariableRecord::scalar("g_live", 0x100000),
                VariableRecord::scalar("g_null", 0),
                VariableRecord::scalar("g_stale", 0x7FFFFF),
            ],
        );
        let record = registry.get(Handle(0x100000)).unwrap();
        assert_eq!(record.global_refs, vec!["g_live".to_string()]);
        assert_eq!(record.observed(), 1);
    }

    #[test]
    fn test_locals_named_after_enclosing_invocation() {
        init_logs();
        let mut registry = seeded_registry(&[0x100000, 0x100001, 0x100002]);

        let mut view = StaticView::default();
        view.invocations.insert(0x40, "Trig_Melt_Actions".to_string());
        view.invocations.insert(0x10, "main".to_string());
        view.returns.insert(3, 0x10);

        let ctx = ExecutionContext {
            position: 0x40,
            frames: vec![
                FrameRecord {
                    locals: vec![
                        VariableRecord::scalar("t", 0x100000),
                        VariableRecord::array("us", vec![0x100001, 0x100002]),
                    ],
                    return_code: Some(3),
                },
                FrameRecord {
                    locals: vec![VariableRecord::scalar("root", 0x100000)],
                    return_code: None,
                },
            ],
        };
        contexts(&mut registry, &[ctx], &view);

        let t = registry.get(Handle(0x100000)).unwrap();
        assert_eq!(
            t.local_refs,
            vec!["Trig_Melt_Actions!t".to_string(), "main!root".to_string()]
        );
        assert_eq!(
            registry.get(Handle(0x100001)).unwrap().local_refs,
            vec!["Trig_Melt_Actions!us[0]".to_string()]
        );
        assert_eq!(
            registry.get(Handle(0x100002)).unwrap().local_refs,
            vec!["Trig_Melt_Actions!us[1]".to_string()]
        );
    }

    #[test]
    fn test_unresolvable_return_terminates_chain_only() {
        init_logs();
        let mut registry = seeded_registry(&[0x100000, 0x100001]);

        let mut view = StaticView::default();
        view.invocations.insert(0x40, "inner".to_string());
        view.invocations.insert(0x80, "other".to_string());

        let broken = ExecutionContext {
            position: 0x40,
            frames: vec![
                FrameRecord {
                    locals: vec![VariableRecord::scalar("a", 0x100000)],
                    return_code: Some(99),
                },
                FrameRecord {
                    locals: vec![VariableRecord::scalar("b", 0x100000)],
                    return_code: None,
                },
            ],
        };
        let healthy = ExecutionContext {
            position: 0x80,
            frames: vec![FrameRecord {
                locals: vec![VariableRecord::scalar("c", 0x100001)],
                return_code: None,
            }],
        };
        contexts(&mut registry, &[broken, healthy], &view);

        // the caller frame of the broken chain is never reached
        assert_eq!(
            registry.get(Handle(0x100000)).unwrap().local_refs,
            vec!["inner!a".to_string()]
        );
        // the second context is unaffected
        assert_eq!(
            registry.get(Handle(0x100001)).unwrap().local_refs,
            vec!["other!c".to_string()]
        );
    }

    #[test]
    fn test_idle_context_skipped() {
        let mut registry = seeded_registry(&[0x100000]);
        let view = StaticView::default();
        let ctx = ExecutionContext {
            position: 0,
            frames: vec![FrameRecord {
                locals: vec![VariableRecord::scalar("x", 0x100000)],
                return_code: None,
            }],
        };
        contexts(&mut registry, &[ctx], &view);
        assert_eq!(registry.get(Handle(0x100000)).unwrap().observed(), 0);
    }

    #[test]
    fn test_hashtable_entry_with_unknown_table_kept() {
        let mut registry = seeded_registry(&[0x100000]);
        let entries = [HashtableEntry {
            table_id: 5,
            type_key: 1,
            item_key: 7,
            handle: Handle(0x100000),
        }];
        hashtables(&mut registry, &entries, RuntimeVersion::MIN_HASHTABLE_SCAN);

        assert_eq!(
            registry.get(Handle(0x100000)).unwrap().hashtable_refs,
            vec!["handle: unknown [1][7]".to_string()]
        );
    }

    #[test]
    fn test_hashtable_entry_with_known_table_names_owner() {
        let mut view = StaticView::default();
        view.tags.insert(0xA0, crate::record::ObjectTag(u32::from_be_bytes(*b"ghth")));
        view.hashtable_ids.insert(0xA0, 5);

        let mut registry = Registry::new();
        registry.add_handle(
            &HandleTableEntry {
                handle: Handle(0x100001),
                object: Some(0xA0),
                recorded: 1,
            },
            &view,
        );
        registry.add_handle(
            &HandleTableEntry {
                handle: Handle(0x100002),
                object: None,
                recorded: 1,
            },
            &view,
        );

        let entries = [HashtableEntry {
            table_id: 5,
            type_key: 2,
            item_key: 9,
            handle: Handle(0x100002),
        }];
        hashtables(&mut registry, &entries, RuntimeVersion::MIN_HASHTABLE_SCAN);

        assert_eq!(
            registry.get(Handle(0x100002)).unwrap().hashtable_refs,
            vec!["handle: 0x00100001 [2][9]".to_string()]
        );
    }

    #[test]
    fn test_old_runtime_skips_hashtable_walk() {
        init_logs();
        let mut registry = seeded_registry(&[0x100000]);
        let entries = [HashtableEntry {
            table_id: 5,
            type_key: 1,
            item_key: 7,
            handle: Handle(0x100000),
        }];
        hashtables(&mut registry, &entries, RuntimeVersion(0x1000));

        assert!(registry.get(Handle(0x100000)).unwrap().hashtable_refs.is_empty());
    }
}
