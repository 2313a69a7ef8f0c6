use std::collections::HashMap;

use crate::record::{Handle, ObjectRef, ObjectTag};

/// Position in the runtime's flat instruction stream. Zero is invalid.
pub type InstrPos = u32;

/// Runtime build number, as captured by the introspection layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuntimeVersion(pub u32);

impl RuntimeVersion {
    /// Oldest runtime whose hashtable storage can be enumerated.
    pub const MIN_HASHTABLE_SCAN: RuntimeVersion = RuntimeVersion(0x124B);
}

/// One live row of the runtime's handle table.
#[derive(Debug, Clone)]
pub struct HandleTableEntry {
    pub handle: Handle,
    pub object: Option<ObjectRef>,
    /// Reference count the allocator holds for this row.
    pub recorded: u32,
}

/// Current value of a handle-typed variable.
#[derive(Debug, Clone)]
pub enum VariableValue {
    Handle(u32),
    HandleArray(Vec<u32>),
}

/// A handle-typed variable binding, global or frame-local. The
/// introspection layer only emits records for handle-typed variables;
/// other variable types never reach the audit.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub name: String,
    pub value: VariableValue,
}

impl VariableRecord {
    pub fn scalar(name: &str, value: u32) -> Self {
        Self {
            name: name.to_string(),
            value: VariableValue::Handle(value),
        }
    }

    pub fn array(name: &str, values: Vec<u32>) -> Self {
        Self {
            name: name.to_string(),
            value: VariableValue::HandleArray(values),
        }
    }
}

/// One call frame. `return_code` indexes the caller's active call record
/// and is absent on the outermost frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub locals: Vec<VariableRecord>,
    pub return_code: Option<u32>,
}

/// One active execution context: the current instruction position plus
/// the frame chain from innermost to outermost.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub position: InstrPos,
    pub frames: Vec<FrameRecord>,
}

/// One entry of a runtime hashtable: the owning table's internal id, the
/// (type, item) key pair, and the referenced handle.
#[derive(Debug, Clone)]
pub struct HashtableEntry {
    pub table_id: u32,
    pub type_key: u32,
    pub item_key: u32,
    pub handle: Handle,
}

/// A call site on a handle's creation chain.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub invocation: String,
    pub offset: u32,
}

/// Everything the introspection layer captured at one instant.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Slot capacity of the underlying handle table.
    pub capacity: u32,
    pub handle_table: Vec<HandleTableEntry>,
    pub globals: Vec<VariableRecord>,
    pub contexts: Vec<ExecutionContext>,
    pub hashtable_entries: Vec<HashtableEntry>,
    pub version: RuntimeVersion,
}

/// Demand-driven queries against the audited runtime.
///
/// This is the only boundary through which the engine learns anything
/// not already in the [`Snapshot`]; implementations own every
/// foreign-memory concern (object headers, the instruction stream, the
/// creation history). Each query may fail, and every failure is
/// non-fatal to the audit.
pub trait RuntimeView {
    /// Type tag of an object.
    fn object_tag(&self, object: ObjectRef) -> Option<ObjectTag>;

    /// Internal id of a hashtable object.
    fn hashtable_id(&self, object: ObjectRef) -> Option<u32>;

    /// Display name of the invocation enclosing `pos`.
    fn enclosing_invocation(&self, pos: InstrPos) -> Option<String>;

    /// Instruction position a frame's active call record returns to.
    fn return_position(&self, code: u32) -> Option<InstrPos>;

    /// Creation call chain of `handle`, creation site first, then the
    /// enclosing calls. Empty when the creation was not recorded.
    fn creation_sites(&self, handle: Handle) -> Vec<CallSite>;
}

/// [`RuntimeView`] over fully captured data, for introspection layers
/// that snapshot everything eagerly instead of keeping the target
/// process attached.
#[derive(Debug, Clone, Default)]
pub struct StaticView {
    pub tags: HashMap<ObjectRef, ObjectTag>,
    pub hashtable_ids: HashMap<ObjectRef, u32>,
    pub invocations: HashMap<InstrPos, String>,
    pub returns: HashMap<u32, InstrPos>,
    pub creations: HashMap<Handle, Vec<CallSite>>,
}

impl RuntimeView for StaticView {
    fn object_tag(&self, object: ObjectRef) -> Option<ObjectTag> {
        self.tags.get(&object).copied()
    }

    fn hashtable_id(&self, object: ObjectRef) -> Option<u32> {
        self.hashtable_ids.get(&object).copied()
    }

    fn enclosing_invocation(&self, pos: InstrPos) -> Option<String> {
        self.invocations.get(&pos).cloned()
    }

    fn return_position(&self, code: u32) -> Option<InstrPos> {
        self.returns.get(&code).copied()
    }

    fn creation_sites(&self, handle: Handle) -> Vec<CallSite> {
        self.creations.get(&handle).cloned().unwrap_or_default()
    }
}
