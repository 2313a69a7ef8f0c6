use std::fmt::{self, Write};

/// Opaque identifier for a runtime-managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u32);

impl Handle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Opaque reference to an object in the audited runtime.
pub type ObjectRef = u32;

/// Four-character packed object type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectTag(pub u32);

impl fmt::Display for ObjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.to_be_bytes() {
            f.write_char(if b.is_ascii_graphic() { b as char } else { '?' })?;
        }
        Ok(())
    }
}

/// Handle kinds of the audited runtime. Unmapped tags fall back to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Button,
    Dialog,
    Destructable,
    Event,
    Filter,
    FogModifier,
    Force,
    Group,
    Hashtable,
    Item,
    Location,
    Multiboard,
    Player,
    Rect,
    Region,
    Sound,
    Timer,
    TimerDialog,
    Trigger,
    TriggerAction,
    TriggerCondition,
    Unit,
    Unknown,
}

impl HandleKind {
    pub fn from_tag(tag: ObjectTag) -> Self {
        match &tag.0.to_be_bytes() {
            b"+dlb" => HandleKind::Button,
            b"+dlg" => HandleKind::Dialog,
            b"+w3d" => HandleKind::Destructable,
            b"+rev" | b"alvt" | b"bevt" | b"devt" | b"gevt" | b"gfvt" | b"pcvt" | b"pevt"
            | b"psvt" | b"tmet" | b"tmvt" | b"uevt" => HandleKind::Event,
            b"+flt" => HandleKind::Filter,
            b"+fgm" => HandleKind::FogModifier,
            b"+frc" => HandleKind::Force,
            b"+grp" => HandleKind::Group,
            b"ghth" => HandleKind::Hashtable,
            b"item" => HandleKind::Item,
            b"+loc" => HandleKind::Location,
            b"+mdb" => HandleKind::Multiboard,
            b"+ply" => HandleKind::Player,
            b"+rct" => HandleKind::Rect,
            b"+agr" => HandleKind::Region,
            b"+snd" => HandleKind::Sound,
            b"+tmr" => HandleKind::Timer,
            b"+tid" => HandleKind::TimerDialog,
            b"+trg" => HandleKind::Trigger,
            b"+tac" => HandleKind::TriggerAction,
            b"tcnd" => HandleKind::TriggerCondition,
            b"+w3u" => HandleKind::Unit,
            _ => HandleKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandleKind::Button => "button",
            HandleKind::Dialog => "dialog",
            HandleKind::Destructable => "destructable",
            HandleKind::Event => "event",
            HandleKind::Filter => "filter",
            HandleKind::FogModifier => "fogmodifier",
            HandleKind::Force => "force",
            HandleKind::Group => "group",
            HandleKind::Hashtable => "hashtable",
            HandleKind::Item => "item",
            HandleKind::Location => "location",
            HandleKind::Multiboard => "multiboard",
            HandleKind::Player => "player",
            HandleKind::Rect => "rect",
            HandleKind::Region => "region",
            HandleKind::Sound => "sound",
            HandleKind::Timer => "timer",
            HandleKind::TimerDialog => "timerdialog",
            HandleKind::Trigger => "trigger",
            HandleKind::TriggerAction => "triggeraction",
            HandleKind::TriggerCondition => "triggercondition",
            HandleKind::Unit => "unit",
            HandleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record for one live handle.
///
/// The three attribution lists are append-only and populated
/// independently by the source walkers; the derived reference count is
/// computed on demand rather than stored.
#[derive(Debug, Clone)]
pub struct HandleRecord {
    pub handle: Handle,
    pub object: Option<ObjectRef>,
    /// Reference count reported by the runtime's allocator.
    pub recorded: u32,
    pub global_refs: Vec<String>,
    pub local_refs: Vec<String>,
    pub hashtable_refs: Vec<String>,
}

impl HandleRecord {
    pub fn new(handle: Handle, object: Option<ObjectRef>, recorded: u32) -> Self {
        Self {
            handle,
            object,
            recorded,
            global_refs: Vec::new(),
            local_refs: Vec::new(),
            hashtable_refs: Vec::new(),
        }
    }

    /// Reference count re-derived from every discovered referent: the
    /// owning-object backpointer plus all attributed variables and
    /// hashtable entries.
    pub fn observed(&self) -> u32 {
        u32::from(self.object.is_some())
            + self.global_refs.len() as u32
            + self.local_refs.len() as u32
            + self.hashtable_refs.len() as u32
    }

    /// A handle is leaked when fewer referents were observed than the
    /// allocator recorded.
    pub fn is_leak_candidate(&self) -> bool {
        self.observed() < self.recorded
    }
}
