use std::path::PathBuf;

/// Everything the rest of the orchestrator needs to know about one
/// discovered module (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Directory name under the modules directory, and the module half of
    /// every instance id this module spawns.
    pub module_id: String,
    pub display_name: String,
    /// Path to the module's `main_<id>`-style entry point.
    pub entry_point: PathBuf,
    pub visible: bool,
    /// Internal modules have no hardware: `ready` takes them straight to
    /// `CONNECTED` (spec §4.1).
    pub is_internal: bool,
    pub platforms: Vec<String>,
    /// Resolved writable path for this module's config file — the in-tree
    /// template, or a user-scoped fallback if the template isn't writable
    /// (spec §4.4).
    pub config_path: PathBuf,
}
