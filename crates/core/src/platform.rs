//! Platform tag matching for `ModuleRegistry`'s `platforms` filter (spec §4.4).

/// The platform tag for the binary currently running: `"linux"`, `"macos"`,
/// or `"windows"`. Modules tag themselves with a list of platforms they
/// support; `"*"` always matches.
pub fn current_platform() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    }
}

/// True if `tags` is empty, contains `"*"`, or contains the current platform.
pub fn matches_current_platform(tags: &[String]) -> bool {
    tags.is_empty()
        || tags
            .iter()
            .any(|tag| tag == "*" || tag == current_platform())
}
