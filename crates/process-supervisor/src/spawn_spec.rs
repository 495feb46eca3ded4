use std::path::PathBuf;

/// The module CLI contract (spec §6): what the supervisor passes when it
/// spawns a module's entry point.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub entry_point: PathBuf,
    pub mode: String,
    pub output_dir: PathBuf,
    pub session_prefix: String,
    pub log_level: String,
    pub no_console: bool,
    pub window_geometry: Option<String>,
    /// Module-specific extras, e.g. `--camera-index 0`.
    pub extra_args: Vec<String>,
}

impl SpawnSpec {
    /// Renders the argument vector the way `sup/src/main.rs`'s CLI
    /// construction does: one flag per field, optional ones only present
    /// when set (spec §6).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--mode".to_string(),
            self.mode.clone(),
            "--output-dir".to_string(),
            self.output_dir.display().to_string(),
            "--session-prefix".to_string(),
            self.session_prefix.clone(),
            "--log-level".to_string(),
            self.log_level.clone(),
            "--enable-commands".to_string(),
        ];
        if self.no_console {
            args.push("--no-console".to_string());
        }
        if let Some(geometry) = &self.window_geometry {
            args.push("--window-geometry".to_string());
            args.push(geometry.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_optional_flags_when_unset() {
        let spec = SpawnSpec {
            entry_point: PathBuf::from("/modules/gps/main_gps.py"),
            mode: "headless".to_string(),
            output_dir: PathBuf::from("/data/session"),
            session_prefix: "trial".to_string(),
            log_level: "info".to_string(),
            no_console: false,
            window_geometry: None,
            extra_args: vec![],
        };
        let args = spec.to_args();
        assert!(!args.contains(&"--window-geometry".to_string()));
        assert!(!args.contains(&"--no-console".to_string()));
    }

    #[test]
    fn includes_window_geometry_and_extras_when_set() {
        let spec = SpawnSpec {
            entry_point: PathBuf::from("/modules/drt/main_drt.py"),
            mode: "slave".to_string(),
            output_dir: PathBuf::from("/data/session"),
            session_prefix: "trial".to_string(),
            log_level: "debug".to_string(),
            no_console: true,
            window_geometry: Some("640x480+0+0".to_string()),
            extra_args: vec!["--camera-index".to_string(), "0".to_string()],
        };
        let args = spec.to_args();
        assert!(args.windows(2).any(|w| w == ["--window-geometry", "640x480+0+0"]));
        assert!(args.contains(&"--no-console".to_string()));
        assert!(args.windows(2).any(|w| w == ["--camera-index", "0"]));
    }
}
