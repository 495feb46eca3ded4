use std::fs;
use std::path::{Path, PathBuf};

use orchestrator_core::{current_platform, matches_current_platform, FlatConfig};

use crate::error::{RegistryError, Result};
use crate::module_info::ModuleInfo;

const CONFIG_FILE_NAME: &str = "config.conf";
const ENTRY_POINT_PREFIX: &str = "main_";

/// Discovers available modules by walking a directory tree (spec §4.4).
///
/// Each direct subdirectory of `modules_dir` containing a single
/// `main_<id>.*` entry point is a candidate module. Candidates are emitted
/// only when `visible = true` and the current platform matches one of the
/// module's declared `platforms` (or the module declares none / `"*"`).
/// `user_config_dir` is where a writable config fallback is created when
/// the in-tree template can't be written to.
pub struct ModuleRegistry {
    modules_dir: PathBuf,
    user_config_dir: PathBuf,
}

impl ModuleRegistry {
    pub fn new(modules_dir: impl Into<PathBuf>, user_config_dir: impl Into<PathBuf>) -> Self {
        ModuleRegistry {
            modules_dir: modules_dir.into(),
            user_config_dir: user_config_dir.into(),
        }
    }

    /// Discovers modules, sorted deterministically by directory name (spec
    /// §4.4).
    pub fn discover(&self) -> Result<Vec<ModuleInfo>> {
        let mut dir_names: Vec<PathBuf> = fs::read_dir(&self.modules_dir)
            .map_err(|source| RegistryError::ReadModulesDir {
                path: self.modules_dir.display().to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.path())
            .collect();
        dir_names.sort();

        let mut modules = Vec::new();
        for module_dir in dir_names {
            match self.load_one(&module_dir)? {
                Some(info) if info.visible && matches_current_platform(&info.platforms) => {
                    modules.push(info)
                }
                Some(info) => {
                    log::debug!(
                        "skipping module {} (visible={}, platforms={:?}, current_platform={})",
                        info.module_id,
                        info.visible,
                        info.platforms,
                        current_platform()
                    );
                }
                None => {}
            }
        }
        Ok(modules)
    }

    fn load_one(&self, module_dir: &Path) -> Result<Option<ModuleInfo>> {
        let entries: Vec<_> = fs::read_dir(module_dir)
            .map_err(|source| RegistryError::ReadModuleDir {
                path: module_dir.display().to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .collect();

        let entry_point = entries.iter().find_map(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(ENTRY_POINT_PREFIX).then(|| entry.path())
        });
        let Some(entry_point) = entry_point else {
            log::debug!(
                "module directory {} has no main_<id> entry point, skipping",
                module_dir.display()
            );
            return Ok(None);
        };

        let module_id = module_id_from_entry_point(&entry_point)
            .unwrap_or_else(|| module_dir.file_name().unwrap().to_string_lossy().into_owned());

        let template_path = module_dir.join(CONFIG_FILE_NAME);
        let config = if template_path.exists() {
            FlatConfig::load(&template_path).unwrap_or_default()
        } else {
            FlatConfig::default()
        };

        let config_path = self.resolve_writable_config_path(&module_id, &template_path);

        let display_name = config
            .get("display_name")
            .map(str::to_string)
            .unwrap_or_else(|| module_id.clone());
        let visible = config.get_bool("visible").unwrap_or(true);
        let is_internal = config.get_bool("internal").unwrap_or(false);
        let platforms = config
            .get("platforms")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ModuleInfo {
            module_id,
            display_name,
            entry_point,
            visible,
            is_internal,
            platforms,
            config_path,
        }))
    }

    /// Prefers the in-tree template; falls back to a user-scoped path when
    /// the template is read-only (spec §4.4 "resolves the *writable* path
    /// of each module's config, falling back from the in-tree template to a
    /// user-scoped location when the template is read-only").
    fn resolve_writable_config_path(&self, module_id: &str, template_path: &Path) -> PathBuf {
        if is_writable(template_path) {
            template_path.to_path_buf()
        } else {
            self.user_config_dir.join(format!("{module_id}.conf"))
        }
    }
}

fn module_id_from_entry_point(entry_point: &Path) -> Option<String> {
    let stem = entry_point.file_stem()?.to_str()?;
    stem.strip_prefix(ENTRY_POINT_PREFIX).map(str::to_string)
}

/// A path is writable if it doesn't exist yet (we'd create it) or exists
/// and isn't marked read-only.
fn is_writable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => !metadata.permissions().readonly(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_module(
        dir: &Path,
        name: &str,
        entry_file: &str,
        config: &str,
    ) -> PathBuf {
        let module_dir = dir.join(name);
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join(entry_file), "# entry point").unwrap();
        fs::write(module_dir.join(CONFIG_FILE_NAME), config).unwrap();
        module_dir
    }

    #[test]
    fn discovers_visible_modules_sorted_by_directory_name() {
        let modules_dir = tempfile::tempdir().unwrap();
        let user_dir = tempfile::tempdir().unwrap();
        write_module(
            modules_dir.path(),
            "GPS",
            "main_gps.py",
            "display_name = GPS Tracker\nvisible = true\n",
        );
        write_module(
            modules_dir.path(),
            "DRT",
            "main_drt.py",
            "display_name = Reaction Time\nvisible = true\ninternal = false\n",
        );

        let registry = ModuleRegistry::new(modules_dir.path(), user_dir.path());
        let modules = registry.discover().unwrap();
        let ids: Vec<_> = modules.iter().map(|m| m.module_id.clone()).collect();
        assert_eq!(ids, vec!["drt".to_string(), "gps".to_string()]);
    }

    #[test]
    fn hides_modules_marked_not_visible() {
        let modules_dir = tempfile::tempdir().unwrap();
        let user_dir = tempfile::tempdir().unwrap();
        write_module(
            modules_dir.path(),
            "Hidden",
            "main_hidden.py",
            "visible = false\n",
        );

        let registry = ModuleRegistry::new(modules_dir.path(), user_dir.path());
        assert!(registry.discover().unwrap().is_empty());
    }

    #[test]
    fn filters_by_platform_tag() {
        let modules_dir = tempfile::tempdir().unwrap();
        let user_dir = tempfile::tempdir().unwrap();
        write_module(
            modules_dir.path(),
            "WindowsOnly",
            "main_winonly.py",
            "visible = true\nplatforms = windows\n",
        );
        write_module(
            modules_dir.path(),
            "AnyPlatform",
            "main_any.py",
            "visible = true\nplatforms = *\n",
        );

        let registry = ModuleRegistry::new(modules_dir.path(), user_dir.path());
        let modules = registry.discover().unwrap();
        let ids: Vec<_> = modules.iter().map(|m| m.module_id.clone()).collect();
        assert!(ids.contains(&"any".to_string()));
        assert!(!ids.contains(&"winonly".to_string()));
    }

    #[test]
    fn directory_without_entry_point_is_skipped() {
        let modules_dir = tempfile::tempdir().unwrap();
        let user_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(modules_dir.path().join("NotAModule")).unwrap();

        let registry = ModuleRegistry::new(modules_dir.path(), user_dir.path());
        assert!(registry.discover().unwrap().is_empty());
    }
}
