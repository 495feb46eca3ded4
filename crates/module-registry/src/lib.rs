//! Module discovery (spec §4.4, component C3).

mod error;
mod module_info;
mod registry;

pub use error::{RegistryError, Result};
pub use module_info::ModuleInfo;
pub use registry::ModuleRegistry;
