use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies one `(module, device)` binding as `"MODULE:SUFFIX"`, or the bare
/// module id for a module's singleton instance.
///
/// Stable for the life of a connection; it is the key of every map owned by
/// `InstanceManager` and `ProcessSupervisor`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Builds the instance id for a module's singleton instance (no device
    /// suffix), e.g. `"GPS"`.
    pub fn singleton(module_id: impl Into<String>) -> Self {
        InstanceId(module_id.into())
    }

    /// Builds the instance id for a `(module, device)` pair, e.g.
    /// `"DRT:ACM0"`. `device_suffix` should already be the short, stable
    /// suffix derived from the device id (callers own that derivation).
    pub fn for_device(module_id: impl AsRef<str>, device_suffix: impl AsRef<str>) -> Self {
        InstanceId(format!("{}:{}", module_id.as_ref(), device_suffix.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The module id this instance belongs to: everything before the first
    /// `:`, or the whole string for a singleton instance.
    pub fn module_id(&self) -> &str {
        match self.0.split_once(':') {
            Some((module, _)) => module,
            None => &self.0,
        }
    }

    /// The device suffix, if this instance id carries one.
    pub fn device_suffix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, suffix)| suffix)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(InstanceId(s.to_string()))
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        InstanceId(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_has_no_suffix() {
        let id = InstanceId::singleton("GPS");
        assert_eq!(id.as_str(), "GPS");
        assert_eq!(id.module_id(), "GPS");
        assert_eq!(id.device_suffix(), None);
    }

    #[test]
    fn device_instance_renders_module_colon_suffix() {
        let id = InstanceId::for_device("DRT", "ACM0");
        assert_eq!(id.as_str(), "DRT:ACM0");
        assert_eq!(id.module_id(), "DRT");
        assert_eq!(id.device_suffix(), Some("ACM0"));
    }
}
