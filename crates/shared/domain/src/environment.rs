use crate::constants::components;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Host capabilities reported by the environment provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        const LOCAL_STORAGE = 1 << 0;
        const SESSION_STORAGE = 1 << 1;
        const INDEXED_DB = 1 << 2;
        const SERVICE_WORKER = 1 << 3;
        const WEBGL = 1 << 4;
        const TOUCH = 1 << 5;
        const WEB_WORKERS = 1 << 6;
        const NOTIFICATIONS = 1 << 7;

        const STORAGE = Self::LOCAL_STORAGE.bits() | Self::SESSION_STORAGE.bits() | Self::INDEXED_DB.bits();
    }
}

impl Capabilities {
    /// Maps a capability component name (`"local_storage"`, `"webgl"`, …) to its flag.
    #[must_use]
    pub fn from_component(name: &str) -> Option<Self> {
        Some(match name {
            components::LOCAL_STORAGE => Self::LOCAL_STORAGE,
            components::SESSION_STORAGE => Self::SESSION_STORAGE,
            components::INDEXED_DB => Self::INDEXED_DB,
            components::SERVICE_WORKER => Self::SERVICE_WORKER,
            components::WEBGL => Self::WEBGL,
            components::TOUCH => Self::TOUCH,
            components::WEB_WORKERS => Self::WEB_WORKERS,
            components::NOTIFICATIONS => Self::NOTIFICATIONS,
            _ => return None,
        })
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

/// What the host looks like, as supplied by an environment provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub browser: BrowserInfo,
    pub platform: String,
    pub device_type: String,
    pub supported_features: Capabilities,
}

impl Environment {
    #[must_use]
    pub fn supports(&self, capability: Capabilities) -> bool {
        self.supported_features.contains(capability)
    }

    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.device_type.eq_ignore_ascii_case("mobile")
    }
}
