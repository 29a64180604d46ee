//! Identifiers of the built-in feature catalog.

pub const ENHANCED_NAVIGATION: &str = "enhanced_navigation";
pub const DARK_MODE: &str = "dark_mode";
pub const PERSONALIZED_DASHBOARD: &str = "personalized_dashboard";
pub const ACCESSIBILITY: &str = "accessibility";
pub const ADVANCED_SEARCH: &str = "advanced_search";
pub const SMART_NOTIFICATIONS: &str = "smart_notifications";
pub const OFFLINE_MODE: &str = "offline_mode";
pub const MOBILE_OPTIMIZATION: &str = "mobile_optimization";
pub const ADVANCED_ANALYTICS: &str = "advanced_analytics";
pub const PERFORMANCE_MODE: &str = "performance_mode";
pub const CLASSIC_LAYOUT: &str = "classic_layout";
pub const KEYBOARD_SHORTCUTS: &str = "keyboard_shortcuts";

/// Group used by beta rollouts of the built-in catalog.
pub const BETA_TESTERS: &str = "beta_testers";

/// Bucket key used when an evaluation context carries no user id.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Host component names understood by the compatibility checker.
pub mod components {
    pub const BROWSER: &str = "browser";
    pub const PLATFORM: &str = "platform";
    pub const LOCAL_STORAGE: &str = "local_storage";
    pub const SESSION_STORAGE: &str = "session_storage";
    pub const INDEXED_DB: &str = "indexed_db";
    pub const SERVICE_WORKER: &str = "service_worker";
    pub const WEBGL: &str = "webgl";
    pub const TOUCH: &str = "touch";
    pub const WEB_WORKERS: &str = "web_workers";
    pub const NOTIFICATIONS: &str = "notifications";
}
