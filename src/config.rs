//! Kiosk configuration
//!
//! Everything has a default (see the constants in `lib.rs`), so an empty
//! file, or no file at all, yields a working kiosk.
//!
//! ```toml
//! service_url = "http://127.0.0.1:5000"
//! sample_interval_ms = 200
//!
//! [timings]
//! box_instruction_ms = 5000
//!
//! [registry]
//! capacity = 32
//! idle_ttl_secs = 600
//!
//! [[vip_rules]]
//! vip_id = 1
//! gender = "Male"
//! min_age = 20
//! max_age = 25
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::core::{FlowTimings, Kiosk, RegistryLimits, RuleTable, SessionRegistry, VipRule, default_rules};
use crate::error::ConfigError;
use crate::{
    BOX_INSTRUCTION_MS, CLASSIFIER_TIMEOUT_MS, COUNTDOWN_START, COUNTDOWN_STEP_MS,
    DEFAULT_SERVICE_URL, SAMPLE_INTERVAL_MS, SUSPENDED_CAPACITY, THANK_YOU_MS, WELCOME_BACK_MS,
};

/// Default API bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Recognition service and persistence base URL
    pub service_url: String,
    pub sample_interval_ms: u64,
    pub classifier_timeout_ms: u64,
    pub timings: TimingsConfig,
    pub registry: RegistryConfig,
    pub vip_rules: Vec<VipRule>,
    /// Still images replayed as camera frames in serve mode
    pub frame_dir: Option<PathBuf>,
    pub bind_addr: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            sample_interval_ms: SAMPLE_INTERVAL_MS,
            classifier_timeout_ms: CLASSIFIER_TIMEOUT_MS,
            timings: TimingsConfig::default(),
            registry: RegistryConfig::default(),
            vip_rules: default_rules(),
            frame_dir: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub box_instruction_ms: u64,
    pub thank_you_ms: u64,
    pub welcome_back_ms: u64,
    pub countdown_step_ms: u64,
    pub countdown_start: u8,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            box_instruction_ms: BOX_INSTRUCTION_MS,
            thank_you_ms: THANK_YOU_MS,
            welcome_back_ms: WELCOME_BACK_MS,
            countdown_step_ms: COUNTDOWN_STEP_MS,
            countdown_start: COUNTDOWN_START,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub capacity: usize,
    /// Unset keeps suspended sessions until evicted by capacity
    pub idle_ttl_secs: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: SUSPENDED_CAPACITY,
            idle_ttl_secs: None,
        }
    }
}

impl KioskConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the kiosk cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample_interval_ms must be > 0".into()));
        }
        if self.classifier_timeout_ms == 0 {
            return Err(ConfigError::Invalid("classifier_timeout_ms must be > 0".into()));
        }
        if self.timings.countdown_start == 0 {
            return Err(ConfigError::Invalid("countdown_start must be >= 1".into()));
        }
        if self.registry.capacity == 0 {
            return Err(ConfigError::Invalid("registry capacity must be >= 1".into()));
        }
        for rule in &self.vip_rules {
            if rule.max_age.is_some_and(|max| max < rule.min_age) {
                return Err(ConfigError::Invalid(format!(
                    "rule for VIP {} has max_age below min_age",
                    rule.vip_id
                )));
            }
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn flow_timings(&self) -> FlowTimings {
        FlowTimings {
            box_instruction: Duration::from_millis(self.timings.box_instruction_ms),
            thank_you: Duration::from_millis(self.timings.thank_you_ms),
            welcome_back: Duration::from_millis(self.timings.welcome_back_ms),
            countdown_step: Duration::from_millis(self.timings.countdown_step_ms),
            countdown_start: self.timings.countdown_start,
        }
    }

    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            capacity: self.registry.capacity,
            idle_ttl: self.registry.idle_ttl_secs.map(Duration::from_secs),
        }
    }

    /// Rule table; overlapping rules are logged and resolved first-match
    pub fn rule_table(&self) -> RuleTable {
        let table = RuleTable::new(self.vip_rules.clone());
        for (a, b) in table.overlaps() {
            let rules = table.rules();
            warn!(
                "VIP rules overlap: VIP {} and VIP {} (first match wins)",
                rules[a].vip_id, rules[b].vip_id
            );
        }
        table
    }

    pub fn build_kiosk(&self) -> Kiosk {
        let registry = SessionRegistry::new(self.flow_timings(), self.registry_limits());
        Kiosk::new(Box::new(self.rule_table()), registry)
    }
}
