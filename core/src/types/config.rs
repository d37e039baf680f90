use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::RebalancerError;
use crate::infrastructure::CephClient;
use crate::types::topology::OsdId;

/// Tunables for the reweight loop. Every key is optional in YAML; anything
/// omitted takes the value from `Settings::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// PGs allowed in `backfilling`/`backfill_wait` while still reweighting.
    pub max_backfill_pgs: u64,
    /// PGs allowed in `recovering`/`recovery_wait` while still reweighting.
    pub max_recovery_pgs: u64,
    /// CRUSH weight added to each OSD per cycle.
    pub weight_increment: f64,
    /// Pause between cycles.
    pub sleep_interval_ms: u64,
    /// When true nothing is written to the cluster.
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_backfill_pgs: 10,
            max_recovery_pgs: 10,
            weight_increment: 0.02,
            sleep_interval_ms: 30_000,
            dry_run: true,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, filling gaps with defaults.
    pub fn load(path: &Path) -> Result<Settings, RebalancerError> {
        let text = std::fs::read_to_string(path).map_err(|source| RebalancerError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| RebalancerError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Settings, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }
}

/// Everything needed to build a `Rebalancer`.
///
/// Start from `RebalancerConfig::default()` and override with struct-update
/// syntax; validation happens once, in `Rebalancer::new`.
pub struct RebalancerConfig {
    /// Connected cluster client. The caller still owns its lifecycle and is
    /// expected to `close()` it once the loop returns.
    pub client: Option<Box<dyn CephClient + Send>>,
    /// OSD id → CRUSH weight it should reach.
    pub targets: BTreeMap<OsdId, f64>,
    pub settings: Settings,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        RebalancerConfig {
            client: None,
            targets: BTreeMap::new(),
            settings: Settings::default(),
        }
    }
}

impl RebalancerConfig {
    /// Check every invariant the controller relies on. Nothing is partially
    /// accepted: the first violation is returned.
    pub fn validate(&self) -> Result<(), RebalancerError> {
        if self.targets.is_empty() {
            return Err(RebalancerError::EmptyTargets);
        }
        if self.client.is_none() {
            return Err(RebalancerError::MissingClient);
        }
        let inc = self.settings.weight_increment;
        if !inc.is_finite() || inc < 0.0 {
            return Err(RebalancerError::InvalidIncrement(inc));
        }
        for (&osd, &weight) in &self.targets {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RebalancerError::InvalidTargetWeight { osd, weight });
            }
        }
        Ok(())
    }
}
