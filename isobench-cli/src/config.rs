//! Configuration loading from isobench.toml and the environment
//!
//! isobench configuration can be specified in an `isobench.toml` file in the
//! project root. The file is discovered by walking up from the current
//! directory. Environment overrides are read once here and folded into the
//! engine's [`MeasureConfig`]; the engine never reads the environment itself.

use anyhow::Context;
use isobench_core::{DEFAULT_SAMPLES, DEFAULT_WARMUP, MeasureConfig, isolation_supported};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up by [`IsobenchConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "isobench.toml";

/// Environment variable that disables process isolation when set to a falsy value
pub const RUN_IN_SUBPROCESS_VAR: &str = "RUN_IN_SUBPROCESS";

/// Environment variable that suspends heap trimming inside each trial's child
pub const DISABLE_GC_VAR: &str = "BENCH_DISABLE_GC";

/// isobench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IsobenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Isolation mode for trial execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Fork a fresh child process per trial
    Process,
    /// Run trials on the calling thread
    InProcess,
}

impl IsolationMode {
    /// Whether this mode provides process isolation
    pub fn is_isolated(self) -> bool {
        matches!(self, IsolationMode::Process)
    }
}

/// Runner configuration for trial execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Measured trial count
    #[serde(default = "default_samples")]
    pub samples: u64,
    /// Discarded warmup trials
    #[serde(default = "default_warmup")]
    pub warmup: u64,
    /// Isolation mode; unset means "process" where the host can fork
    #[serde(default)]
    pub isolation: Option<IsolationMode>,
    /// Suspend heap trimming inside each trial's child
    #[serde(default)]
    pub disable_gc: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            warmup: default_warmup(),
            isolation: None,
            disable_gc: false,
        }
    }
}

fn default_samples() -> u64 {
    DEFAULT_SAMPLES
}
fn default_warmup() -> u64 {
    DEFAULT_WARMUP
}

impl RunnerConfig {
    /// Translate into the engine configuration
    pub fn to_measure_config(&self) -> MeasureConfig {
        let subprocess = self
            .isolation
            .map(IsolationMode::is_isolated)
            .unwrap_or_else(isolation_supported);
        MeasureConfig {
            samples: self.samples,
            warmup: self.warmup,
            subprocess,
            disable_gc: self.disable_gc,
        }
    }
}

impl IsobenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Find `isobench.toml` by walking up from the current directory
    pub fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Discover and load configuration; `Ok(None)` when no file exists
    pub fn discover() -> anyhow::Result<Option<Self>> {
        Self::find().map(Self::load).transpose()
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# isobench configuration

[runner]
# Measured trials per run
samples = 30
# Warmup trials run first, durations discarded
warmup = 1
# Isolation mode: "process" or "in-process" (defaults to "process" where fork is available)
# isolation = "process"
# Suspend heap trimming inside each trial's child process
disable_gc = false
"#
        .to_string()
    }
}

/// Overrides read from the process environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `Some(false)` when `RUN_IN_SUBPROCESS` is falsy
    pub subprocess: Option<bool>,
    /// `Some(true)` when `BENCH_DISABLE_GC` is non-falsy, `Some(false)` when falsy
    pub disable_gc: Option<bool>,
}

impl EnvOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let subprocess = lookup(RUN_IN_SUBPROCESS_VAR)
            .filter(|value| is_falsy(value))
            .map(|_| false);
        let disable_gc = lookup(DISABLE_GC_VAR).map(|value| !is_falsy(&value));
        Self {
            subprocess,
            disable_gc,
        }
    }

    /// Fold the overrides into `config`
    pub fn apply(&self, config: &mut MeasureConfig) {
        if let Some(subprocess) = self.subprocess {
            config.subprocess = subprocess;
        }
        if let Some(disable_gc) = self.disable_gc {
            config.disable_gc = disable_gc;
        }
    }
}

fn is_falsy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = IsobenchConfig::default();
        assert_eq!(config.runner.samples, 30);
        assert_eq!(config.runner.warmup, 1);
        assert_eq!(config.runner.isolation, None);
        assert!(!config.runner.disable_gc);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            samples = 5
            isolation = "in-process"
        "#;

        let config: IsobenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.samples, 5);
        assert_eq!(config.runner.isolation, Some(IsolationMode::InProcess));
        // Defaults should still apply
        assert_eq!(config.runner.warmup, 1);

        let measure = config.runner.to_measure_config();
        assert!(!measure.subprocess);
        assert_eq!(measure.samples, 5);
    }

    #[test]
    fn test_default_toml_parses() {
        let config: IsobenchConfig = toml::from_str(&IsobenchConfig::default_toml()).unwrap();
        assert_eq!(config.runner.samples, 30);
        assert_eq!(
            config.runner.to_measure_config().subprocess,
            isolation_supported()
        );
    }

    #[test]
    fn test_env_falsy_disables_isolation() {
        for value in ["false", "FALSE", "0", "no", "off", ""] {
            let env = EnvOverrides::from_lookup(lookup(&[(RUN_IN_SUBPROCESS_VAR, value)]));
            assert_eq!(env.subprocess, Some(false), "value {value:?}");
        }
    }

    #[test]
    fn test_env_truthy_leaves_isolation_alone() {
        let env = EnvOverrides::from_lookup(lookup(&[(RUN_IN_SUBPROCESS_VAR, "true")]));
        assert_eq!(env.subprocess, None);

        let mut config = MeasureConfig::default().with_subprocess(false);
        env.apply(&mut config);
        assert!(!config.subprocess);
    }

    #[test]
    fn test_env_disable_gc() {
        let env = EnvOverrides::from_lookup(lookup(&[(DISABLE_GC_VAR, "1")]));
        let mut config = MeasureConfig::default();
        env.apply(&mut config);
        assert!(config.disable_gc);

        let off = EnvOverrides::from_lookup(lookup(&[(DISABLE_GC_VAR, "false")]));
        assert_eq!(off.disable_gc, Some(false));
        let mut config = MeasureConfig::default().with_disable_gc(true);
        off.apply(&mut config);
        assert!(!config.disable_gc);

        let unset = EnvOverrides::from_lookup(lookup(&[]));
        assert_eq!(unset, EnvOverrides::default());
    }
}
