use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::guide::DEFAULT_GUIDE_SIZE;

/// Application configuration: built-in defaults, then the JSON config file,
/// then environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub gate: GateConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Classification and memory tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Minimum boosted similarity to extend a matching leaf.
    pub extend_threshold: f64,
    /// Minimum boosted similarity to branch under a matching root.
    pub branch_threshold: f64,
    /// Hard cap on total nodes across the forest.
    pub memory_size: usize,
    /// Exponential decay rate per hour of inactivity.
    pub decay_rate: f64,
    /// Terms kept when abstracting an internal node.
    pub bubble_up_terms: usize,
    /// Source ids retained per node.
    pub max_sources_per_node: usize,
    /// Transition boost α; 0 disables boosting.
    pub transition_boost: f64,
    /// Maximum bytes of the rendered topic block; 0 disables the cap.
    pub context_limit: usize,
    /// Response summaries retained by the guide.
    pub guide_size: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            extend_threshold: 0.55,
            branch_threshold: 0.25,
            memory_size: 100,
            decay_rate: 0.05,
            bubble_up_terms: 6,
            max_sources_per_node: 20,
            transition_boost: 0.2,
            context_limit: 600,
            guide_size: DEFAULT_GUIDE_SIZE,
        }
    }
}

/// On-disk config file. Every key is optional; a present key wins even when zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub memory_size: Option<usize>,
    pub decay_rate: Option<f64>,
    pub similarity: Option<SimilarityConfig>,
    pub context_limit: Option<usize>,
    pub bubble_up_terms: Option<usize>,
    pub max_sources_per_node: Option<usize>,
    pub guide_size: Option<usize>,
    pub transition_boost: Option<f64>,
}

/// `similarity` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilarityConfig {
    pub extend: Option<f64>,
    pub branch: Option<f64>,
}

/// Where state and config live.
#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Read `LOG_LEVEL` and `LOG_FORMAT`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::in_dir(default_base_dir())
    }
}

impl PathsConfig {
    /// `<base>/data` for state and `<base>/config.json` for tuning.
    pub fn in_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            data_dir: base.join("data"),
            config_file: base.join("config.json"),
        }
    }

    /// Keep `data_dir` and look for the config file next to it.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let config_file = data_dir
            .parent()
            .map(|p| p.join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"));
        Self {
            data_dir,
            config_file,
        }
    }

    /// Persisted forest.
    pub fn intent_file(&self) -> PathBuf {
        self.data_dir.join("intent.json")
    }

    /// Persisted TF-IDF corpus.
    pub fn engine_file(&self) -> PathBuf {
        self.data_dir.join("engine.json")
    }

    /// Persisted response guide.
    pub fn guide_file(&self) -> PathBuf {
        self.data_dir.join("guide.json")
    }

    /// Persisted transition chain.
    pub fn markov_file(&self) -> PathBuf {
        self.data_dir.join("markov.json")
    }

    /// All four state documents.
    pub fn documents(&self) -> [PathBuf; 4] {
        [
            self.intent_file(),
            self.engine_file(),
            self.guide_file(),
            self.markov_file(),
        ]
    }
}

/// Directory of the running executable, or the working directory.
fn default_base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl GateConfig {
    /// Read a config file. A missing file yields `None`.
    pub fn read_file(path: &Path) -> ConfigResult<Option<FileConfig>> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Overlay every key present in the file.
    pub fn apply_file(&mut self, file: &FileConfig) {
        let FileConfig {
            memory_size,
            decay_rate,
            similarity,
            context_limit,
            bubble_up_terms,
            max_sources_per_node,
            guide_size,
            transition_boost,
        } = file;

        if let Some(sim) = similarity {
            overlay(&mut self.extend_threshold, sim.extend);
            overlay(&mut self.branch_threshold, sim.branch);
        }
        overlay(&mut self.memory_size, *memory_size);
        overlay(&mut self.decay_rate, *decay_rate);
        overlay(&mut self.context_limit, *context_limit);
        overlay(&mut self.bubble_up_terms, *bubble_up_terms);
        overlay(&mut self.max_sources_per_node, *max_sources_per_node);
        overlay(&mut self.guide_size, *guide_size);
        overlay(&mut self.transition_boost, *transition_boost);
    }

    /// Overlay `GATE_*` variables resolved through `lookup`.
    ///
    /// A value that does not parse leaves the current setting alone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        env_overlay(&lookup, "GATE_EXTEND_THRESHOLD", &mut self.extend_threshold);
        env_overlay(&lookup, "GATE_BRANCH_THRESHOLD", &mut self.branch_threshold);
        env_overlay(&lookup, "GATE_MEMORY_SIZE", &mut self.memory_size);
        env_overlay(&lookup, "GATE_DECAY_RATE", &mut self.decay_rate);
        env_overlay(&lookup, "GATE_BUBBLE_UP_TERMS", &mut self.bubble_up_terms);
        env_overlay(&lookup, "GATE_MAX_SOURCES", &mut self.max_sources_per_node);
        env_overlay(&lookup, "GATE_TRANSITION_BOOST", &mut self.transition_boost);
        env_overlay(&lookup, "GATE_CONTEXT_LIMIT", &mut self.context_limit);
        env_overlay(&lookup, "GATE_GUIDE_SIZE", &mut self.guide_size);
    }

    /// Reset each knob the classifier cannot work with to its default.
    ///
    /// Knobs are checked independently; one bad value never discards the
    /// others. Returns one error per knob that was reset.
    pub fn sanitize(&mut self) -> Vec<ConfigError> {
        let defaults = Self::default();
        let mut errors = Vec::new();

        for (key, slot, default) in [
            ("extend", &mut self.extend_threshold, defaults.extend_threshold),
            ("branch", &mut self.branch_threshold, defaults.branch_threshold),
        ] {
            if !(0.0..=1.0).contains(&*slot) {
                errors.push(invalid_value(key, format!("{slot} is outside 0.0..=1.0")));
                *slot = default;
            }
        }
        for (key, slot, default) in [
            ("decayRate", &mut self.decay_rate, defaults.decay_rate),
            ("transitionBoost", &mut self.transition_boost, defaults.transition_boost),
        ] {
            if !slot.is_finite() || *slot < 0.0 {
                errors.push(invalid_value(key, format!("{slot} must be a non-negative number")));
                *slot = default;
            }
        }
        errors
    }
}

fn invalid_value(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

fn overlay<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn env_overlay<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!(key, value = %raw, "Ignoring unparseable override"),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    ///
    /// A missing config file means defaults; an unreadable one is logged and
    /// skipped. Out-of-range knobs fall back to their defaults one by one, so
    /// the data directory and every valid override still apply.
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut paths = match env::var("INTENT_GATE_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => PathsConfig::with_data_dir(dir),
            _ => PathsConfig::default(),
        };
        if let Ok(file) = env::var("INTENT_GATE_CONFIG") {
            if !file.is_empty() {
                paths.config_file = PathBuf::from(file);
            }
        }

        let mut gate = GateConfig::default();
        match GateConfig::read_file(&paths.config_file) {
            Ok(Some(file)) => gate.apply_file(&file),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring config file"),
        }
        gate.apply_env(|key| env::var(key).ok());
        for e in gate.sanitize() {
            warn!(error = %e, "Using default for invalid setting");
        }

        Config {
            gate,
            paths,
            logging: LoggingConfig::from_env(),
        }
    }
}
