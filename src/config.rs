/// External configuration loader.
///
/// Reads `digger.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Every key has a default, so a partial file only overrides what it names.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "digger.toml";

// ── Public Config Structs ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub driver: DriverConfig,
}

/// Everything the simulation core reads.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub speed: SpeedConfig,
    pub timing: TimingConfig,
    pub lives: u32,
    /// Agents pick up pickups they walk over (and drop them when trapped or killed).
    pub agents_carry_pickups: bool,
}

/// Movement speeds, tiles per second.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedConfig {
    pub run: f32,
    pub climb: f32,
    pub hang: f32,
    pub fall: f32,
    pub chase: f32,
}

/// Timers, seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    pub hole_timeout: f32,
    /// Warning latches once a hole has lived this long.
    pub hole_warning: f32,
    pub stuck_time: f32,
    pub respawn_time: f32,
    pub dig_duration: f32,
    pub replan_interval: f32,
}

/// Settings for the frame driver, not the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverConfig {
    pub tick_rate_ms: u64,
    /// Upper bound on the dt handed to `tick`.
    pub max_frame_dt: f32,
    /// dt applied by one discrete move action.
    pub input_step: f32,
    pub start_level: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    driver: TomlDriver,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_run")]
    run: f32,
    #[serde(default = "default_climb")]
    climb: f32,
    #[serde(default = "default_hang")]
    hang: f32,
    #[serde(default = "default_fall")]
    fall: f32,
    #[serde(default = "default_chase")]
    chase: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_hole_timeout")]
    hole_timeout: f32,
    #[serde(default = "default_hole_warning")]
    hole_warning: f32,
    #[serde(default = "default_stuck_time")]
    stuck_time: f32,
    #[serde(default = "default_respawn_time")]
    respawn_time: f32,
    #[serde(default = "default_dig_duration")]
    dig_duration: f32,
    #[serde(default = "default_replan_interval")]
    replan_interval: f32,
}

#[derive(Deserialize, Debug)]
struct TomlSession {
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_agents_carry")]
    agents_carry_pickups: bool,
}

#[derive(Deserialize, Debug)]
struct TomlDriver {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_max_frame_dt")]
    max_frame_dt: f32,
    #[serde(default = "default_input_step")]
    input_step: f32,
    #[serde(default = "default_start_level")]
    start_level: u32,
}

// ── Defaults ──

fn default_run() -> f32 { 4.0 }
fn default_climb() -> f32 { 3.0 }
fn default_hang() -> f32 { 3.0 }
fn default_fall() -> f32 { 8.0 }
fn default_chase() -> f32 { 3.0 }

fn default_hole_timeout() -> f32 { 5.0 }
fn default_hole_warning() -> f32 { 4.0 }
fn default_stuck_time() -> f32 { 3.0 }
fn default_respawn_time() -> f32 { 3.0 }
fn default_dig_duration() -> f32 { 0.3 }
fn default_replan_interval() -> f32 { 0.5 }

fn default_lives() -> u32 { 3 }
fn default_agents_carry() -> bool { true }

fn default_tick_rate() -> u64 { 16 }
fn default_max_frame_dt() -> f32 { 0.05 }
fn default_input_step() -> f32 { 1.0 / 60.0 }
fn default_start_level() -> u32 { 1 }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            run: default_run(),
            climb: default_climb(),
            hang: default_hang(),
            fall: default_fall(),
            chase: default_chase(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            hole_timeout: default_hole_timeout(),
            hole_warning: default_hole_warning(),
            stuck_time: default_stuck_time(),
            respawn_time: default_respawn_time(),
            dig_duration: default_dig_duration(),
            replan_interval: default_replan_interval(),
        }
    }
}

impl Default for TomlSession {
    fn default() -> Self {
        TomlSession {
            lives: default_lives(),
            agents_carry_pickups: default_agents_carry(),
        }
    }
}

impl Default for TomlDriver {
    fn default() -> Self {
        TomlDriver {
            tick_rate_ms: default_tick_rate(),
            max_frame_dt: default_max_frame_dt(),
            input_step: default_input_step(),
            start_level: default_start_level(),
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            sim: SimConfig {
                speed: SpeedConfig {
                    run: t.speed.run,
                    climb: t.speed.climb,
                    hang: t.speed.hang,
                    fall: t.speed.fall,
                    chase: t.speed.chase,
                },
                timing: TimingConfig {
                    hole_timeout: t.timing.hole_timeout,
                    hole_warning: t.timing.hole_warning,
                    stuck_time: t.timing.stuck_time,
                    respawn_time: t.timing.respawn_time,
                    dig_duration: t.timing.dig_duration,
                    replan_interval: t.timing.replan_interval,
                },
                lives: t.session.lives,
                agents_carry_pickups: t.session.agents_carry_pickups,
            },
            driver: DriverConfig {
                tick_rate_ms: t.driver.tick_rate_ms,
                max_frame_dt: t.driver.max_frame_dt,
                input_step: t.driver.input_step,
                start_level: t.driver.start_level,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        GameConfig::default().sim
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SimConfig::default().speed
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        SimConfig::default().timing
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `digger.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file, bad syntax or out-of-range values fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join(CONFIG_FILE);
            if !path.exists() {
                continue;
            }
            match GameConfig::from_file(&path) {
                Ok(cfg) => {
                    debug!(path = %path.display(), "loaded config");
                    return cfg;
                }
                Err(e) => {
                    warn!("{e}; using default settings");
                    return GameConfig::default();
                }
            }
        }
        GameConfig::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        GameConfig::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = toml::from_str::<TomlConfig>(text)?.into();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sim.speed;
        let t = &self.sim.timing;
        let positive = [
            ("speed.run", s.run),
            ("speed.climb", s.climb),
            ("speed.hang", s.hang),
            ("speed.fall", s.fall),
            ("speed.chase", s.chase),
            ("timing.hole_timeout", t.hole_timeout),
            ("timing.hole_warning", t.hole_warning),
            ("timing.stuck_time", t.stuck_time),
            ("timing.respawn_time", t.respawn_time),
            ("timing.dig_duration", t.dig_duration),
            ("timing.replan_interval", t.replan_interval),
            ("driver.max_frame_dt", self.driver.max_frame_dt),
            ("driver.input_step", self.driver.input_step),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{key} must be positive, got {value}")));
            }
        }
        if self.sim.lives == 0 {
            return Err(ConfigError::Invalid("session.lives must be at least 1".into()));
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}
