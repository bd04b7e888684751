//! Configuration file support for reanchor.
//!
//! Loads settings from ~/.config/reanchor/config.toml if it exists,
//! otherwise uses sensible defaults. Command-line flags are layered on
//! top with [`Config::apply_overrides`].

use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub control: ControlConfig,
    pub dependencies: DependencyConfig,
    pub reflow: ReflowConfig,
}

/// Window manager control program
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlConfig {
    /// Program used for queries and mutations
    pub program: String,
}

/// Programs that must be on the search path before anything runs
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DependencyConfig {
    pub required: Vec<String>,
}

/// Reflow behaviour
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReflowConfig {
    /// Name of the throwaway desktop leaves are parked on
    pub scratch_desktop: String,
    /// Re-apply the desktop root's preselection before re-inserting leaves
    pub restore_preselection: bool,
    /// Resize the new anchor to the old anchor's dimensions
    pub restore_size: bool,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub program: Option<String>,
    pub scratch_desktop: Option<String>,
    pub no_preselection: bool,
    pub no_resize: bool,
}

impl Config {
    /// Load config from default path (~/.config/reanchor/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reanchor")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    pub fn apply_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(program) = &overrides.program {
            // Keep the dependency check pointed at the program actually used
            let old = std::mem::replace(&mut self.control.program, program.clone());
            for required in &mut self.dependencies.required {
                if *required == old {
                    *required = program.clone();
                }
            }
        }
        if let Some(name) = &overrides.scratch_desktop {
            self.reflow.scratch_desktop = name.clone();
        }
        if overrides.no_preselection {
            self.reflow.restore_preselection = false;
        }
        if overrides.no_resize {
            self.reflow.restore_size = false;
        }
        self
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            program: "bspc".to_string(),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            required: vec!["bspc".to_string(), "jq".to_string()],
        }
    }
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            scratch_desktop: "reanchor-scratch".to_string(),
            restore_preselection: true,
            restore_size: true,
        }
    }
}
