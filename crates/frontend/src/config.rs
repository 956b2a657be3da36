//! Processor configuration loader.
//!
//! Each non-blank line is `<key> <integer>`. `Frekans` or `frequency` sets
//! the clock in MHz; `R`, `I`, `S`, `B`, `J` set class cycle costs. Keys are
//! matched case-insensitively and missing keys stay 0.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use sim_core::{InstructionClass, PerfConfig};

use crate::errors::{CliError, Diagnostic, LoadError};
use crate::program::tokens;

const FREQUENCY_KEYS: [&str; 2] = ["Frekans", "frequency"];

/// A parsed configuration plus every rejected line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    /// The resulting performance model.
    pub config: PerfConfig,
    /// Lines that were skipped.
    pub diagnostics: Vec<Diagnostic>,
}

/// A single recognised configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Clock frequency in MHz.
    Frequency(u32),
    /// Cycle cost for one instruction class.
    Cost(InstructionClass, u32),
}

impl Setting {
    fn apply(self, config: &mut PerfConfig) {
        match self {
            Self::Frequency(mhz) => config.frequency_mhz = mhz,
            Self::Cost(class, cycles) => {
                if let Some(slot) = config.costs.cost_mut(class) {
                    *slot = cycles;
                }
            }
        }
    }
}

/// Reads and parses a configuration file.
///
/// # Errors
///
/// Returns [`CliError::Read`] when the file cannot be read.
pub fn load_config(path: &Path) -> Result<LoadedConfig, CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_config(&source);
    debug!("{}: {:?}", path.display(), loaded.config);
    Ok(loaded)
}

/// Parses configuration text. A repeated key keeps its last value.
#[must_use]
pub fn parse_config(source: &str) -> LoadedConfig {
    let mut loaded = LoadedConfig::default();

    for (index, text) in source.lines().enumerate() {
        match parse_setting(text) {
            Ok(Some(setting)) => setting.apply(&mut loaded.config),
            Ok(None) => {}
            Err(error) => {
                let diagnostic = Diagnostic {
                    line: index + 1,
                    text: text.to_string(),
                    error,
                };
                warn!("config {diagnostic}");
                loaded.diagnostics.push(diagnostic);
            }
        }
    }

    loaded
}

/// Parses one configuration line, or `None` when blank.
///
/// # Errors
///
/// Rejects unknown keys, missing or non-integer values, and extra fields.
pub fn parse_setting(line: &str) -> Result<Option<Setting>, LoadError> {
    let mut fields = tokens(line);
    let Some(key) = fields.next() else {
        return Ok(None);
    };
    let value = fields.next().ok_or(LoadError::MissingField("value"))?;
    if let Some(extra) = fields.next() {
        return Err(LoadError::TrailingOperand(extra.to_string()));
    }

    if FREQUENCY_KEYS.iter().any(|name| key.eq_ignore_ascii_case(name)) {
        return Ok(Some(Setting::Frequency(parse_value(value)?)));
    }
    let class = class_for_key(key).ok_or_else(|| LoadError::UnknownConfigKey(key.to_string()))?;
    Ok(Some(Setting::Cost(class, parse_value(value)?)))
}

fn class_for_key(key: &str) -> Option<InstructionClass> {
    InstructionClass::COSTED
        .into_iter()
        .find(|class| key.eq_ignore_ascii_case(class.label()))
}

fn parse_value(token: &str) -> Result<u32, LoadError> {
    token
        .parse::<u32>()
        .ok()
        .filter(|_| !token.starts_with('+'))
        .ok_or_else(|| LoadError::BadConfigValue(token.to_string()))
}
