use std::sync::Arc;

use super::Registry;
use crate::common::ByteStr;

/// Per connection codec environment.
///
/// Passed explicitly into every encode and decode call.
pub trait Context: Send + Sync {
    /// Registry used to resolve nested or parameter types.
    fn registry(&self) -> &Registry;

    fn settings(&self) -> &Settings;
}

/// Text format used when encoding `bytea` as text.
///
/// The default [`Hex`][ByteaOutput::Hex] is the format servers accept and
/// produce since 9.0. [`Escape`][ByteaOutput::Escape] is opt in, for peers
/// that still expect the legacy format. Decoding accepts both regardless
/// of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteaOutput {
    /// `\x` followed by two uppercase hex digits per byte.
    #[default]
    Hex,
    /// Legacy backslash escape format.
    Escape,
}

impl ByteaOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Escape => "escape",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<ByteaOutput> {
        match value {
            "hex" => Some(Self::Hex),
            "escape" => Some(Self::Escape),
            _ => None,
        }
    }
}

/// Connection settings visible to codecs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Maximum retained length of variable length fields, longer values are
    /// silently truncated. `None` is unlimited.
    pub field_length_max: Option<u32>,
    pub bytea_output: ByteaOutput,
    /// Capacity of the prepared statement cache, `0` disables caching.
    pub statement_cache: usize,
    pub application_name: ByteStr,
}

impl Settings {
    /// Lookup setting by its key.
    ///
    /// Known keys: `field_length_max`, `bytea_output`, `statement_cache`,
    /// `application_name`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "field_length_max" => self.field_length_max.map(|e|itoa::Buffer::new().format(e).to_owned()),
            "bytea_output" => Some(self.bytea_output.as_str().to_owned()),
            "statement_cache" => Some(itoa::Buffer::new().format(self.statement_cache).to_owned()),
            "application_name" => Some(self.application_name.to_string()),
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            field_length_max: None,
            bytea_output: ByteaOutput::Hex,
            statement_cache: 64,
            application_name: ByteStr::from_static("pgline"),
        }
    }
}

/// [`Context`] of a single session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    registry: Arc<Registry>,
    settings: Settings,
}

impl SessionContext {
    pub fn new(registry: Arc<Registry>, settings: Settings) -> Self {
        Self { registry, settings }
    }

    pub fn registry_arc(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Default for SessionContext {
    /// Standard registry with default settings.
    fn default() -> Self {
        Self::new(Arc::new(Registry::standard()), Settings::default())
    }
}

impl Context for SessionContext {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
}
