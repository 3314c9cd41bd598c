//! Error types.

/// An error in the process-wide configuration. Always fatal: the
/// compilation must not proceed with a configuration it cannot honor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The instrumentation ratio was not a decimal integer in 1..=100.
    BadRatio(String),
    /// The coverage map would have no slots to draw location ids from.
    EmptyMap,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConfigError::BadRatio(value) => write!(
                f,
                "Bad value of AFL_INST_RATIO {:?} (must be between 1 and 100)",
                value
            ),
            ConfigError::EmptyMap => write!(f, "Coverage map size must be nonzero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// An error raised while initializing the plugin against a host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginError {
    /// The host IR version is not the one this plugin was built for.
    IncompatibleVersion { host: u32, plugin: u32 },
    /// The configuration could not be read.
    Config(ConfigError),
    /// The pass could not be placed in the host pipeline.
    Registration(String),
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PluginError::IncompatibleVersion { host, plugin } => write!(
                f,
                "Incompatible host/plugin versions! (host IR version {}, plugin built for {})",
                host, plugin
            ),
            PluginError::Config(err) => write!(f, "{}", err),
            PluginError::Registration(msg) => write!(f, "Cannot register pass: {}", msg),
        }
    }
}

impl std::error::Error for PluginError {}

impl From<ConfigError> for PluginError {
    fn from(err: ConfigError) -> Self {
        PluginError::Config(err)
    }
}

/// An error when declaring an external symbol in a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclError {
    /// A symbol with this name already exists with another signature.
    Conflict { name: String },
}

impl std::fmt::Display for DeclError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DeclError::Conflict { name } => write!(
                f,
                "symbol `{}` is already declared with a different signature",
                name
            ),
        }
    }
}

impl std::error::Error for DeclError {}
