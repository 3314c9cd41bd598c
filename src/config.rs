//! Process-wide instrumentation settings, read once from the
//! environment before any function is processed.

use crate::errors::ConfigError;

/// log2 of the coverage map size.
pub const MAP_SIZE_POW2: u32 = 16;
/// Number of slots in the coverage map. Location ids are drawn from
/// `[0, MAP_SIZE)`; the runtime's map must have exactly this many
/// slots.
pub const MAP_SIZE: u32 = 1 << MAP_SIZE_POW2;

/// Percentage of blocks to instrument, 1..=100.
pub const ENV_INST_RATIO: &str = "AFL_INST_RATIO";
/// When set, the summary reports hardened mode.
pub const ENV_HARDEN: &str = "AFL_HARDEN";
/// When set, suppresses the banner and per-function summaries.
pub const ENV_QUIET: &str = "AFL_QUIET";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Probability, in percent, that any one block is instrumented.
    pub inst_ratio: u32,
    /// Suppress the banner and summary reports.
    pub quiet: bool,
    /// Report hardened mode in the summary. Only read for the label.
    pub hardened: bool,
    /// Size of the location-id space. Never zero.
    map_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inst_ratio: 100,
            quiet: false,
            hardened: false,
            map_size: MAP_SIZE,
        }
    }
}

impl Config {
    /// Build the configuration from an environment lookup.
    /// `stderr_is_tty` is whether diagnostics go to a terminal; when
    /// they don't, output is quiet regardless of `AFL_QUIET`.
    pub fn from_lookup<F>(lookup: F, stderr_is_tty: bool) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.quiet = !stderr_is_tty || lookup(ENV_QUIET).is_some();
        config.hardened = lookup(ENV_HARDEN).is_some();
        if let Some(ratio) = lookup(ENV_INST_RATIO) {
            config.inst_ratio = parse_ratio(&ratio)?;
        }
        log::debug!("config: {:?}", config);
        Ok(config)
    }

    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok(), stderr_is_tty())
    }

    pub fn with_ratio(mut self, inst_ratio: u32) -> Result<Config, ConfigError> {
        if inst_ratio == 0 || inst_ratio > 100 {
            return Err(ConfigError::BadRatio(inst_ratio.to_string()));
        }
        self.inst_ratio = inst_ratio;
        Ok(self)
    }

    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    /// Draw location ids from `[0, map_size)` instead of the shared
    /// map size. Only useful when the runtime's map is built to match.
    pub fn with_map_size(mut self, map_size: u32) -> Result<Config, ConfigError> {
        if map_size == 0 {
            return Err(ConfigError::EmptyMap);
        }
        self.map_size = map_size;
        Ok(self)
    }

    pub fn mode_label(&self) -> &'static str {
        if self.hardened {
            "hardened"
        } else {
            "non-hardened"
        }
    }
}

/// Parse an instrumentation ratio: a decimal integer between 1 and
/// 100 inclusive.
pub fn parse_ratio(value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(ratio) if (1..=100).contains(&ratio) => Ok(ratio),
        _ => Err(ConfigError::BadRatio(value.to_owned())),
    }
}

pub fn stderr_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect::<HashMap<_, _>>();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn rejects_bad_ratios() {
        for bad in &["0", "101", "", "abc", "-5", "1000000000000"] {
            assert_eq!(
                parse_ratio(bad),
                Err(ConfigError::BadRatio(bad.to_string())),
                "ratio {:?}",
                bad
            );
        }
    }

    #[test]
    fn accepts_every_ratio_in_range() {
        for ratio in 1..=100u32 {
            assert_eq!(parse_ratio(&ratio.to_string()), Ok(ratio));
        }
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[]), true).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.inst_ratio, 100);
        assert_eq!(config.map_size(), MAP_SIZE);
        assert_eq!(config.mode_label(), "non-hardened");
    }

    #[test]
    fn reads_environment() {
        let config = Config::from_lookup(
            lookup(&[("AFL_INST_RATIO", "35"), ("AFL_HARDEN", "1")]),
            true,
        )
        .unwrap();
        assert_eq!(config.inst_ratio, 35);
        assert!(config.hardened);
        assert_eq!(config.mode_label(), "hardened");
        assert!(!config.quiet);
    }

    #[test]
    fn quiet_when_asked_or_not_a_terminal() {
        let config = Config::from_lookup(lookup(&[("AFL_QUIET", "1")]), true).unwrap();
        assert!(config.quiet);
        let config = Config::from_lookup(lookup(&[]), false).unwrap();
        assert!(config.quiet);
    }

    #[test]
    fn bad_environment_ratio_is_fatal() {
        let err = Config::from_lookup(lookup(&[("AFL_INST_RATIO", "0")]), true).unwrap_err();
        assert_eq!(err, ConfigError::BadRatio("0".to_owned()));
        assert!(format!("{}", err).contains("must be between 1 and 100"));
    }

    #[test]
    fn with_ratio_validates() {
        assert!(Config::default().with_ratio(0).is_err());
        assert!(Config::default().with_ratio(101).is_err());
        assert_eq!(Config::default().with_ratio(1).unwrap().inst_ratio, 1);
    }

    #[test]
    fn with_map_size_rejects_empty_map() {
        assert_eq!(Config::default().with_map_size(0), Err(ConfigError::EmptyMap));
        assert_eq!(Config::default().with_map_size(8).unwrap().map_size(), 8);
    }
}
