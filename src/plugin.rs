//! Plugin entry point: the handshake between the instrumentation pass
//! and a host pipeline.

use crate::config::Config;
use crate::errors::PluginError;
use crate::passes::coverage::CoveragePass;
use crate::pipeline::{PassPosition, PassRegistration, Pipeline};
use crate::rng::{ProcessRng, RandomSource};

/// The IR version this plugin was built against. A host must report
/// the same version to load it.
pub const IR_VERSION: u32 = 1;

/// The pass the coverage pass runs right after.
pub const REFERENCE_PASS: &str = "ssa";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    pub version: &'static str,
    pub help: &'static str,
}

pub fn plugin_info() -> PluginInfo {
    PluginInfo {
        version: env!("CARGO_PKG_VERSION"),
        help: "basic-block coverage instrumentation pass",
    }
}

/// What the host tells the plugin about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostVersion {
    pub ir_version: u32,
}

impl HostVersion {
    pub fn current() -> HostVersion {
        HostVersion {
            ir_version: IR_VERSION,
        }
    }
}

/// Where `plugin_init` reads its configuration from.
pub enum Environment<'a> {
    /// The process environment and the real stderr.
    Process,
    /// A lookup function and a stand-in for "is stderr a terminal".
    Lookup(&'a dyn Fn(&str) -> Option<String>, bool),
}

/// Initialize the plugin with a freshly seeded process generator.
pub fn plugin_init(
    host: &HostVersion,
    pipeline: &mut Pipeline,
    env: Environment,
) -> Result<Config, PluginError> {
    plugin_init_with_rng(host, pipeline, env, ProcessRng::from_time_and_pid())
}

/// Initialize the plugin: check the host, read the configuration and
/// register the coverage pass right after the first `ssa` pass.
/// Returns the configuration the pass will run with.
pub fn plugin_init_with_rng<R: RandomSource + 'static>(
    host: &HostVersion,
    pipeline: &mut Pipeline,
    env: Environment,
    rng: R,
) -> Result<Config, PluginError> {
    if host.ir_version != IR_VERSION {
        return Err(PluginError::IncompatibleVersion {
            host: host.ir_version,
            plugin: IR_VERSION,
        });
    }

    let config = match env {
        Environment::Process => Config::from_env()?,
        Environment::Lookup(lookup, is_tty) => Config::from_lookup(lookup, is_tty)?,
    };

    if !config.quiet {
        log::info!("blockcov-pass {} ({})", plugin_info().version, plugin_info().help);
    }

    pipeline
        .register(PassRegistration {
            pass: Box::new(CoveragePass::new(config.clone(), rng)),
            reference_pass_name: REFERENCE_PASS.to_owned(),
            ref_pass_instance_number: 1,
            pos_op: PassPosition::InsertAfter,
        })
        .map_err(|err| PluginError::Registration(err.to_string()))?;

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::ConfigError;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn registers_after_ssa() {
        let mut pipeline = Pipeline::standard();
        let config = plugin_init(
            &HostVersion::current(),
            &mut pipeline,
            Environment::Lookup(&no_env, true),
        )
        .unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(pipeline.pass_names(), vec!["ssa", "afl-inst", "cleanup_cfg"]);
    }

    #[test]
    fn rejects_other_host_versions() {
        let mut pipeline = Pipeline::standard();
        let err = plugin_init(
            &HostVersion {
                ir_version: IR_VERSION + 1,
            },
            &mut pipeline,
            Environment::Lookup(&no_env, true),
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::IncompatibleVersion { .. }));
        assert_eq!(pipeline.pass_names(), vec!["ssa", "cleanup_cfg"]);
    }

    #[test]
    fn bad_ratio_aborts_initialization() {
        let lookup = |name: &str| {
            if name == "AFL_INST_RATIO" {
                Some("abc".to_owned())
            } else {
                None
            }
        };
        let mut pipeline = Pipeline::standard();
        let err = plugin_init(
            &HostVersion::current(),
            &mut pipeline,
            Environment::Lookup(&lookup, true),
        )
        .unwrap_err();
        assert_eq!(err, PluginError::Config(ConfigError::BadRatio("abc".to_owned())));
        assert_eq!(pipeline.pass_names(), vec!["ssa", "cleanup_cfg"]);
    }

    #[test]
    fn missing_reference_pass_is_a_registration_error() {
        let mut pipeline = Pipeline::new();
        let err = plugin_init(
            &HostVersion::current(),
            &mut pipeline,
            Environment::Lookup(&no_env, false),
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::Registration(_)));
    }
}
