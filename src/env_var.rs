use std::sync::OnceLock;

use serde::Deserialize;

fn default_deadlock_timeout() -> f64 {
    600.0
}

fn default_num_pes() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.into(),
        Err(_) => 4,
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// A general timeout in seconds for completion events and barriers which may indicate a deadlock, default: 600.0 seconds.
    /// A value <= 0.0 disables the timeout.
    #[serde(default = "default_deadlock_timeout")]
    pub deadlock_timeout: f64,

    /// The number of PEs (worker threads, one partition each) a world is built with, default: available parallelism
    #[serde(default = "default_num_pes")]
    pub num_pes: usize,

    /// flag used to print warnings when users make blocking calls on worker threads. Default: true
    pub blocking_call_warning: Option<bool>,

    /// pin each worker thread to a core, default: false
    #[serde(default)]
    pub pin_workers: bool,
}

/// Get the current Environment Variable configuration
///
/// Variables are read once, prefixed with `STRATA_` (e.g. `STRATA_NUM_PES=4`).
pub fn config() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();
    CONFIG.get_or_init(|| match envy::prefixed("STRATA_").from_env::<Config>() {
        Ok(config) => config,
        Err(error) => panic!("{}", error),
    })
}
