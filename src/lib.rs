//! Crossbind Runtime - marshaling runtime for cross-language object models
//!
//! Lets a native core and foreign host runtimes (a managed VM, a
//! component-object runtime) share one object model: values are translated
//! in both directions by static type category, and interfaces implemented on
//! either side can be called from the other with identity preserved.
//!
//! Architecture:
//! - `interop` - type classifier and value translators
//! - `proxy` - interface proxies and the proxy identity cache
//! - `boundary` - exception propagation for calls in and out
//! - `temporal` - epoch/tick arithmetic for time values
//! - `host` - the host runtime contract plus an in-process host
//! - `env`, `config`, `thread`, `logging`, `error` - ambient runtime support

pub mod boundary;
pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod interop;
pub mod logging;
pub mod proxy;
pub mod temporal;
pub mod thread;

// Re-export core types
pub use config::{BridgeConfig, TextPolicy};
pub use env::{Env, InteropStats};
pub use error::{BridgeError, BridgeResult, ConfigError, IdentityCacheError, MarshalError};
pub use host::{Args, ForeignObject, ForeignRef, Host, HostException, HostRecord, HostString, HostValue, ObjectId};
pub use interop::{classify, Enumeration, Marshal, Record, TypeCategory, TypeShape};
pub use proxy::{expose_to_host, expose_to_native, Bridged, DispatchTable, ForeignHandle, Interface};
pub use temporal::TickClock;
pub use thread::{AttachGuard, AttachPolicy};

/// Initialize logging, install `config` process-wide and set up the proxy
/// caches.
///
/// [`Env::new`] picks up the installed policies and clock. The global caches
/// are sized from `[cache] initial_capacity` of the config installed when
/// they are first used.
pub fn init(config: &BridgeConfig) -> Result<(), ConfigError> {
    config.validate()?;
    logging::init_with_config(logging::LogConfig::from_section(&config.logging)?);
    config::install(config.clone());
    let foreign = proxy::cache::foreign_proxies();
    let native = proxy::cache::native_proxies();
    logging::log_runtime_init(config.cache.initial_capacity);
    tracing::debug!(foreign = foreign.len(), native = native.len(), "Proxy caches ready");
    Ok(())
}

/// Drop all entries of the process-wide proxy caches
pub fn shutdown() {
    let foreign = proxy::cache::foreign_proxies().len();
    let native = proxy::cache::native_proxies().len();
    logging::log_runtime_shutdown(foreign, native);
    proxy::cache::clear_global();
}

/// Runtime initialization; returns 0 on success, -1 on a configuration error
#[no_mangle]
pub extern "C" fn crossbind_runtime_init() -> i32 {
    let mut config = BridgeConfig::default();
    let outcome = config.apply_env().and_then(|()| init(&config));
    match outcome {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(event = "runtime_init_failed", error = %err, "Runtime initialization failed");
            -1
        }
    }
}

/// Runtime cleanup
#[no_mangle]
pub extern "C" fn crossbind_runtime_shutdown() {
    shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::local::LocalHost;
    use std::sync::Arc;

    // One test owns the process-wide config so parallel tests never race on it
    #[test]
    fn test_init_installs_config() {
        let mut config = BridgeConfig::default();
        config.threads.attach_policy = AttachPolicy::Scoped;
        config.text.policy = TextPolicy::Lossy;
        config.clock.preset = Some(config::ClockPreset::Java);
        config.cache.initial_capacity = 4096;
        assert!(init(&config).is_ok());
        assert!(logging::is_initialized());
        assert_eq!(config::runtime_config(), config);

        let env = Env::new(Arc::new(LocalHost::new()));
        assert_eq!(env.attach_policy(), AttachPolicy::Scoped);
        assert_eq!(env.text_policy(), TextPolicy::Lossy);
        assert_eq!(*env.clock(), TickClock::JAVA);

        // Rejected configs leave the installed one alone
        let mut invalid = BridgeConfig::default();
        invalid.clock.tick_nanos = Some(3);
        assert!(matches!(init(&invalid), Err(ConfigError::Invalid(_))));
        assert_eq!(Env::new(Arc::new(LocalHost::new())).attach_policy(), AttachPolicy::Scoped);

        // The C entry point applies environment overrides to the defaults
        std::env::set_var("CROSSBIND_TEXT_POLICY", "lossy");
        assert_eq!(crossbind_runtime_init(), 0);
        std::env::remove_var("CROSSBIND_TEXT_POLICY");
        let env = Env::new(Arc::new(LocalHost::new()));
        assert_eq!(env.text_policy(), TextPolicy::Lossy);
        assert_eq!(env.attach_policy(), AttachPolicy::ThreadLifetime);
        assert_eq!(*env.clock(), TickClock::CLR);

        std::env::set_var("CROSSBIND_ATTACH_POLICY", "sometimes");
        assert_eq!(crossbind_runtime_init(), -1);
        std::env::remove_var("CROSSBIND_ATTACH_POLICY");

        assert!(init(&BridgeConfig::default()).is_ok());
        assert_eq!(Env::new(Arc::new(LocalHost::new())).text_policy(), TextPolicy::Strict);
        shutdown();
    }
}
