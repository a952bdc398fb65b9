//! Validate resilience configuration and print the components it defines
//!
//! Usage: `resilience-config-check [CONFIG_DIR] [ENVIRONMENT]`
//!
//! Without arguments the directory comes from `RESILIENCE_CONFIG_DIR` (or
//! `./config`) and the environment from `RESILIENCE_ENV`.

use anyhow::Context;
use std::path::PathBuf;
use std::process;
use tasker_resilience::config::ConfigManager;
use tasker_resilience::resilience::Registry;

fn main() {
    tasker_resilience::logging::init_structured_logging();

    let mut args = std::env::args().skip(1);
    let config_dir = args.next().map(PathBuf::from);
    let environment = args
        .next()
        .unwrap_or_else(ConfigManager::detect_environment);

    match check(config_dir, &environment) {
        Ok(()) => {
            tracing::info!("Resilience configuration check completed successfully");
        }
        Err(e) => {
            println!("❌ Resilience configuration check failed: {e:#}");
            tracing::error!(error = %e, "Resilience configuration check failed");
            process::exit(1);
        }
    }
}

fn check(config_dir: Option<PathBuf>, environment: &str) -> anyhow::Result<()> {
    println!("🔧 Checking Resilience Configuration");
    println!("Environment: {environment}");

    let manager = ConfigManager::load_from_directory_with_env(config_dir, environment)
        .context("loading resilience configuration")?;
    println!(
        "✅ Configuration loaded from {}",
        manager.config_directory().display()
    );

    let settings = manager.settings();
    println!("   - State store: {}", settings.state_store.backend);
    println!("   - Sync mode: {:?}", settings.state_store.sync_mode);

    let registry =
        Registry::from_settings(settings).context("building registry from configuration")?;

    println!("\n⚡ Circuit breakers:");
    for name in registry.list_circuit_breakers() {
        if let Some(breaker) = registry.circuit_breaker(&name) {
            let config = breaker.config();
            println!(
                "   - {name}: failure_threshold={}, recovery_timeout={:?}, success_threshold={}, half_open_max_calls={}",
                config.failure_threshold,
                config.recovery_timeout,
                config.success_threshold,
                config.half_open_max_calls
            );
        }
    }

    println!("\n🔁 Retry policies:");
    for name in registry.list_retry_managers() {
        if let Some(manager) = registry.retry_manager(&name) {
            let config = manager.config();
            println!(
                "   - {name}: max_attempts={}, initial_delay={:?}, max_delay={:?}, jitter={}",
                config.max_attempts, config.initial_delay, config.max_delay, config.jitter
            );
        }
    }

    println!("\n{}", registry.system_metrics().format_summary());
    println!("\n🎉 Resilience configuration is valid");
    Ok(())
}
