use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sysinfo::System;
use topic_mediator::error::AppResult;
use topic_mediator::strategy::{CompressorFactory, StrategyFactory};
use topic_mediator::{BrokerConfig, Mediator, Module, ModuleFactory};

const LOG_TARGET_STARTUP: &str = "topic_mediator::startup";

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/TopicMediator/logs/`, rotated daily.
/// Debug builds also log to the console.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("TopicMediator").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "topic-mediator.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting topic-mediator v{} on ({})",
        version,
        std::env::consts::ARCH
    );
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

/// `--config PATH` or the default location
fn config_path() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    match args.iter().position(|arg| arg == "--config") {
        Some(index) if index + 1 < args.len() => PathBuf::from(&args[index + 1]),
        _ => BrokerConfig::default_path(),
    }
}

fn main() -> AppResult<()> {
    initialize_tracing();
    log_runtime_environment();

    let path = config_path();
    let config = BrokerConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let mediator = Mediator::from_config(&config);
    let factory = ModuleFactory::from_config(&mediator, &config);

    let module1 = factory.create_module("module1");
    let module2 = factory.create_module("module2");
    let module3 = factory.create_module("module3");
    let compressor = factory.create_compressor_module("compressorModule", "Special value");
    for module in [&module1, &module2, &module3, &compressor] {
        mediator.register_module(Arc::clone(module));
    }

    module1.transition_to_running();
    compressor.transition_to_running();

    compressor.set_notification_callback(|topic, value| {
        tracing::info!("compressorModule callback: {} = {}", topic, value);
    });
    compressor.subscribe_to_topic("x", "module2");
    module1.subscribe_to_topic("x", "module2");
    module1.unsubscribe_from_topic("x", "module3");
    module2.subscribe_to_topic(&config.publish_topic, "compressorModule");
    module2.subscribe_to_topic(&config.publish_topic, "module1");

    // module2's "x" changes every interval
    let publisher = Arc::clone(&module2);
    let interval = Duration::from_millis(config.publish_interval_ms);
    let ticker = thread::spawn(move || {
        for x in 1..=20 {
            publisher.publish_to_topic("x", x);
            thread::sleep(interval);
        }
    });

    thread::sleep(interval * 4);
    resubscribe(&mediator, &module1);
    thread::sleep(interval * 4);
    reregister(&mediator, &module2, interval * 4)?;
    inject_error(&module1, interval * 4);

    if ticker.join().is_err() {
        tracing::error!("Publisher thread panicked");
    }

    run_compressor_strategies(&compressor);

    for module in [&module1, &compressor] {
        module.stop_background_process();
    }
    mediator.shutdown();
    Ok(())
}

fn resubscribe(mediator: &Mediator, module: &Module) {
    tracing::info!("Unsubscribing {} from x on module2", module.id());
    module.unsubscribe_from_topic("x", "module2");
    mediator.log_subscriptions();
    tracing::info!("Subscribing {} to x on module2", module.id());
    module.subscribe_to_topic("x", "module2");
    mediator.log_subscriptions();
}

fn reregister(mediator: &Mediator, module: &Arc<Module>, pause: Duration) -> AppResult<()> {
    mediator
        .unregister_module(module.id())
        .with_context(|| format!("unregistering {}", module.id()))?;
    thread::sleep(pause);
    mediator.register_module(Arc::clone(module));
    Ok(())
}

fn inject_error(module: &Module, pause: Duration) {
    tracing::info!("Putting {} in error state", module.id());
    module.mark_error();
    thread::sleep(pause);
    module.resolve_error();
}

fn run_compressor_strategies(module: &Module) {
    let factory = CompressorFactory;
    for identifier in ["v1", "v2", "v3", "v4", "v5"] {
        let outcome = factory
            .create_strategy(identifier)
            .and_then(|strategy| module.set_strategy(strategy))
            .and_then(|()| module.execute());
        match outcome {
            Ok(output) => tracing::info!("Compressor {}: {:?}", identifier, output),
            Err(e) => tracing::warn!("Compressor {}: {}", identifier, e),
        }
    }
}
