//! Module construction.
//!
//! # Responsibilities
//! - Resolve the identity (parsed document or descriptor file)
//! - Validate the runtime config
//! - Wire the subsystems around one broker client
//!
//! Construction errors are fatal: nothing is connected or spawned until
//! every check has passed.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::broker::BrokerClient;
use crate::config::validation::validate_config;
use crate::config::{load_descriptor, resolve_descriptor_path, ConfigError, ModuleIdentity, RuntimeConfig};
use crate::error::ModuleError;
use crate::health::HeartbeatScheduler;
use crate::lifecycle::shutdown::process_exit;
use crate::lifecycle::{ExitHandler, HookTable, LifecycleCell, Shutdown};
use crate::observability::{BrokerSink, ConsoleSink, FanoutLogger, LogSink, Severity};
use crate::routing::topic::validate_publish_topic;
use crate::routing::{TopicScheme, CORE};
use crate::runtime::module::{Module, ModuleInner};

/// Builder for [`Module`].
pub struct ModuleBuilder {
    config: RuntimeConfig,
    descriptor: Option<Value>,
    descriptor_path: Option<PathBuf>,
    broker: Option<Arc<dyn BrokerClient>>,
    logger: Option<Arc<FanoutLogger>>,
    exit_handler: Option<ExitHandler>,
}

impl ModuleBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            descriptor: None,
            descriptor_path: None,
            broker: None,
            logger: None,
            exit_handler: None,
        }
    }

    /// Use an already parsed descriptor document.
    pub fn descriptor(mut self, document: Value) -> Self {
        self.descriptor = Some(document);
        self
    }

    /// Read the descriptor from `path` instead of the configured location.
    pub fn descriptor_path(mut self, path: impl AsRef<Path>) -> Self {
        self.descriptor_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn broker(mut self, broker: Arc<dyn BrokerClient>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Replace the default console + broker fan-out.
    pub fn logger(mut self, logger: Arc<FanoutLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Called with the exit code when a shutdown asks to exit.
    pub fn exit_handler(mut self, handler: ExitHandler) -> Self {
        self.exit_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Module, ModuleError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;

        let identity = match self.descriptor {
            Some(document) => ModuleIdentity::from_document(document)?,
            None => {
                let path = resolve_descriptor_path(self.descriptor_path.as_deref(), &self.config);
                load_descriptor(&path)?
            }
        };

        let broker = self
            .broker
            .ok_or_else(|| ModuleError::InvalidBroker("no broker client provided".into()))?;

        let topics = TopicScheme::new(identity.name());
        for action in ["ready", "alive", "shutdown", self.config.logging.action.as_str()] {
            validate_publish_topic(&topics.outbound(CORE, action))?;
        }
        let logger = match self.logger {
            Some(logger) => logger,
            None => Arc::new(default_logger(&self.config, &identity, &broker, &topics)),
        };

        let state = Arc::new(LifecycleCell::new());
        let heartbeat = HeartbeatScheduler::new(
            broker.clone(),
            topics.outbound(CORE, "alive"),
            state.clone(),
            self.config.heartbeat.tick_timeout_ratio,
        );

        tracing::info!(module = %identity.name(), "Module built");

        Ok(Module::from_inner(ModuleInner {
            router: crate::routing::ActionRouter::new(broker.clone(), topics.clone()),
            identity,
            config: self.config,
            broker,
            topics,
            logger,
            state,
            hooks: HookTable::new(),
            heartbeat,
            configs: ArcSwap::from_pointee(Value::Null),
            setup_lock: tokio::sync::Mutex::new(()),
            transition_lock: tokio::sync::Mutex::new(()),
            shut_down: AtomicBool::new(false),
            actions_registered: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            exit_handler: self.exit_handler.unwrap_or_else(process_exit),
            shutdown: Shutdown::new(),
        }))
    }
}

/// Console sink plus a broker sink on `<self>/msg/core/<logging.action>`.
fn default_logger(
    config: &RuntimeConfig,
    identity: &ModuleIdentity,
    broker: &Arc<dyn BrokerClient>,
    topics: &TopicScheme,
) -> FanoutLogger {
    let threshold = Severity::parse(&config.logging.level).unwrap_or_default();
    let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();

    if config.logging.console {
        let progname = config
            .logging
            .progname
            .clone()
            .unwrap_or_else(|| identity.name().to_string());
        sinks.push(Arc::new(ConsoleSink::stdout(Some(progname))));
    }
    if config.logging.broker {
        let topic = topics.outbound(CORE, &config.logging.action);
        sinks.push(Arc::new(BrokerSink::new(broker.clone(), topic)));
    }

    let logger = FanoutLogger::with_sinks(threshold, sinks);
    logger.set_escape(config.logging.escape);
    logger
}
