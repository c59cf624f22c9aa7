//! Default actions every module answers.
//!
//! ```text
//! core/msg/<self>/start     → Module::start(packet)
//! core/msg/<self>/stop      → Module::stop()
//! core/msg/<self>/restart   → Module::restart(packet)
//! core/msg/<self>/shutdown  → Module::on_shutdown(shutdown.exit_process)
//! core/msg/<self>/logger    → Module::update_logger(packet)
//! core/msg/<self>/configs   → Module::update_configs(packet)
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::routing::{action_handler, ActionHandler, Packet};
use crate::runtime::module::Module;

/// Names of the actions registered at setup.
pub const DEFAULT_ACTIONS: [&str; 6] = ["start", "stop", "restart", "shutdown", "logger", "configs"];

pub(crate) fn register_defaults(module: &Module) {
    module.on_action("start", bind(module, |m, packet| async move { m.start(Some(packet)).await }));
    module.on_action("stop", bind(module, |m, _| async move { m.stop().await }));
    module.on_action(
        "restart",
        bind(module, |m, packet| async move { m.restart(Some(packet)).await }),
    );
    module.on_action(
        "shutdown",
        bind(module, |m, _| async move {
            let exit_after = m.config().shutdown.exit_process;
            m.on_shutdown(exit_after).await;
        }),
    );
    module.on_action(
        "logger",
        bind(module, |m, packet| async move { m.update_logger(packet).await }),
    );
    module.on_action(
        "configs",
        bind(module, |m, packet| async move { m.update_configs(packet).await }),
    );
}

/// Wrap `f` so the handler only holds a weak reference to the module.
fn bind<F, Fut>(module: &Module, f: F) -> ActionHandler
where
    F: Fn(Module, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let weak = Arc::downgrade(&module.inner);
    action_handler(move |packet: Packet| {
        let call = weak.upgrade().map(|inner| f(Module { inner }, packet));
        async move {
            match call {
                Some(call) => call.await,
                None => tracing::debug!("Action delivered to a dropped module"),
            }
        }
    })
}
