//! Module runtime facade.
//!
//! # Data Flow
//! ```text
//! ModuleBuilder (builder.rs)
//!     descriptor → identity, config → validated, broker → subsystems
//!     → Module (module.rs)
//!
//! Module::setup
//!     connect (retry) → default actions (actions.rs) → "+/msg/<self>/+" → ready
//!
//! core command on core/msg/<self>/<action>
//!     → router → actions.rs → Module operation → hook, then bookkeeping
//! ```

pub mod actions;
pub mod builder;
pub mod module;

pub use actions::DEFAULT_ACTIONS;
pub use builder::ModuleBuilder;
pub use module::Module;
