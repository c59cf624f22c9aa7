//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound:
//!     Topic { source?, packet_type?, dest?, action }
//!     → topic.rs (defaults + template "{source}/{packet_type}/{dest}/{action}")
//!     → broker publish
//!
//! Inbound:
//!     broker message on core/msg/<self>/<action>
//!     → router.rs (callback registered per action)
//!     → payload.rs (JSON decode, raw fallback)
//!     → ActionHandler
//!
//! Subscription filters:
//!     matcher.rs ("+" one level, "#" remainder)
//! ```
//!
//! # Design Decisions
//! - One topic template for every direction
//! - Wildcards only ever appear in subscriptions
//! - Unparsable payloads are data, not errors

pub mod matcher;
pub mod payload;
pub mod router;
pub mod topic;

pub use payload::{Packet, Payload};
pub use router::{action_handler, ActionHandler, ActionRouter};
pub use topic::{topic_for, Topic, TopicError, TopicScheme, CORE};
