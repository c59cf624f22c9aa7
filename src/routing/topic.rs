//! Topic addressing.
//!
//! # Responsibilities
//! - Render `{source}/{packet_type}/{dest}/{action}` topics
//! - Default `source`/`dest` to the module name and `packet_type` to `msg`
//! - Keep wildcards out of publish topics
//!
//! # Design Decisions
//! - One template for every topic; the scheme only fills in defaults
//! - Subscription topics may carry `+` in `source`/`action`, outbound never

use thiserror::Error;

/// Single-level broker wildcard.
pub const SINGLE_LEVEL_WILDCARD: &str = "+";

/// Multi-level broker wildcard.
pub const MULTI_LEVEL_WILDCARD: &str = "#";

/// Packet type used for control traffic.
pub const DEFAULT_PACKET_TYPE: &str = "msg";

/// Name of the coordinating peer.
pub const CORE: &str = "core";

/// Errors produced while addressing topics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    /// A publish topic contained a wildcard segment.
    #[error("topic '{0}' contains a wildcard and cannot be published to")]
    WildcardInPublish(String),

    /// A topic segment was empty.
    #[error("topic '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A topic before rendering. Unset fields fall back to the scheme defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topic {
    pub source: Option<String>,
    pub packet_type: Option<String>,
    pub dest: Option<String>,
    pub action: String,
}

impl Topic {
    /// Topic for `action` with every other segment defaulted.
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn packet_type(mut self, packet_type: impl Into<String>) -> Self {
        self.packet_type = Some(packet_type.into());
        self
    }
}

/// Renders topics for one module.
#[derive(Debug, Clone)]
pub struct TopicScheme {
    name: String,
}

impl TopicScheme {
    /// Create a scheme rooted at the given module name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Module name used for defaulted segments.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render a topic, filling unset segments with defaults.
    pub fn render(&self, topic: &Topic) -> String {
        topic_for(
            topic.source.as_deref().unwrap_or(&self.name),
            topic.packet_type.as_deref().unwrap_or(DEFAULT_PACKET_TYPE),
            topic.dest.as_deref().unwrap_or(&self.name),
            &topic.action,
        )
    }

    /// Topic this module publishes `action` to `dest` on.
    pub fn outbound(&self, dest: &str, action: &str) -> String {
        self.render(&Topic::action(action).dest(dest))
    }

    /// Topic core commands for `action` arrive on.
    pub fn inbound_action(&self, action: &str) -> String {
        self.render(&Topic::action(action).source(CORE))
    }

    /// The namespace subscription established at connect time.
    pub fn namespace_subscription(&self) -> String {
        self.render(
            &Topic::action(SINGLE_LEVEL_WILDCARD).source(SINGLE_LEVEL_WILDCARD),
        )
    }
}

/// Render the four topic segments through the fixed template.
pub fn topic_for(source: &str, packet_type: &str, dest: &str, action: &str) -> String {
    format!("{}/{}/{}/{}", source, packet_type, dest, action)
}

/// Check that a topic can be used as a publish target.
pub fn validate_publish_topic(topic: &str) -> Result<(), TopicError> {
    for segment in topic.split('/') {
        if segment.is_empty() {
            return Err(TopicError::EmptySegment(topic.to_string()));
        }
        if segment.contains(SINGLE_LEVEL_WILDCARD) || segment.contains(MULTI_LEVEL_WILDCARD) {
            return Err(TopicError::WildcardInPublish(topic.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_module_name() {
        let scheme = TopicScheme::new("gauge");
        assert_eq!(scheme.render(&Topic::action("ping")), "gauge/msg/gauge/ping");
    }

    #[test]
    fn test_dest_and_action_present() {
        let scheme = TopicScheme::new("gauge");
        for (source, dest, action) in [
            ("core", "gauge", "start"),
            ("gauge", "core", "alive"),
            ("other", "third", "configs"),
        ] {
            let topic = scheme.render(&Topic::action(action).source(source).dest(dest));
            assert!(topic.contains(dest));
            assert!(topic.contains(action));
        }
    }

    #[test]
    fn test_dest_segment_position() {
        let scheme = TopicScheme::new("gauge");
        let topic = scheme.outbound(CORE, "alive");
        let segments: Vec<&str> = topic.split('/').collect();
        assert_eq!(segments, vec!["gauge", "msg", "core", "alive"]);
    }

    #[test]
    fn test_inbound_action_comes_from_core() {
        let scheme = TopicScheme::new("gauge");
        assert_eq!(scheme.inbound_action("start"), "core/msg/gauge/start");
    }

    #[test]
    fn test_namespace_subscription() {
        let scheme = TopicScheme::new("gauge");
        assert_eq!(scheme.namespace_subscription(), "+/msg/gauge/+");
    }

    #[test]
    fn test_custom_packet_type() {
        let scheme = TopicScheme::new("gauge");
        let topic = scheme.render(&Topic::action("frame").packet_type("data").dest("viewer"));
        assert_eq!(topic, "gauge/data/viewer/frame");
    }

    #[test]
    fn test_publish_validation() {
        assert!(validate_publish_topic("gauge/msg/core/alive").is_ok());
        assert_eq!(
            validate_publish_topic("+/msg/gauge/+"),
            Err(TopicError::WildcardInPublish("+/msg/gauge/+".into()))
        );
        assert!(matches!(
            validate_publish_topic("gauge/msg/#"),
            Err(TopicError::WildcardInPublish(_))
        ));
        assert!(matches!(
            validate_publish_topic("gauge//core/alive"),
            Err(TopicError::EmptySegment(_))
        ));
    }
}
