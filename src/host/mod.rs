//! Host UI capability surface
//!
//! The monitor never touches a concrete UI toolkit. It consumes:
//! - query/inspection/replacement capabilities through [`UiHost`]
//! - three event feeds ([`HostFeeds`]): user interactions (delivered before
//!   the target's own handlers run), structural changes, and runtime errors
//!
//! A platform adapter (web view, native GUI, terminal UI) implements the
//! trait and pushes events through [`FeedSenders`]. [`memory::InMemoryHost`]
//! is a headless adapter over a simulated element tree.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::HostError;

pub mod memory;

pub use memory::InMemoryHost;

/// Stable identity of an acted-upon element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub id: String,
    pub class_name: String,
    pub tag_name: String,
    /// Text content, truncated to [`TargetDescriptor::TEXT_LIMIT`] characters
    pub text: String,
    /// Best-effort marker: true when a handler was attached through the
    /// host's attach path. Not an introspection of real listeners.
    pub has_handler: bool,
}

impl TargetDescriptor {
    pub const TEXT_LIMIT: usize = 50;

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_tag(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.chars().take(Self::TEXT_LIMIT).collect();
        self
    }

    pub fn with_handler(mut self, has_handler: bool) -> Self {
        self.has_handler = has_handler;
        self
    }

    /// First non-empty of id, class, tag; `"unknown"` otherwise.
    pub fn description(&self) -> &str {
        [&self.id, &self.class_name, &self.tag_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

/// What an element does when activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationHandler {
    /// Call a named global capability (e.g. `openSettings`)
    InvokeCapability(String),
    /// Put a region into its active state
    Activate(String),
    /// Take a region out of its active state
    Deactivate(String),
    /// Replace a region's text content
    SetText { region: String, text: String },
}

/// One observed user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub target: TargetDescriptor,
}

/// A batch of subtree insertions and removals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralChange {
    pub removed: Vec<TargetDescriptor>,
    pub added: Vec<TargetDescriptor>,
}

impl StructuralChange {
    /// Identities removed in this batch and not re-inserted by it.
    /// A remove+insert of the same identity is a replacement.
    pub fn net_removed(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.removed
            .iter()
            .filter(|r| !r.id.is_empty() && !self.added.iter().any(|a| a.id == r.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeErrorKind {
    Error,
    UnhandledRejection,
}

/// An uncaught error or unhandled rejection raised inside the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            line: None,
            column: None,
            stack: None,
        }
    }

    pub fn at(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Receiving ends of the host event feeds, consumed by the monitor.
#[derive(Debug)]
pub struct HostFeeds {
    pub interactions: mpsc::UnboundedReceiver<InteractionEvent>,
    pub structure: mpsc::UnboundedReceiver<StructuralChange>,
    pub runtime_errors: mpsc::UnboundedReceiver<RuntimeError>,
}

/// Sending ends of the host event feeds, held by the adapter.
#[derive(Debug, Clone)]
pub struct FeedSenders {
    pub interactions: mpsc::UnboundedSender<InteractionEvent>,
    pub structure: mpsc::UnboundedSender<StructuralChange>,
    pub runtime_errors: mpsc::UnboundedSender<RuntimeError>,
}

/// Create a connected pair of feed senders and receivers.
pub fn feed_channel() -> (FeedSenders, HostFeeds) {
    let (itx, irx) = mpsc::unbounded_channel();
    let (stx, srx) = mpsc::unbounded_channel();
    let (etx, erx) = mpsc::unbounded_channel();
    (
        FeedSenders {
            interactions: itx,
            structure: stx,
            runtime_errors: etx,
        },
        HostFeeds {
            interactions: irx,
            structure: srx,
            runtime_errors: erx,
        },
    )
}

/// Capabilities the monitor consumes from its host environment.
#[async_trait]
pub trait UiHost: Send + Sync {
    /// Query by identity; `None` when the element is not in the tree.
    async fn element(&self, id: &str) -> Option<TargetDescriptor>;

    /// Whether a region reports its "active" state.
    async fn is_active(&self, id: &str) -> bool;

    /// Textual content of a region.
    async fn text_content(&self, id: &str) -> Option<String>;

    /// Replace an element with a fresh unbound copy carrying `handler`.
    async fn replace_element(&self, id: &str, handler: ActivationHandler)
        -> Result<(), HostError>;

    /// Set the handler-presence marker on an element.
    async fn mark_handler_attached(&self, id: &str) -> Result<(), HostError>;

    /// Whether a named global capability is currently callable.
    async fn has_capability(&self, name: &str) -> bool;

    /// Host identification string included in reports (user agent or similar).
    fn identity(&self) -> String;

    /// Current application version.
    async fn app_version(&self) -> Result<String, HostError>;

    /// Ask the user a yes/no question.
    async fn confirm(&self, message: &str) -> bool;

    /// Tear down and relaunch the host process.
    async fn restart(&self) -> Result<(), HostError>;

    /// Forward a runtime error to the host's telemetry sink.
    async fn report_error(&self, _error: &RuntimeError) -> Result<(), HostError> {
        Err(HostError::Unsupported("report_error".into()))
    }
}
