//! Headless host adapter over a simulated element tree.
//!
//! Clicking an element first publishes an [`InteractionEvent`] (capture
//! order) and then runs the element's handler. Removals and replacements
//! publish [`StructuralChange`] batches. Prompts, restarts and telemetry
//! calls are recorded for inspection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{
    feed_channel, ActivationHandler, FeedSenders, HostFeeds, InteractionEvent, RuntimeError,
    StructuralChange, TargetDescriptor, UiHost,
};
use crate::config::ElementIds;
use crate::errors::HostError;

/// Id of the connection-test button in the default layout.
pub const TEST_CONNECTION_BUTTON: &str = "testConnectionBtn";
/// Id of the settings save button in the default layout.
pub const SAVE_SETTINGS_BUTTON: &str = "saveSettingsBtn";
/// Capability run by the connection-test button in the default layout.
pub const TEST_CONNECTION_CAPABILITY: &str = "testConnection";

#[derive(Debug, Clone)]
struct Node {
    descriptor: TargetDescriptor,
    active: bool,
    content: String,
    handler: Option<ActivationHandler>,
    handler_marked: bool,
}

impl Node {
    fn snapshot(&self) -> TargetDescriptor {
        let mut d = self.descriptor.clone().with_text(&self.content);
        d.has_handler = self.handler_marked;
        d
    }
}

#[derive(Debug)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    capabilities: HashMap<String, ActivationHandler>,
    confirm_answer: bool,
    prompts: Vec<String>,
    restarts: u32,
    replacements: HashMap<String, u32>,
    reported_errors: Vec<RuntimeError>,
    version: String,
}

/// Simulated element tree implementing [`UiHost`].
#[derive(Debug)]
pub struct InMemoryHost {
    inner: Mutex<Inner>,
    feeds: FeedSenders,
}

impl InMemoryHost {
    /// An empty tree with no capabilities.
    pub fn new() -> (Arc<Self>, HostFeeds) {
        let (senders, feeds) = feed_channel();
        let host = Self {
            inner: Mutex::new(Inner {
                nodes: BTreeMap::new(),
                capabilities: HashMap::new(),
                confirm_answer: false,
                prompts: Vec::new(),
                restarts: 0,
                replacements: HashMap::new(),
                reported_errors: Vec::new(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            feeds: senders,
        };
        (Arc::new(host), feeds)
    }

    /// A working application surface: settings trigger and modal, chat
    /// trigger and panel, connection-test button and result region, and a
    /// save button, with their capabilities defined.
    pub fn with_default_layout(ids: &ElementIds) -> (Arc<Self>, HostFeeds) {
        let (host, feeds) = Self::new();

        host.insert_element(
            TargetDescriptor::new(&ids.settings_trigger)
                .with_class("fab settings-fab")
                .with_tag("BUTTON")
                .with_text("⚙"),
            Some(ActivationHandler::InvokeCapability(ids.open_settings.clone())),
        );
        host.insert_element(
            TargetDescriptor::new(&ids.settings_modal)
                .with_class("modal")
                .with_tag("DIV"),
            None,
        );
        host.insert_element(
            TargetDescriptor::new(&ids.chat_trigger)
                .with_class("fab chat-fab")
                .with_tag("BUTTON")
                .with_text("💬"),
            Some(ActivationHandler::Activate(ids.chat_panel.clone())),
        );
        host.insert_element(
            TargetDescriptor::new(&ids.chat_panel)
                .with_class("chat-panel")
                .with_tag("ASIDE"),
            None,
        );
        host.insert_element(
            TargetDescriptor::new(TEST_CONNECTION_BUTTON)
                .with_class("btn btn-secondary")
                .with_tag("BUTTON")
                .with_text("Test Connection"),
            Some(ActivationHandler::InvokeCapability(
                TEST_CONNECTION_CAPABILITY.to_string(),
            )),
        );
        host.insert_element(
            TargetDescriptor::new(&ids.connection_result)
                .with_class("test-result")
                .with_tag("DIV"),
            None,
        );
        host.insert_element(
            TargetDescriptor::new(SAVE_SETTINGS_BUTTON)
                .with_class("btn btn-primary")
                .with_tag("BUTTON")
                .with_text("Save Settings"),
            Some(ActivationHandler::InvokeCapability(
                ids.close_settings.clone(),
            )),
        );

        host.define_capability(
            &ids.open_settings,
            ActivationHandler::Activate(ids.settings_modal.clone()),
        );
        host.define_capability(
            &ids.close_settings,
            ActivationHandler::Deactivate(ids.settings_modal.clone()),
        );
        host.define_capability(
            TEST_CONNECTION_CAPABILITY,
            ActivationHandler::SetText {
                region: ids.connection_result.clone(),
                text: "✅ Connection successful".to_string(),
            },
        );

        (host, feeds)
    }

    /// Insert an element; a given handler counts as a successful attach and
    /// sets the handler marker.
    pub fn insert_element(&self, descriptor: TargetDescriptor, handler: Option<ActivationHandler>) {
        let node = Node {
            content: descriptor.text.clone(),
            handler_marked: handler.is_some(),
            handler,
            active: false,
            descriptor,
        };
        let added = node.snapshot();
        self.inner.lock().nodes.insert(added.id.clone(), node);
        let _ = self.feeds.structure.send(StructuralChange {
            removed: Vec::new(),
            added: vec![added],
        });
    }

    /// Remove an element, publishing the removal.
    pub fn remove_element(&self, id: &str) -> Result<(), HostError> {
        let removed = self
            .inner
            .lock()
            .nodes
            .remove(id)
            .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
        let _ = self.feeds.structure.send(StructuralChange {
            removed: vec![removed.snapshot()],
            added: Vec::new(),
        });
        Ok(())
    }

    /// Drop an element's handler and marker (a lost listener).
    pub fn detach_handler(&self, id: &str) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
        node.handler = None;
        node.handler_marked = false;
        Ok(())
    }

    pub fn define_capability(&self, name: &str, effect: ActivationHandler) {
        self.inner
            .lock()
            .capabilities
            .insert(name.to_string(), effect);
    }

    pub fn remove_capability(&self, name: &str) {
        self.inner.lock().capabilities.remove(name);
    }

    pub fn set_active(&self, id: &str, active: bool) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
        node.active = active;
        Ok(())
    }

    pub fn set_text(&self, id: &str, text: &str) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
        node.content = text.to_string();
        Ok(())
    }

    /// Simulate a user click: publish the interaction, then run the handler.
    pub fn click(&self, id: &str) -> Result<(), HostError> {
        let (target, handler) = {
            let inner = self.inner.lock();
            let node = inner
                .nodes
                .get(id)
                .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
            (node.snapshot(), node.handler.clone())
        };

        let _ = self.feeds.interactions.send(InteractionEvent { target });

        if let Some(handler) = handler {
            self.run_handler(&handler, 0);
        }
        Ok(())
    }

    /// Publish a runtime error on the error feed.
    pub fn emit_runtime_error(&self, error: RuntimeError) {
        let _ = self.feeds.runtime_errors.send(error);
    }

    /// Answer given to subsequent `confirm` prompts.
    pub fn set_confirm_answer(&self, answer: bool) {
        self.inner.lock().confirm_answer = answer;
    }

    pub fn set_version(&self, version: &str) {
        self.inner.lock().version = version.to_string();
    }

    pub fn prompts(&self) -> Vec<String> {
        self.inner.lock().prompts.clone()
    }

    pub fn restart_count(&self) -> u32 {
        self.inner.lock().restarts
    }

    pub fn replacement_count(&self, id: &str) -> u32 {
        self.inner.lock().replacements.get(id).copied().unwrap_or(0)
    }

    pub fn reported_errors(&self) -> Vec<RuntimeError> {
        self.inner.lock().reported_errors.clone()
    }

    fn run_handler(&self, handler: &ActivationHandler, depth: u8) {
        let mut inner = self.inner.lock();
        match handler {
            ActivationHandler::InvokeCapability(name) => {
                // Missing capability: the call silently does nothing, like a
                // handler guarding `typeof fn === 'function'`.
                let effect = inner.capabilities.get(name).cloned();
                drop(inner);
                if let Some(effect) = effect {
                    if depth < 4 {
                        self.run_handler(&effect, depth + 1);
                    }
                }
            }
            ActivationHandler::Activate(region) => {
                if let Some(node) = inner.nodes.get_mut(region) {
                    node.active = true;
                }
            }
            ActivationHandler::Deactivate(region) => {
                if let Some(node) = inner.nodes.get_mut(region) {
                    node.active = false;
                }
            }
            ActivationHandler::SetText { region, text } => {
                if let Some(node) = inner.nodes.get_mut(region) {
                    node.content = text.clone();
                }
            }
        }
    }
}

#[async_trait]
impl UiHost for InMemoryHost {
    async fn element(&self, id: &str) -> Option<TargetDescriptor> {
        self.inner.lock().nodes.get(id).map(Node::snapshot)
    }

    async fn is_active(&self, id: &str) -> bool {
        self.inner
            .lock()
            .nodes
            .get(id)
            .map(|n| n.active)
            .unwrap_or(false)
    }

    async fn text_content(&self, id: &str) -> Option<String> {
        self.inner.lock().nodes.get(id).map(|n| n.content.clone())
    }

    async fn replace_element(
        &self,
        id: &str,
        handler: ActivationHandler,
    ) -> Result<(), HostError> {
        let (removed, added) = {
            let mut inner = self.inner.lock();
            let old = inner
                .nodes
                .get(id)
                .cloned()
                .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
            let fresh = Node {
                handler: Some(handler),
                handler_marked: false,
                ..old.clone()
            };
            let added = fresh.snapshot();
            inner.nodes.insert(id.to_string(), fresh);
            *inner.replacements.entry(id.to_string()).or_default() += 1;
            (old.snapshot(), added)
        };
        let _ = self.feeds.structure.send(StructuralChange {
            removed: vec![removed],
            added: vec![added],
        });
        Ok(())
    }

    async fn mark_handler_attached(&self, id: &str) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| HostError::ElementNotFound { id: id.to_string() })?;
        node.handler_marked = true;
        Ok(())
    }

    async fn has_capability(&self, name: &str) -> bool {
        self.inner.lock().capabilities.contains_key(name)
    }

    fn identity(&self) -> String {
        format!(
            "uihealth-memory-host/{} ({})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        )
    }

    async fn app_version(&self) -> Result<String, HostError> {
        Ok(self.inner.lock().version.clone())
    }

    async fn confirm(&self, message: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.prompts.push(message.to_string());
        inner.confirm_answer
    }

    async fn restart(&self) -> Result<(), HostError> {
        self.inner.lock().restarts += 1;
        Ok(())
    }

    async fn report_error(&self, error: &RuntimeError) -> Result<(), HostError> {
        self.inner.lock().reported_errors.push(error.clone());
        Ok(())
    }
}
