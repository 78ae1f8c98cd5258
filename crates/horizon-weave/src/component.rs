//! Capabilities shared by every component.
//!
//! Components are composed from small capabilities rather than a base type:
//! [`Rooted`] for anything that owns a root node on a surface, and
//! [`Mountable`] for components that can render themselves, adopt a node
//! rendered by someone else, and tear themselves down.

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use horizon_weave_core::{Attachment, EventBus};
use horizon_weave_dom::{DomEvent, DomListenerId, NodeId, RenderSurface};

use crate::error::{Result, WeaveError};

/// The rendering surface components share.
pub type SharedSurface = Arc<dyn RenderSurface>;

/// Payload of component events.
pub type Payload = serde_json::Value;

/// A type-erased, shareable component.
pub type ViewHandle = Arc<dyn Mountable>;

/// Something that owns a root node on a rendering surface.
pub trait Rooted: Send + Sync {
    /// The root node, once rendered or mounted.
    fn el(&self) -> Option<NodeId>;

    /// The surface the root node lives on.
    fn surface(&self) -> &SharedSurface;
}

/// A component that can render, be mounted and be removed.
///
/// This is the object-safe face of [`View`](crate::View) and
/// [`CollectionView`](crate::CollectionView), used wherever components are
/// held without knowing their template.
pub trait Mountable: Rooted {
    /// Render the component and wire its listeners.
    ///
    /// Resolves to the serialized markup of the rendered subtree.
    fn init(&self) -> BoxFuture<'_, Result<String>>;

    /// Adopt `node` as the root and wire listeners, without running the
    /// init hooks.
    fn mount_to(&self, node: NodeId) -> Result<()>;

    /// Run the remove hooks, unwire and drop the root. Does nothing if the
    /// component was never rendered.
    fn remove(&self) -> Result<()>;

    /// The bus component events are published on.
    fn events(&self) -> &EventBus<Payload>;
}

/// A declarative `{selector, event, handler}` triple wiring a surface
/// listener to a component method.
pub struct DomBinding<C> {
    selector: Option<String>,
    event: String,
    handler: fn(&C, &DomEvent),
}

impl<C> Clone for DomBinding<C> {
    fn clone(&self) -> Self {
        Self {
            selector: self.selector.clone(),
            event: self.event.clone(),
            handler: self.handler,
        }
    }
}

impl<C> fmt::Debug for DomBinding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomBinding")
            .field("selector", &self.selector)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> DomBinding<C> {
    /// Listen for `event` on every descendant of the root matching `selector`.
    pub fn new(selector: impl Into<String>, event: impl Into<String>, handler: fn(&C, &DomEvent)) -> Self {
        Self {
            selector: Some(selector.into()),
            event: event.into(),
            handler,
        }
    }

    /// Listen for `event` on the root itself.
    pub fn root(event: impl Into<String>, handler: fn(&C, &DomEvent)) -> Self {
        Self {
            selector: None,
            event: event.into(),
            handler,
        }
    }

    /// The selector, or `None` for the root.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// The interaction name.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Add listeners for the nodes matching this binding under `root`.
    ///
    /// Nodes added under `root` later are not wired.
    fn attach(&self, surface: &dyn RenderSurface, root: NodeId, component: &Weak<C>, wiring: &mut Wiring) -> Result<()> {
        let targets = match &self.selector {
            None => vec![root],
            Some(selector) => surface.query_selector_all(root, selector)?,
        };
        for target in targets {
            let component = component.clone();
            let handler = self.handler;
            let id = surface.add_listener(
                target,
                &self.event,
                Arc::new(move |event: &DomEvent| {
                    if let Some(component) = component.upgrade() {
                        handler(&component, event);
                    }
                }),
            )?;
            wiring.listeners.push(id);
        }
        Ok(())
    }
}

/// Listeners and bus registrations a component made while mounted.
#[derive(Debug, Default)]
pub(crate) struct Wiring {
    listeners: Vec<DomListenerId>,
    attachments: Vec<Attachment>,
}

impl Wiring {
    /// Wire every binding under `root`. On failure the listeners added so far
    /// are kept, so a later teardown still removes them.
    pub(crate) fn bind<C: Send + Sync + 'static>(
        &mut self,
        bindings: &[DomBinding<C>],
        surface: &dyn RenderSurface,
        root: NodeId,
        component: &Weak<C>,
    ) -> Result<()> {
        for binding in bindings {
            binding.attach(surface, root, component, self)?;
        }
        Ok(())
    }

    pub(crate) fn hold(&mut self, attachments: impl IntoIterator<Item = Attachment>) {
        self.attachments.extend(attachments);
    }

    pub(crate) fn teardown(self, surface: &dyn RenderSurface) {
        for listener in self.listeners {
            surface.remove_listener(listener);
        }
        for attachment in self.attachments {
            attachment.detach();
        }
    }
}

/// Parse `markup` and keep its first element as a detached root.
///
/// Any other top-level node is released. Markup without an element violates
/// the `html` contract of `C`.
pub(crate) fn create_root<C: ?Sized>(surface: &dyn RenderSurface, markup: &str) -> Result<NodeId> {
    let mut root = None;
    for node in surface.parse_fragment(markup)? {
        if root.is_none() && surface.tag_name(node)?.is_some() {
            root = Some(node);
        } else {
            surface.release(node)?;
        }
    }
    root.ok_or_else(|| {
        let err = WeaveError::contract::<C>("html");
        tracing::warn!(target: "horizon_weave::view", error = %err, "markup has no root element");
        err
    })
}

/// Drop `root` from the surface unless an ancestor release already did.
pub(crate) fn release_root(surface: &dyn RenderSurface, root: NodeId) -> Result<()> {
    if surface.contains(root) {
        surface.release(root)?;
    }
    Ok(())
}

/// Returns true if two handles point at the same component.
pub(crate) fn same_component<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
