//! The application root.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_weave_dom::NodeId;

use crate::component::{Rooted, SharedSurface};
use crate::error::Result;
use crate::region::{Displayable, Region};

/// Entry point of an application: the surface body as root, and a main
/// region inside it.
pub struct Application {
    surface: SharedSurface,
    main_region: Region,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("main_region", &self.main_region)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Create an application whose main region is the element matching
    /// `main_region` under the surface body.
    pub fn new(surface: SharedSurface, main_region: impl Into<String>) -> Arc<Self> {
        let selector = main_region.into();
        Arc::new_cyclic(|this: &Weak<Self>| {
            let parent: Weak<dyn Rooted> = this.clone();
            Self {
                surface,
                main_region: Region::from_weak(parent, selector),
            }
        })
    }

    /// The region the application displays its content in.
    pub fn main_region(&self) -> &Region {
        &self.main_region
    }

    /// The surface the application renders into.
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// Display `displayable` in the main region.
    pub async fn show(&self, displayable: impl Into<Displayable>) -> Result<()> {
        self.main_region.show(displayable).await
    }

    /// Remove the application content.
    pub fn remove(&self) -> Result<()> {
        tracing::debug!(target: "horizon_weave::region", "application removed");
        self.main_region.empty()
    }
}

impl Rooted for Application {
    fn el(&self) -> Option<NodeId> {
        Some(self.surface.body())
    }

    fn surface(&self) -> &SharedSurface {
        &self.surface
    }
}
