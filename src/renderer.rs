use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use gpui::{AnyElement, App, SharedString, Window};
use tracing::{debug, warn};

use crate::form::{FieldBinding, FieldValue};

/// Draws a registered field. Receives the field binding and the field's
/// `render_options`.
pub type RegisteredRenderFn =
    Arc<dyn Fn(FieldBinding, &FieldValue, &mut Window, &mut App) -> AnyElement + Send + Sync>;

/// Maps render-type names to renderers for [`crate::form::FieldKind::Registered`]
/// fields.
///
/// Clones share the same table. Registering a name that already exists
/// replaces the previous renderer.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: Arc<RwLock<BTreeMap<SharedString, RegisteredRenderFn>>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry shared by forms that are not handed one.
    pub fn global() -> Self {
        static GLOBAL_REGISTRY: OnceLock<RendererRegistry> = OnceLock::new();
        GLOBAL_REGISTRY.get_or_init(Self::new).clone()
    }

    pub fn register(
        &self,
        render_type: impl Into<SharedString>,
        render: impl Fn(FieldBinding, &FieldValue, &mut Window, &mut App) -> AnyElement
        + Send
        + Sync
        + 'static,
    ) {
        let render_type = render_type.into();
        let mut renderers = self
            .renderers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if renderers
            .insert(render_type.clone(), Arc::new(render))
            .is_some()
        {
            warn!(%render_type, "replacing registered field renderer");
        } else {
            debug!(%render_type, "registered field renderer");
        }
    }

    pub fn unregister(&self, render_type: &str) -> bool {
        self.renderers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(render_type)
            .is_some()
    }

    pub fn lookup(&self, render_type: &str) -> Option<RegisteredRenderFn> {
        let found = self
            .renderers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(render_type)
            .cloned();
        if found.is_none() {
            warn!(render_type, "no renderer registered");
        }
        found
    }

    pub fn contains(&self, render_type: &str) -> bool {
        self.renderers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(render_type)
    }

    pub fn names(&self) -> Vec<SharedString> {
        self.renderers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.renderers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn init(self, cx: &mut App) {
        cx.set_global(RegistryGlobal { registry: self });
    }

    /// The registry installed with [`RendererRegistry::init`], or the
    /// process-wide one.
    pub fn from_app(cx: &App) -> Self {
        cx.try_global::<RegistryGlobal>()
            .map(|global| global.registry.clone())
            .unwrap_or_else(Self::global)
    }
}

struct RegistryGlobal {
    registry: RendererRegistry,
}

impl gpui::Global for RegistryGlobal {}
