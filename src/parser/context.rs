//! Holder for the "current configuration"
//!
//! Entry points own a [`ConfigContext`] and pass it to whatever needs the
//! parsed configuration. The process-wide functions at the bottom exist for
//! call sites that cannot receive the context explicitly.

use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

use crate::namespace::Namespace;

/// Empty until [`install`](Self::install) is called; each install replaces
/// the previous configuration.
#[derive(Debug, Default, Clone)]
pub struct ConfigContext {
    current: Option<Arc<Namespace>>,
}

impl ConfigContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, namespace: Namespace) -> Arc<Namespace> {
        let shared = Arc::new(namespace);
        self.current = Some(Arc::clone(&shared));
        shared
    }

    pub fn current(&self) -> Option<Arc<Namespace>> {
        self.current.clone()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

static GLOBAL: Lazy<RwLock<ConfigContext>> = Lazy::new(|| RwLock::new(ConfigContext::new()));

/// Compatibility shim: configuration stored by the last parser run with
/// `store_config` enabled, if any.
pub fn get_config() -> Option<Arc<Namespace>> {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner).current()
}

pub fn reset_config() {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner).reset();
}

pub(crate) fn store_config(namespace: Namespace) -> Arc<Namespace> {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner).install(namespace)
}
