//! Domain adapters. An adapter owns claim and evidence extraction for the
//! sites it recognises; dispatch is a linear scan in registration order with
//! the generic adapter as fallback.

mod generic;
mod legal;
mod wikipedia;

pub use generic::GenericAdapter;
pub use legal::LegalAdapter;
pub use wikipedia::WikipediaAdapter;

use scraper::Html;

use entropia_common::{Claim, Evidence};

pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this adapter should handle the given URL/content type.
    fn can_handle(&self, url: &str, content_type: &str) -> bool;

    /// Must not panic on malformed fragments; worst case is an empty list.
    fn extract_claims(&self, doc: &Html, url: &str) -> Vec<Claim>;

    fn extract_evidence(&self, doc: &Html, url: &str) -> Vec<Evidence>;
}

/// Ordered adapter registry plus the generic fallback.
pub struct Registry {
    adapters: Vec<Box<dyn Adapter>>,
    generic: GenericAdapter,
}

impl Registry {
    /// Registry with the built-in adapters: Wikipedia, Legal, then generic.
    pub fn new() -> Self {
        let mut registry = Registry {
            adapters: Vec::new(),
            generic: GenericAdapter::new(),
        };
        registry.register(Box::new(WikipediaAdapter::new()));
        registry.register(Box::new(LegalAdapter::new()));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    /// First adapter whose `can_handle` accepts, else the generic fallback.
    pub fn find(&self, url: &str, content_type: &str) -> &dyn Adapter {
        for adapter in &self.adapters {
            if adapter.can_handle(url, content_type) {
                return adapter.as_ref();
            }
        }
        &self.generic
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
