pub mod memory;

pub use memory::{AttributeSpec, MemoryModel};

use crate::types::{AttributeKey, Fc, PointValue, TypeKind};

/// Opaque reference to one typed attribute of the model
///
/// Resolved once while the mapping table is built. The declared type is
/// captured here and never re-read from the model afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeHandle {
    key: AttributeKey,
    kind: TypeKind,
}

impl AttributeHandle {
    pub fn new(key: AttributeKey, kind: TypeKind) -> Self {
        Self { key, kind }
    }

    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    pub fn reference(&self) -> &str {
        &self.key.reference
    }

    pub fn fc(&self) -> Fc {
        self.key.fc
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }
}

/// One attribute touched by an external client write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub handle: AttributeHandle,
    pub value: PointValue,
}

/// Hierarchical data-point model the bridge feeds
///
/// The bridge never owns the model's lifecycle:
/// - lookups happen only while the mapping table is built
/// - pushes are fire-and-forget, the model reports nothing back
pub trait Model: Send + Sync {
    /// Find the attribute at `reference` with functional constraint `fc`
    fn resolve_attribute(&self, reference: &str, fc: Fc) -> Option<AttributeHandle>;

    /// Replace the current value of an attribute
    fn push_value(&self, handle: &AttributeHandle, value: PointValue);
}

/// Receiver of write requests raised by the model
///
/// Called on the model's write path; must finish processing the whole batch
/// before returning. Nothing is reported back to the writer.
pub trait WriteListener: Send + Sync {
    fn on_write(&self, batch: &[WriteRequest]);
}
