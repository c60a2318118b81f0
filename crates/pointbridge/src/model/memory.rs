use crate::error::{BridgeError, Result};
use crate::model::{AttributeHandle, Model, WriteListener, WriteRequest};
use crate::types::{AttributeKey, Fc, PointValue, TypeKind};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One entry of the attribute catalogue file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub reference: String,
    pub fc: String,
    #[serde(rename = "type")]
    pub declared_type: String,
}

struct Attribute {
    kind: TypeKind,
    value: Option<PointValue>,
}

/// In-process model holding a flat catalogue of typed attributes
///
/// Stands in for a full model server: values pushed by the bridge are kept
/// and recorded, and `client_write` plays the part of an external client.
pub struct MemoryModel {
    attributes: RwLock<HashMap<AttributeKey, Attribute>>,
    pushes: Mutex<Vec<(AttributeKey, PointValue)>>,
    listener: RwLock<Option<Arc<dyn WriteListener>>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self {
            attributes: RwLock::new(HashMap::new()),
            pushes: Mutex::new(Vec::new()),
            listener: RwLock::new(None),
        }
    }

    pub fn from_specs(specs: &[AttributeSpec]) -> Result<Self> {
        let model = Self::new();
        for spec in specs {
            let fc: Fc = spec.fc.parse().map_err(|e: BridgeError| {
                BridgeError::Config(format!("attribute {}: {}", spec.reference, e))
            })?;
            model.define(
                &spec.reference,
                fc,
                TypeKind::from_declared(&spec.declared_type),
            );
        }
        Ok(model)
    }

    /// Load the attribute catalogue from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("cannot read model file {:?}: {}", path, e))
        })?;
        let specs: Vec<AttributeSpec> = serde_json::from_str(&text).map_err(|e| {
            BridgeError::Config(format!("malformed model file {:?}: {}", path, e))
        })?;

        let model = Self::from_specs(&specs)?;
        info!("Loaded {} model attributes from {:?}", specs.len(), path);
        Ok(model)
    }

    pub fn define(&self, reference: &str, fc: Fc, kind: TypeKind) {
        self.attributes
            .write()
            .insert(AttributeKey::new(reference, fc), Attribute { kind, value: None });
    }

    pub fn set_listener(&self, listener: Arc<dyn WriteListener>) {
        *self.listener.write() = Some(listener);
    }

    pub fn value(&self, reference: &str, fc: Fc) -> Option<PointValue> {
        self.attributes
            .read()
            .get(&AttributeKey::new(reference, fc))
            .and_then(|a| a.value.clone())
    }

    /// Every push received so far, in arrival order
    pub fn pushes(&self) -> Vec<(AttributeKey, PointValue)> {
        self.pushes.lock().clone()
    }

    /// Apply a client write and hand the batch to the write listener
    ///
    /// The whole batch is rejected if any attribute is unknown or the value
    /// does not match its declared type, as a model server would.
    pub fn client_write(&self, writes: Vec<(AttributeKey, PointValue)>) -> Result<()> {
        let mut batch = Vec::with_capacity(writes.len());
        {
            let mut attributes = self.attributes.write();
            for (key, value) in &writes {
                let attribute = attributes.get(key).ok_or_else(|| {
                    BridgeError::Resolution(format!("no attribute {}", key))
                })?;
                let checked = !matches!(attribute.kind, TypeKind::Unsupported(_));
                if checked && attribute.kind != value.kind() {
                    return Err(BridgeError::mismatch(
                        &attribute.kind,
                        format!("client wrote a {} value to {}", value.kind(), key),
                    ));
                }
            }
            for (key, value) in writes {
                if let Some(attribute) = attributes.get_mut(&key) {
                    attribute.value = Some(value.clone());
                    batch.push(WriteRequest {
                        handle: AttributeHandle::new(key, attribute.kind.clone()),
                        value,
                    });
                }
            }
        }

        debug!("Client write touching {} attributes", batch.len());
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.on_write(&batch);
        }
        Ok(())
    }
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for MemoryModel {
    fn resolve_attribute(&self, reference: &str, fc: Fc) -> Option<AttributeHandle> {
        let key = AttributeKey::new(reference, fc);
        let attributes = self.attributes.read();
        attributes
            .get(&key)
            .map(|a| AttributeHandle::new(key, a.kind.clone()))
    }

    fn push_value(&self, handle: &AttributeHandle, value: PointValue) {
        match self.attributes.write().get_mut(handle.key()) {
            Some(attribute) => attribute.value = Some(value.clone()),
            None => {
                warn!("Push to unknown attribute {}", handle.key());
                return;
            }
        }
        self.pushes.lock().push((handle.key().clone(), value));
    }
}
