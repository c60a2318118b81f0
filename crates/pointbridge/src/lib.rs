// Architecture modules
pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod relay;
pub mod store;
pub mod sync;
pub mod types;

// Public exports
pub use bridge::Bridge;
pub use config::Config;
pub use error::{BridgeError, Result};
pub use mapping::{MappingEntry, MappingTable, PointRecord, load_point_map, parse_point_map};
pub use model::{AttributeHandle, MemoryModel, Model, WriteListener, WriteRequest};
pub use relay::{RelayReport, WriteRelay};
pub use store::{ChangeEvent, ChangeKind, MemoryStore, NotificationSource, RedisStore, Store};
pub use sync::{SyncReport, Synchronizer};
pub use types::{AttributeKey, DoubleBitPos, Fc, PointValue, StoreAddress, TypeKind, Validity};
