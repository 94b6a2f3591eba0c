pub mod backend;
mod bucket;
pub mod error;
mod key;
mod models;

pub use crate::backend::ObjectStore;
pub use crate::bucket::{BucketOptions, find_or_create_bucket};
pub use crate::key::validate as validate_key;
pub use crate::models::{BucketInfo, CannedAcl, ObjectMetadata, RemoteObject, content_hash};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ObjectStore + Send + Sync>;
