pub mod change;
pub mod element;
pub mod record;
pub mod revision;
pub mod snapshot;
pub mod value;
pub mod write;

pub use change::{CollectionChange, EntityChange};
pub use element::{Composite, Element, EntityId, EntityRef};
pub use record::ElementRecord;
pub use revision::{Revision, RevisionType};
pub use snapshot::{ChangedElement, CollectionSnapshot, SnapshotShape};
pub use value::{DataMap, Value};
pub use write::WriteOp;
