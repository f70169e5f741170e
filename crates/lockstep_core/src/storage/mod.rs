//! Modality stores: enumeration, background prefetch, caching and reads.
//!
//! - [`ModalityStore`] owns the ordered basenames of one modality and a
//!   cache filled by a single prefetch thread
//! - [`FrameSource`] is the type-erased face of a store used by the
//!   scheduler to fill a [`DataBag`](crate::data_bag::DataBag)
//! - [`readers`] holds the reference parsers for KITTI-style data

mod enumerate;
mod errors;
pub mod readers;
mod source;
mod store;

pub use enumerate::{embedded_number, enumerate, sort_basenames};
pub use errors::{StoreError, StoreResult};
pub use source::{open_source, BagEntry, FrameSource};
pub use store::{ModalityStore, RecordParser, StoreOptions};
