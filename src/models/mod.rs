//! Core data models for publication records and raw source content.

mod publication;
mod raw;

pub use publication::{PublicationBuilder, PublicationList, PublicationRecord};
pub use raw::{AcquisitionResult, RawUnit};
