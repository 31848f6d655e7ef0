//! Record store for docpipe
//!
//! Holds schemaless records and the ordered collections they live in, plus
//! the value comparison rules every other subsystem relies on.

mod collection;
mod record;
pub mod value;

pub use collection::{Collection, CollectionError};
pub use record::Record;
