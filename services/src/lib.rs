//! Small helpers shared by the HTTP layer and the binary.

pub mod ids;

pub use ids::{stable_doc_id, stable_uuid};
