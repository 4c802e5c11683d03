//! Custom request extractors.

mod actor;
mod validated_json;

pub use actor::Actor;
pub use validated_json::ValidatedJson;
