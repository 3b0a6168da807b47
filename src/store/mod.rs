//! Collaborator stores fed by match sessions

pub mod profiles;

pub use profiles::{ProfileSink, TracingProfileSink};

#[cfg(test)]
pub use profiles::MemoryProfileSink;
