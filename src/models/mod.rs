pub mod failure;
pub mod job;

pub use failure::{FailureSet, JobFailure};
pub use job::{make_java_identifier, CompilationJob};
