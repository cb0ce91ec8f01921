pub mod page_compiler;

pub use page_compiler::{CommandCompiler, PageCompiler};
