mod mirror;

pub use mirror::SqliteMirror;
