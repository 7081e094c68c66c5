pub mod builder;
pub mod source;
