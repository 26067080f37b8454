pub mod project;
pub mod submittal;
pub mod template;
