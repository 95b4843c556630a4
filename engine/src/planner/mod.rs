pub mod levels;
pub mod types;
