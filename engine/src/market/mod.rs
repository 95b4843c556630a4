pub mod admission;
pub mod quote;
