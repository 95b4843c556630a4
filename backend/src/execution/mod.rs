pub mod paper;
pub mod venue;
