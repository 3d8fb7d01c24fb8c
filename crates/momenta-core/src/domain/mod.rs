pub mod calendar;
pub mod models;
pub mod symbol;

pub use models::{Bar, Universe};
pub use symbol::Symbol;
