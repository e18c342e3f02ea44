pub mod clock;
pub mod types;
