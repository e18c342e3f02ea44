pub mod line;
pub mod webhook;
