pub mod domain;
pub mod error;
mod lenient;
pub mod protocol;
