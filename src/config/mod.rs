pub mod preamble;

pub use preamble::SystemPreamble;
