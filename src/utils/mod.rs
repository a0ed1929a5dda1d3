pub mod error;

pub use error::ScaleError;
