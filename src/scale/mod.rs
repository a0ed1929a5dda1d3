pub mod parser;
pub mod reading;
pub mod service;

pub use parser::{FrameParser, ParsedWeight};
pub use reading::{ReadingOutcome, WeightReading, WeightUnit};
pub use service::ReadingService;
