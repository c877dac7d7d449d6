pub use crate::result::AirbrakeResult;
