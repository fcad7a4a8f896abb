pub mod response;

pub use response::{ApiResponse, ErrorDetail};
