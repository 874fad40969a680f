pub mod parser;
pub mod types;
pub mod writer;

pub use parser::{BulkView, ReplyReader};
pub use types::{Argument, Reply};
pub use writer::encode_request;
