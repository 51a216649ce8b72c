//! Request and response messages.

mod request;
mod response;

pub use request::RequestMessage;
pub use response::{ResponseMessage, ResponseMessageBuilder, ResponseStatus};
