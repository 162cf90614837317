pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{ChatError, TransportError};
pub use message::{Notification, UiEvent, ERROR_HTML, STOPPED_HTML};
pub use traits::{ByteStream, DisplaySink, ModelCatalog, Transport};
pub use types::{ChatRequest, Credential, Model};
