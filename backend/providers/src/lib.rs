//! Collaborators behind the chat core: the hosted endpoint client, scripted
//! mocks, and the credential bootstrap loop.

pub mod bootstrap;
pub mod mock;
pub mod qbraid;

pub use bootstrap::{bootstrap, BootstrapOutcome, KeyPrompter, INVALID_KEY_MESSAGE};
pub use mock::{MockCatalog, MockTransport, StreamController};
pub use qbraid::{QbraidClient, API_KEY_HEADER, DEFAULT_API_URL};
