//! Client-side session: signs in through the gateway, holds the profile
//! snapshot and applies visibility changes.

pub mod controller;
pub mod error;
pub mod profile;
pub mod queries;
pub mod store;
pub mod transport;

pub use controller::{SessionController, SessionOptions, SessionState};
pub use error::{ErrorKind, SessionError};
pub use profile::{JobApplication, Skill, UserProfile, Visibility};
pub use store::{CredentialStore, JsonFileStore, MemoryStore, CREDENTIAL_KEY};
pub use transport::{GatewayTransport, HttpGatewayClient};
