//! Flexhire gateway: a credential-forwarding GraphQL proxy and the client-side
//! session controller that talks to it.

pub mod graphql;
pub mod modules;
pub mod proxy;
pub mod session;
