//! Keep-alive HTTP endpoint
//!
//! Lets an uptime monitor or hosting platform see that the process is up.
//! Read-only: it reports the pending count and never touches the store.

mod server;

pub use server::start_keep_alive_server;
