pub mod pending_store;

pub use pending_store::{PendingStore, PendingVerification};
