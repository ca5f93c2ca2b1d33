pub mod general;
pub mod verification;

pub use general::{hello, help, info, ping};
pub use verification::{pending_kicks, setup_verify};
