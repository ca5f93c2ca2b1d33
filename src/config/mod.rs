pub mod settings;

pub use settings::{RoleNames, Settings, SWEEP_INTERVAL};
