pub mod interaction;
pub mod member;

pub use interaction::handle_component_interaction;
pub use member::{handle_member_add, handle_member_update};
