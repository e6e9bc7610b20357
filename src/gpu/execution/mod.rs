pub mod binding_state;

pub use binding_state::*;
