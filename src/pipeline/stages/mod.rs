//! Built-in stages, registered under the `builtin` origin

pub mod identity;
pub mod state_nudge;
pub mod value_boost;

pub use identity::Identity;
pub use state_nudge::StateNudge;
pub use value_boost::ValueBoost;

pub const IDENTITY: &str = "identity";
pub const VALUE_BOOST: &str = "value_boost";
pub const STATE_NUDGE: &str = "state_nudge";
