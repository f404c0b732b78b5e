pub mod actions;
pub mod config;
pub mod error;
pub mod persistence;
pub mod projection;
pub mod reducer;
pub mod state;

pub use actions::*;
pub use error::*;
pub use reducer::*;
pub use state::*;

pub use persistence::*;
