pub mod client;
pub mod contracts;
pub mod controller;
pub mod executor;

pub use client::*;
pub use contracts::*;
pub use controller::*;
pub use executor::*;
