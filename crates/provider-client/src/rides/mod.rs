pub mod client;
pub mod types;

pub use client::{web_link, RideLinkBuilder, RideLinkError};
pub use types::{RideEndpoint, RideLink};
