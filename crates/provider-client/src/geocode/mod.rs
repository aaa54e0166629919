pub mod client;
pub mod types;

pub use client::{haversine_km, GeocodeClient, GeocodeError};
pub use types::{GeocodedAddress, ReverseAddress};
