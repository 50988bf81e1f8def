pub mod area_codes;
pub mod client;
pub mod error;
pub mod normalize;
mod rate_limit;
pub mod types;

pub use area_codes::{postal_prefix, AreaCodeError, AreaCodeTable};
pub use client::PlacesClient;
pub use error::ScraperError;
pub use normalize::{is_absent_phone, normalize};
pub use types::{PlacesQuery, PlacesResponse};
