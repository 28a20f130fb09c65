pub mod builder;
pub mod filter;

pub use builder::ListQuery;
pub use filter::{FilterSpec, ListParams, ListingError};
