pub mod contract;
pub mod rating;
pub mod recommendation;
