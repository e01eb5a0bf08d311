pub mod rating;
pub mod review;

pub use rating::aggregate_rating;
pub use review::ReviewService;
