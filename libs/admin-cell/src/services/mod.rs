pub mod admin;
pub mod revenue;

pub use admin::AdminService;
pub use revenue::revenue_totals;
