pub mod doctor;
pub mod profile;
pub mod statistics;

pub use doctor::DoctorService;
pub use profile::ProfileService;
pub use statistics::compute_statistics;
