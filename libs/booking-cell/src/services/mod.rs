pub mod booking;
pub mod lifecycle;
pub mod session_notes;

pub use booking::BookingService;
pub use session_notes::SessionNoteService;
