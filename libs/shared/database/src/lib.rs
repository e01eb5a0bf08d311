pub mod embed;
pub mod supabase;

pub use supabase::{encode, is_unique_violation, ApiError, Page, SupabaseClient};
