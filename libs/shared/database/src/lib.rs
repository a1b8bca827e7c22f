pub mod memory;
pub mod store;
pub mod supabase;
pub mod supabase_store;

pub use memory::MemoryStore;
pub use store::{AppointmentFilter, ClinicStore};
pub use supabase_store::SupabaseStore;
