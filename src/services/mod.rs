pub mod identity;
pub mod sessions;
