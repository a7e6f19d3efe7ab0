pub mod dish;
pub mod order;
pub mod user;
