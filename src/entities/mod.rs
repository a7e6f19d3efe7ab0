pub mod prelude;

pub mod dishes;
pub mod order_dishes;
pub mod orders;
pub mod users;

pub use orders::OrderStatus;
pub use users::Role;
