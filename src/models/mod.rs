pub mod booking;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use cart::CartItem;
pub use catalog::CatalogItem;
pub use order::{Order, OrderStatus};
pub use user::{Role, User};
