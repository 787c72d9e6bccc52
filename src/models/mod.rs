pub mod user;
pub mod event;
pub mod booking;
pub mod post;
pub mod notification;

pub use user::User;
pub use event::{parse_seat_id, Event, Review};
pub use booking::Booking;
pub use post::{Comment, Post};
pub use notification::Notification;
