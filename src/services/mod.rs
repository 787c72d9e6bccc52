pub mod booking;
pub mod locks;
pub mod notify;
pub mod recommender;
pub mod ticket;
