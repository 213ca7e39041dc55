pub mod events;
pub mod orders;
