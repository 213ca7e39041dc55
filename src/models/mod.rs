pub mod callback;
pub mod channel;
pub mod event;
pub mod keyboard;
pub mod order;
pub mod payment;
pub mod status;
