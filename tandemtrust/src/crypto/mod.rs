// Crypto module declarations

pub mod keys;
pub mod dh;
pub mod mac;
pub mod key_schedule;
