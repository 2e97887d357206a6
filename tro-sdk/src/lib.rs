//! Wire objects, callback signature scheme and HTTP client for the
//! ticket reservation & ordering service.

pub mod client;
pub mod objects;
pub mod signature;
