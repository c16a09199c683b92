pub mod addr;
pub mod cache;
pub mod config;
pub mod memory;
pub mod store;
pub mod trace;
pub mod word;

mod lru;
#[cfg(feature = "stat")]
pub mod stat;
