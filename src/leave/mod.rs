pub mod directory;
pub mod engine;
pub mod error;
pub mod mysql;
pub mod notify;
pub mod retry;
pub mod seed;
pub mod store;
pub mod token;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub mod testing;
