// Core infrastructure modules
pub mod core;

// Access-layer modules
pub mod binder;
pub mod config;
pub mod dialect;
pub mod driver;
pub mod facade;
pub mod recognizer;
pub mod registry;
pub mod session;

#[cfg(test)]
pub mod test_utils;
