//! Resource handlers. Stateless stubs returning canned data; they know
//! nothing about metrics.

pub mod boats;
pub mod cars;
