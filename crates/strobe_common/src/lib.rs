//! Shared foundational types used across the Strobe verification harness.
//!
//! This crate provides the 4-state logic values that every simulated signal
//! carries, and packed logic vectors with byte-lane conversion for bus words.

#![warn(missing_docs)]

pub mod logic;
pub mod logic_vec;

pub use logic::Logic;
pub use logic_vec::LogicVec;
