//! Integration test crate for vvplay.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every vvplay library crate to verify they work together.

#[cfg(test)]
mod schedule;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod trial;
