//! vvplay Schedule - which source frame to show at each display tick
//!
//! Schedules are computed eagerly, once per variant activation, and are pure
//! functions of (variant, frame range, seed). This crate provides:
//! - Variant specifications (VariantSpec)
//! - The schedule generator and its stride / delivery-clock algorithms
//! - The experiment catalogs (frame-rate variation, stall, version switch)

pub mod catalog;
pub mod generator;
pub mod schedule;
pub mod variant;

pub use catalog::Catalog;
pub use generator::{ScheduleGenerator, RNG_ALGORITHM};
pub use schedule::{Schedule, TierPlan};
pub use variant::{DipWindow, StallPoint, VariantSpec};
