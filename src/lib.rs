//! Isoterra - an isometric terrain engine core

pub mod core;
pub mod math;
pub mod render;
pub mod terrain;
