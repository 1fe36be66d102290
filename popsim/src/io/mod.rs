//! File output for simulated maps.

pub mod npy;
