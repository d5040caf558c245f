//! Module for reading simulation descriptions and writing trajectories
pub mod json;
