//! Core rust implementation of popsim, a crate for exact stochastic simulation of population
//! models described as chemical reaction networks.

pub mod configuration;
pub mod expression;
pub mod io;
pub mod network;
pub mod simulate;
