//! Background workers

pub mod pool;
