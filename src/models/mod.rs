pub mod sample;
pub mod weather;
