pub mod sample;
pub mod track;
pub mod measurement;
pub mod statistics;
pub mod display;
