pub mod format;
pub mod mhz19;
