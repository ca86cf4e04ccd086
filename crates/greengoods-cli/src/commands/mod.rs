pub mod environment;
pub mod simulate;
