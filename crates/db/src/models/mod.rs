pub mod preset;
pub mod run;
pub mod status;
