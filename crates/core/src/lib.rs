//! Domain types and pure logic shared by every Wardrobe crate.
//!
//! Nothing in here performs I/O. The collaborator traits in [`store`]
//! describe the persistence and object-storage seams the pipeline calls
//! into; concrete implementations live in `wardrobe-db` and
//! `wardrobe-storage`.

pub mod error;
pub mod naming;
pub mod outputs;
pub mod preset;
pub mod progress;
pub mod run;
pub mod store;
pub mod types;
pub mod validation;
