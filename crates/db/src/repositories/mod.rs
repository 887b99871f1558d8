mod preset_repo;
mod run_repo;

pub use preset_repo::PresetRepo;
pub use run_repo::RunRepo;
