//! Onboarding configuration document: the nested tree the setup wizard
//! builds, the default record of every branch, profile presets, and the
//! settings file loader.
//!
//! Settings files: `settings.toml` or `settings.json`, kept in the platform
//! data directory unless a path is given explicitly.

pub mod error;
pub mod loader;
pub mod profile;
pub mod schema;
pub mod tree;

pub use {
    error::{Error, Result},
    loader::{data_dir, load_settings, save_settings, write_atomic},
    profile::{Calibration, Profile, ProfileAnswers, ProfileSeed},
    schema::{SearchType, default_record},
    tree::{ConfigNode, ConfigTree, Patch},
};
