#![doc = include_str!("../README.md")]

pub mod error;
pub mod inventory;
pub mod normalize;

pub use error::RuntimeError;
pub use inventory::ImageInventory;
pub use normalize::{format_size, normalize_docker, normalize_podman, split_name};
