//! Mod unit discovery and asset walking

pub mod archive;
pub mod asset_walker;
pub mod marker;
pub mod mod_units;

pub use asset_walker::{AssetRef, EntryAsset, FileAsset};
pub use mod_units::{enumerate_units, ModUnit, UnitKind};
