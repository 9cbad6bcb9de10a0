//! State module for tracking download progress
//!
//! # Components
//!
//! - `AssetState`: Tracks the lifecycle of individual assets (pending, downloading, downloaded, failed)

mod asset_state;

pub use asset_state::AssetState;
