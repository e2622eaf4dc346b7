//! CPU-side texture types.
//!
//! Provides [`PixelFormat`] and [`ChannelType`], describing the byte layout of
//! texel data handed to the graphics crate by asset loaders.

mod types;

pub use types::{ChannelType, PixelFormat};
