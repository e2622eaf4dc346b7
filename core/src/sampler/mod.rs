//! Sampler enumerations.
//!
//! Provides [`TextureFilter`] and [`AddressMode`], shared between the resource
//! front-ends and every backend's sampler translation.

mod types;

pub use types::{AddressMode, TextureFilter};
