//! # Tessera Core
//!
//! Backend-independent value types shared by the Tessera graphics crates:
//! pixel formats, colors, sizes and sampler enumerations.

pub mod color;
pub mod math;
pub mod sampler;
pub mod texture;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Tessera Core v{} initialized", VERSION);
}
