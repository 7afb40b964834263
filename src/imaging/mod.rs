//! Codec service, pure Rust and statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Metadata** | `image::ImageReader` (format sniffing) / `avif-parse` for AVIF |
//! | **Decode** | `image` decoders / `avif-parse` + `rav1d` for AVIF |
//! | **Resize → file** | Lanczos3 + JPEG / PNG / WebP / AVIF / TIFF encoders |
//! | **Resize → buffer** | same, into memory (placeholder previews) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing codec operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

mod avif_decode;
pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{calculate_derivative_widths, capped_widths, scaled_height};
pub use params::{EncodedImage, Quality, ResizeParams};
pub use rust_backend::RustBackend;
