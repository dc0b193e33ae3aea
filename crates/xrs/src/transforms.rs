//! 🔄 Transforms — what happens to a radiograph between "fetched" and "written".
//!
//! 🎬 COLD OPEN — INT. READING ROOM — 2:47 AM
//!
//! The film went up on the lightbox sideways. Again. Half of it was black, the other half was
//! a wrist that someone had photographed from a respectful distance. The resident sighed,
//! rotated it, squinted, and threw it in the "nope" pile. This module is that resident,
//! minus the coffee.
//!
//! ## The two transforms 🧠
//!
//! ```text
//!   RasterImage ──▶ normalize::preprocess ──▶ Accepted(400x512) | Rejected(reason)
//!   RasterImage ──▶ gaussian::augment     ──▶ (name_blured.ext, blurred)
//! ```
//!
//! - Both are pure: no store, no clock, no RNG. Same pixels in, same pixels out.
//! - Naming that depends only on the image lives here (`augmented_name`). Naming that depends
//!   on the batch (the gap-free counter) lives with the batch loop in `pipelines`.

pub mod gaussian;
pub mod normalize;

pub use gaussian::{augment, augmented_name};
pub use normalize::{NormalizeOutcome, RejectReason, preprocess};
