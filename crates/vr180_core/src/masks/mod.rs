//! Per-eye blend mask generation.
//!
//! A mask is built from a long static shot in four external stages:
//!
//! ```text
//! raw video ──average──► average.png ──normalize──► normalized.png
//!                                                      │
//!                               alpha.png ◄──stretch───┘
//!                                   │
//!           normalized + alpha ─────┼──► normalized_alpha.png
//!           normalized + !alpha ────┴──► border_alpha.png
//! ```
//!
//! Only the normalized-alpha and border-alpha images are consumed by
//! composition; the others are kept for diagnosis.

mod generator;

pub use generator::{check_mask_dimensions, MaskGenerator};
