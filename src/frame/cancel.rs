//! `CANCEL` carries no body; `Body::Cancel` in `mod.rs` is the frame shape.
//! This module exists only to document that, matching the rest of the
//! one-module-per-frame-type layout.
