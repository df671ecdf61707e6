//! The rendering engine proper: input normalization, layout, raster and
//! vector output, the query-string codec and preview bookkeeping. Nothing in
//! here knows about HTTP.

pub mod clipboard;
pub mod codec;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod renderer;
pub mod session;
pub mod spec;
