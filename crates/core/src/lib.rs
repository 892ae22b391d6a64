#![deny(warnings)]

pub mod config;
pub mod duration;
pub mod emotion;
pub mod glyph;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod timeline;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
