//! rpgen: procedural content for tabletop role-playing games.
//!
//! Rolls on weighted random tables organised in a category tree, invents
//! pronounceable names from a frequency corpus, fills name templates and
//! generates whole settlements from those pieces.

pub mod core;
pub mod io;
pub mod schema;
