//! Integration tests for the HELIO-RS crates.
//!
//! End-to-end scenarios that cross crate boundaries: transform chains that
//! carry metadata through FITS round trips, spill-and-reload through the
//! image runtime, and the documented seed scenarios of the pipeline.
