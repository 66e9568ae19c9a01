//! Accept loop and connection admission.

pub mod listener;
