//! Language front ends. Python is the only language review comments are
//! analysed for.

pub mod python;
