//! # utils
//!
//! utilities

pub mod fmt;
pub mod path;
pub mod smb;
