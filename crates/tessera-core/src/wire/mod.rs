//! Wire codecs for the two client surfaces
//!
//! Both decode paths lower their input into [`crate::coerce::WireValue`] so the
//! column type rules are shared.

pub mod json;
pub mod rpc;
