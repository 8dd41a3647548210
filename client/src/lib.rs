//! Client-side session state of the medicine catalog.
//!
//! [`Store`] keeps track of whether the current visitor is authenticated,
//! talking to the server through an [`Api`], while [`Guard`] turns that state
//! into navigation decisions.

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod clock;
pub mod guard;
pub mod state;
pub mod store;

pub use self::{
    api::{Api, ApiError, Http, User},
    clock::{Clock, SystemClock},
    guard::Guard,
    state::{Snapshot, State, Status},
    store::Store,
};
