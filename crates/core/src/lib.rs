//! Core types, constants, and validation for the Hearth tracking SDK.

pub mod consent;
pub mod error;
pub mod event;
pub mod favourites;
pub mod search;
pub mod session;

pub use consent::*;
pub use error::{Error, Result};
pub use event::*;
pub use favourites::*;
pub use search::*;
pub use session::*;
