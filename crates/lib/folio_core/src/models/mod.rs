//! Domain models.

pub mod auth;

pub use auth::{
    Credential, NewUser, ParseEnumError, ProfileUpdate, ResetSession, Status, User, UserType,
};
