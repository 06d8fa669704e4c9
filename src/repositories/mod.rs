//! # Repository Layer
//!
//! Typed, tenant-aware access to the record store. Every note operation takes the
//! caller's tenant ID, so a record belonging to another tenant is indistinguishable
//! from a missing one.

pub mod note;
pub mod tenant;
pub mod user;

pub use note::{CreateNoteRequest, NoteRepository, UpdateNoteRequest};
pub use tenant::TenantRepository;
pub use user::{CreateUserRequest, UserRepository};
