//! Services over the entity store.
//!
//! Each service wraps a shared [`Store`](crate::store::Store) and runs every operation inside a
//! single store transaction. Operations take the acting user as an explicit
//! [`Actor`](crate::authorization::Actor) and check input fields before touching the store.

pub mod clinical_records;
pub mod encounters;
pub mod patients;
pub mod users;
