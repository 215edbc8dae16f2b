//! Bumper Project Model
//!
//! Defines the core data contracts for a render batch:
//! - **Events:** Talk records and reserved jobs (pause/outro/bgloop)
//! - **Filter:** Id and room restrictions applied before admission
//! - **Project:** Asset layout of a project folder and delivery paths
//!
//! Events are read-only once constructed; every later stage borrows them.

pub mod event;
pub mod filter;
pub mod project;

pub use event::*;
pub use filter::*;
pub use project::*;
