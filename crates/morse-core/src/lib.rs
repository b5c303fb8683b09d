//! # morse-core: Domain Core for the Morseverse API
//!
//! Everything the HTTP layer does beyond request plumbing lives here:
//!
//! - [`artifact`]: content-hash artifact keys and the lookup-or-generate
//!   resolver for generated character images.
//! - [`catalog`]: category listing over object storage and the
//!   deterministic recommendation selector.
//! - [`project`]: per-project coordinate/annotation assembly from the
//!   coordinates document.
//! - [`storage`] / [`documents`]: the collaborator traits for object storage
//!   and the document database.
//! - [`memory`]: in-memory collaborators for development and tests.
//!
//! ## Crate Policy
//!
//! - No HTTP types. Errors are domain errors; the API crate maps them to
//!   status codes.
//! - No `.unwrap()` outside tests.
//! - Collaborators are reached only through [`ObjectStore`] and
//!   [`DocumentStore`].

pub mod artifact;
pub mod catalog;
pub mod documents;
pub mod memory;
pub mod project;
pub mod storage;

pub use artifact::{ArtifactError, ArtifactKey, ArtifactResolver, Gender, Resolution, ResolveRequest};
pub use catalog::{list_catalog, select_recommendations, Catalog, CatalogError, Category, DEFAULT_CATEGORIES};
pub use documents::{Document, DocumentError, DocumentStore};
pub use memory::{MemoryDocumentStore, MemoryObjectStore};
pub use project::{
    assemble, parse_project_list, IdentityUrlFormatter, Project, ProjectError, ProjectList,
    UrlFormatter,
};
pub use storage::{is_image_path, ObjectStore, StorageError, IMAGE_EXTENSIONS};
