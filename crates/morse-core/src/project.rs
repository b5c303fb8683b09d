//! # Project Coordinates
//!
//! A single JSON document in storage describes every project: its images and
//! the annotated 3D coordinates placed on each image. [`assemble`] picks one
//! project out of that document and passes every image reference through a
//! [`UrlFormatter`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project {0} not found")]
    NotFound(String),

    #[error("project document is malformed: {0}")]
    Malformed(String),
}

/// Root of the coordinates document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projectName")]
    pub project_name: String,
    pub images: Vec<Image>,
    /// Character image of the project. Stored under the misspelled key.
    #[serde(rename = "charecter", alias = "character")]
    pub character: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub image: String,
    pub coordinates: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub image: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rewrites storage references into client-facing URLs.
pub trait UrlFormatter: Send + Sync + std::fmt::Debug {
    fn format(&self, reference: &str) -> String;
}

/// Returns references unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUrlFormatter;

impl UrlFormatter for IdentityUrlFormatter {
    fn format(&self, reference: &str) -> String {
        reference.to_string()
    }
}

/// Parse the coordinates document.
pub fn parse_project_list(text: &str) -> Result<ProjectList, ProjectError> {
    serde_json::from_str(text).map_err(|e| ProjectError::Malformed(e.to_string()))
}

/// Find `name` (case-insensitively, first match wins) and format its image
/// references.
pub fn assemble(
    list: &ProjectList,
    name: &str,
    formatter: &dyn UrlFormatter,
) -> Result<Project, ProjectError> {
    let wanted = name.to_lowercase();
    let project = list
        .projects
        .iter()
        .find(|p| p.project_name.to_lowercase() == wanted)
        .ok_or_else(|| ProjectError::NotFound(name.to_string()))?;

    let mut project = project.clone();
    for image in &mut project.images {
        image.image = formatter.format(&image.image);
        for coordinate in &mut image.coordinates {
            for reference in &mut coordinate.image {
                *reference = formatter.format(reference);
            }
        }
    }
    Ok(project)
}
