//! Authorization collaborators

pub mod projects;
