//! Error types for loading a manifest and resolving fragment requests.
//!
//! Load-time failures ([`LoadError`] and the [`FormatError`] /
//! [`ConfigurationError`] it wraps) are fatal: the server must not start
//! serving. Request-time failures ([`FragmentError`]) are terminal for a single
//! request and surface as a `404` at the HTTP boundary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// The source document is not an MPD this server can loop.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The root element is missing or is not a DASH `MPD` element.
    #[error("Not an MPD: {0}")]
    NotAManifest(String),

    /// The MPD does not contain exactly one `Period`.
    #[error("Only one period supported, found {0}")]
    PeriodCount(usize),

    /// The XML itself could not be parsed.
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be read or decoded.
    #[error("Malformed attribute on <{element}>: {message}")]
    Attribute {
        /// Element carrying the attribute.
        element: String,
        /// Human-readable error description.
        message: String,
    },
}

/// The manifest parsed, but a representation cannot be served from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Representation {representation_id} has no SegmentTemplate")]
    MissingSegmentTemplate { representation_id: String },

    #[error("Multiple SegmentTemplate elements on {owner}")]
    MultipleSegmentTemplates { owner: String },

    #[error("SegmentTemplate for {representation_id} has no duration (SegmentTimeline is not supported)")]
    MissingSegmentDuration { representation_id: String },

    #[error("SegmentTemplate for {representation_id} has a zero timescale")]
    ZeroTimescale { representation_id: String },

    #[error("Representation without id in adaptation set {adaptation_set_id}")]
    MissingRepresentationId { adaptation_set_id: String },

    #[error("Representation id {representation_id} is declared more than once")]
    DuplicateRepresentation { representation_id: String },

    #[error("AdaptationSet id {adaptation_set_id} is declared more than once")]
    DuplicateAdaptationSet { adaptation_set_id: String },

    #[error("Representation {representation_id} has no fragments in {}", path.display())]
    NoFragments {
        representation_id: String,
        path: PathBuf,
    },

    #[error("Unable to read fragment directory {}: {source}", path.display())]
    FragmentDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything that can stop [`crate::ManifestEngine::load`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Unable to open manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Outcome of a fragment request that cannot be answered with a file.
///
/// The HTTP layer maps every variant to the same empty `404`: players retry
/// after a short delay whatever the cause.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FragmentError {
    #[error("No adaptation set owns representation {representation_id}")]
    NotFound { representation_id: String },

    #[error("Fragment {fragment_number} of {representation_id} is not available yet (at {available_at:?})")]
    NotYetAvailable {
        representation_id: String,
        fragment_number: u64,
        /// `None` when the offset does not fit in a wall-clock instant.
        available_at: Option<DateTime<Utc>>,
    },

    #[error("Invalid fragment token {token:?}")]
    InvalidFragment { token: String },
}

/// Writing the in-memory document back to XML failed.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
