//! DASH manifest data structures (MPD and related types).
//! These are typed records populated by a single parsing pass; everything after
//! load works on them instead of the raw XML tree.

pub mod document;
pub mod parser;

pub use document::Document;
pub use parser::{parse_mpd, ParsedMpd};

/// Lower-case form of the MPD schema namespace. Older manifests spell it
/// `urn:mpeg:DASH:schema:MPD:2011`, so comparisons ignore ASCII case.
pub const DASH_NAMESPACE: &str = "urn:mpeg:dash:schema:mpd:2011";

/// `true` if `uri` names the MPD schema namespace.
pub fn is_dash_namespace(uri: &[u8]) -> bool {
    uri.eq_ignore_ascii_case(DASH_NAMESPACE.as_bytes())
}

/// `MPD@type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationType {
    Static,
    Dynamic,
}

impl PresentationType {
    /// Absent or unknown values fall back to `static`, as in the schema default.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("dynamic") => PresentationType::Dynamic,
            _ => PresentationType::Static,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationType::Static => "static",
            PresentationType::Dynamic => "dynamic",
        }
    }
}

/// Timing and naming metadata of a `SegmentTemplate` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTemplate {
    /// Segment duration in `timescale` units.
    pub duration: Option<u64>,
    /// Units per second. The schema default is 1.
    pub timescale: Option<u64>,
    /// Initialization segment URL template, if any. Only its presence matters here.
    pub initialization: Option<String>,
}

/// A single encoded variant inside an adaptation set.
#[derive(Debug, Clone, Default)]
pub struct Representation {
    pub id: Option<String>,
    pub mime_type: Option<String>,
    /// SegmentTemplate children declared directly on the Representation.
    pub segment_templates: Vec<SegmentTemplate>,
}

/// An adaptation set groups interchangeable representations of one media component.
#[derive(Debug, Clone, Default)]
pub struct AdaptationSet {
    pub id: Option<String>,
    pub mime_type: Option<String>,
    /// SegmentTemplate children declared on the AdaptationSet itself.
    pub segment_templates: Vec<SegmentTemplate>,
    pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, Default)]
pub struct Period {
    /// Raw ISO-8601 `Period@duration`.
    pub duration: Option<String>,
    pub adaptation_sets: Vec<AdaptationSet>,
}

/// Top-level metadata parsed from an MPD file.
#[derive(Debug, Clone)]
pub struct Mpd {
    /// The namespace URI exactly as written in the source document.
    pub namespace: String,
    pub presentation_type: PresentationType,
    /// Raw ISO-8601 `MPD@mediaPresentationDuration`.
    pub media_presentation_duration: Option<String>,
    pub periods: Vec<Period>,
}

/// Parses an ISO-8601 duration (`PT1M30.5S`) into seconds.
pub fn parse_duration(value: &str) -> Option<f64> {
    let iso = iso8601_duration::Duration::parse(value).ok()?;
    iso.to_std().map(|d| d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_matches_either_case() {
        assert!(is_dash_namespace(b"urn:mpeg:dash:schema:mpd:2011"));
        assert!(is_dash_namespace(b"urn:mpeg:DASH:schema:MPD:2011"));
        assert!(!is_dash_namespace(b"urn:mpeg:dash:schema:mpd:2012"));
    }

    #[test]
    fn test_presentation_type_default_is_static() {
        assert_eq!(PresentationType::from_attribute(None), PresentationType::Static);
        assert_eq!(
            PresentationType::from_attribute(Some("dynamic")),
            PresentationType::Dynamic
        );
        assert_eq!(PresentationType::Dynamic.as_str(), "dynamic");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT6S"), Some(6.0));
        assert_eq!(parse_duration("PT1M30S"), Some(90.0));
        assert_eq!(parse_duration("nonsense"), None);
    }
}
