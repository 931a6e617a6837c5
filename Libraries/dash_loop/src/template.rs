//! Per-representation timing read from `SegmentTemplate` elements.

use crate::error::ConfigurationError;
use crate::mpd::{AdaptationSet, Representation, SegmentTemplate};

/// The resolved template that applies to one representation.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInfo {
    duration: u64,
    timescale: u64,
    has_initialization: bool,
}

impl TemplateInfo {
    /// Locates the template for `representation`: its own `SegmentTemplate`
    /// child if present, otherwise the one declared on `adaptation_set`.
    /// Either level may declare at most one.
    pub fn for_representation(
        adaptation_set: &AdaptationSet,
        adaptation_set_id: &str,
        representation: &Representation,
        representation_id: &str,
    ) -> Result<Self, ConfigurationError> {
        let template = match single(&representation.segment_templates, representation_id)? {
            Some(template) => template,
            None => single(&adaptation_set.segment_templates, adaptation_set_id)?.ok_or_else(
                || ConfigurationError::MissingSegmentTemplate {
                    representation_id: representation_id.to_string(),
                },
            )?,
        };
        Self::from_template(template, representation_id)
    }

    pub fn from_template(
        template: &SegmentTemplate,
        representation_id: &str,
    ) -> Result<Self, ConfigurationError> {
        let duration = template
            .duration
            .ok_or_else(|| ConfigurationError::MissingSegmentDuration {
                representation_id: representation_id.to_string(),
            })?;
        let timescale = template.timescale.unwrap_or(1);
        if timescale == 0 {
            return Err(ConfigurationError::ZeroTimescale {
                representation_id: representation_id.to_string(),
            });
        }

        Ok(Self {
            duration,
            timescale,
            has_initialization: template.initialization.is_some(),
        })
    }

    /// `duration / timescale`.
    pub fn segment_duration_seconds(&self) -> f64 {
        self.duration as f64 / self.timescale as f64
    }

    /// True iff the template carries an `initialization` attribute, whatever its value.
    pub fn has_initialization_segment(&self) -> bool {
        self.has_initialization
    }
}

fn single<'a>(
    templates: &'a [SegmentTemplate],
    owner: &str,
) -> Result<Option<&'a SegmentTemplate>, ConfigurationError> {
    match templates {
        [] => Ok(None),
        [template] => Ok(Some(template)),
        _ => Err(ConfigurationError::MultipleSegmentTemplates {
            owner: owner.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(duration: Option<u64>, timescale: Option<u64>, init: Option<&str>) -> SegmentTemplate {
        SegmentTemplate {
            duration,
            timescale,
            initialization: init.map(str::to_string),
        }
    }

    #[test]
    fn test_segment_duration_seconds() {
        let info = TemplateInfo::from_template(&template(Some(96000), Some(48000), None), "a").unwrap();
        assert_eq!(info.segment_duration_seconds(), 2.0);
        assert!(!info.has_initialization_segment());
    }

    #[test]
    fn test_timescale_defaults_to_one() {
        let info = TemplateInfo::from_template(&template(Some(4), None, Some("")), "a").unwrap();
        assert_eq!(info.segment_duration_seconds(), 4.0);
        // An empty initialization attribute still counts.
        assert!(info.has_initialization_segment());
    }

    #[test]
    fn test_missing_duration() {
        let err = TemplateInfo::from_template(&template(None, Some(1), None), "v0").unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingSegmentDuration { .. }));
    }

    #[test]
    fn test_zero_timescale() {
        let err = TemplateInfo::from_template(&template(Some(2), Some(0), None), "v0").unwrap_err();
        assert!(matches!(err, ConfigurationError::ZeroTimescale { .. }));
    }

    #[test]
    fn test_representation_template_overrides_adaptation_set() {
        let adaptation = AdaptationSet {
            segment_templates: vec![template(Some(2), Some(1), None)],
            ..Default::default()
        };
        let own = Representation {
            segment_templates: vec![template(Some(8), Some(2), Some("init"))],
            ..Default::default()
        };
        let inherited = Representation::default();

        let info = TemplateInfo::for_representation(&adaptation, "video", &own, "v0").unwrap();
        assert_eq!(info.segment_duration_seconds(), 4.0);
        assert!(info.has_initialization_segment());

        let info = TemplateInfo::for_representation(&adaptation, "video", &inherited, "v1").unwrap();
        assert_eq!(info.segment_duration_seconds(), 2.0);
    }

    #[test]
    fn test_missing_template() {
        let err = TemplateInfo::for_representation(
            &AdaptationSet::default(),
            "video",
            &Representation::default(),
            "v0",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingSegmentTemplate { .. }));
    }

    #[test]
    fn test_multiple_templates_rejected() {
        let adaptation = AdaptationSet {
            segment_templates: vec![template(Some(2), None, None), template(Some(4), None, None)],
            ..Default::default()
        };
        let err = TemplateInfo::for_representation(&adaptation, "video", &Representation::default(), "v0")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MultipleSegmentTemplates { .. }));
    }
}
