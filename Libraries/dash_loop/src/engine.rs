// Libraries/dash_loop/src/engine.rs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, instrument, warn};

use crate::availability::{available_at, is_available};
use crate::error::{ConfigurationError, FormatError, FragmentError, LoadError, SerializeError};
use crate::mpd::{parse_duration, parse_mpd, Document, Mpd, PresentationType};
use crate::probe::count_fragments;
use crate::registry::AdaptationSetRegistry;
use crate::resolver::{FragmentRef, RepresentationResolver};
use crate::template::TemplateInfo;

/// The looped manifest: loaded and converted to live once, read-only afterwards.
///
/// All methods take `&self`, so a loaded engine can be shared behind an `Arc`
/// by any number of request handlers without locking.
#[derive(Debug)]
pub struct ManifestEngine {
    document: Document,
    registry: AdaptationSetRegistry,
    mime_types: HashMap<String, String>,
    start_time: DateTime<Utc>,
}

impl ManifestEngine {
    /// Loads the MPD at `path`, probing `base_dir/<representation id>` for fragments,
    /// and starts the stream clock now.
    pub fn load(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml(&xml, base_dir.as_ref(), Utc::now)
    }

    /// Builds an engine from MPD text. The stream clock is read from `clock`
    /// once, after every representation has been probed.
    #[instrument(skip_all, fields(base_dir = ?base_dir))]
    pub fn from_xml(
        xml: &str,
        base_dir: &Path,
        clock: impl FnOnce() -> DateTime<Utc>,
    ) -> Result<Self, LoadError> {
        let parsed = parse_mpd(xml)?;
        let mpd = parsed.mpd;
        let mut document = parsed.document;

        if mpd.periods.len() != 1 {
            return Err(FormatError::PeriodCount(mpd.periods.len()).into());
        }
        if mpd.presentation_type == PresentationType::Dynamic {
            warn!("Source MPD is already dynamic, its live timing is replaced");
        }

        let (registry, mime_types) = build_registry(&mpd, base_dir)?;
        check_loop_lengths(&mpd, &registry);

        let start_time = clock();
        make_live(&mut document, start_time)?;

        info!(
            "Loaded MPD with adaptation sets {:?}, stream started at {}",
            registry.all_adaptation_set_ids(),
            format_start_time(start_time)
        );

        Ok(Self {
            document,
            registry,
            mime_types,
            start_time,
        })
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn registry(&self) -> &AdaptationSetRegistry {
        &self.registry
    }

    /// Media type declared for a representation (or inherited from its adaptation set).
    pub fn mime_type(&self, representation_id: &str) -> Option<&str> {
        self.mime_types.get(representation_id).map(String::as_str)
    }

    /// The live manifest as XML, with the MPD namespace as the default namespace.
    pub fn serialize(&self) -> Result<Bytes, SerializeError> {
        self.document.to_bytes()
    }

    /// Resolves a fragment request against the current wall clock.
    pub fn resolve_fragment(&self, representation_id: &str, token: &str) -> Result<String, FragmentError> {
        self.resolve_fragment_at(representation_id, token, Utc::now())
    }

    /// Resolves a fragment request as if the wall clock read `now`.
    ///
    /// Returns the path `<representation id>/<file name>` relative to the base
    /// directory.
    pub fn resolve_fragment_at(
        &self,
        representation_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, FragmentError> {
        let resolver = self
            .registry
            .find_resolver_for_representation(representation_id)
            .ok_or_else(|| FragmentError::NotFound {
                representation_id: representation_id.to_string(),
            })?;

        let fragment = resolver.resolve(representation_id, token)?;

        // Passthrough names (init segments and the like) are not on the
        // timeline and are served whatever the clock says.
        if let FragmentRef::Physical {
            fragment_number,
            presentation_time,
            ..
        } = fragment
        {
            if !is_available(self.start_time, presentation_time, now) {
                return Err(FragmentError::NotYetAvailable {
                    representation_id: representation_id.to_string(),
                    fragment_number,
                    available_at: available_at(self.start_time, presentation_time),
                });
            }
        }

        Ok(format!("{}/{}", representation_id, fragment.file_name()))
    }
}

fn build_registry(
    mpd: &Mpd,
    base_dir: &Path,
) -> Result<(AdaptationSetRegistry, HashMap<String, String>), ConfigurationError> {
    let mut registry = AdaptationSetRegistry::new();
    let mut mime_types = HashMap::new();

    for (position, adaptation_set) in mpd.periods[0].adaptation_sets.iter().enumerate() {
        // Only used in diagnostics; a set without `id` is registered unnamed.
        let adaptation_set_id = adaptation_set
            .id
            .clone()
            .unwrap_or_else(|| format!("#{}", position));
        let mut resolver = RepresentationResolver::new();

        for representation in &adaptation_set.representations {
            let representation_id =
                representation
                    .id
                    .as_deref()
                    .ok_or_else(|| ConfigurationError::MissingRepresentationId {
                        adaptation_set_id: adaptation_set_id.clone(),
                    })?;

            let template = TemplateInfo::for_representation(
                adaptation_set,
                &adaptation_set_id,
                representation,
                representation_id,
            )?;
            let fragment_count = count_fragments(
                &base_dir.join(representation_id),
                representation_id,
                template.has_initialization_segment(),
            )?;
            resolver.register(
                representation_id,
                fragment_count,
                template.segment_duration_seconds(),
            )?;

            if let Some(mime) = representation
                .mime_type
                .as_ref()
                .or(adaptation_set.mime_type.as_ref())
            {
                mime_types.insert(representation_id.to_string(), mime.clone());
            }

            debug!(
                "Representation {} in {}: {} fragments of {}s",
                representation_id,
                adaptation_set_id,
                fragment_count,
                template.segment_duration_seconds()
            );
        }

        registry.register_adaptation_set(adaptation_set.id.as_deref(), resolver)?;
    }

    Ok((registry, mime_types))
}

/// Warns when a representation's stored fragments do not add up to the
/// declared presentation duration; the loop still plays, it just drifts
/// against the original content length. Returns the drifting representations.
///
/// `MPD@mediaPresentationDuration` is compared against, or `Period@duration`
/// when the former is absent.
fn check_loop_lengths(mpd: &Mpd, registry: &AdaptationSetRegistry) -> Vec<String> {
    let declared = mpd
        .media_presentation_duration
        .as_deref()
        .or_else(|| mpd.periods.first().and_then(|p| p.duration.as_deref()))
        .and_then(parse_duration);
    let Some(declared) = declared else {
        return Vec::new();
    };

    let mut drifting = Vec::new();
    for resolver in registry.resolvers() {
        for repr_id in resolver.representation_ids() {
            let (Some(count), Some(duration)) =
                (resolver.fragment_count(repr_id), resolver.segment_duration(repr_id))
            else {
                continue;
            };
            let loop_length = count as f64 * duration;
            if (loop_length - declared).abs() > duration {
                warn!(
                    "Representation {} loops every {}s but the MPD declares {}s",
                    repr_id, loop_length, declared
                );
                drifting.push(repr_id.to_string());
            }
        }
    }
    drifting
}

/// Turns the static document into a dynamic one that started at `start_time`.
fn make_live(document: &mut Document, start_time: DateTime<Utc>) -> Result<(), FormatError> {
    document.set_root_attribute("type", PresentationType::Dynamic.as_str())?;
    document.remove_root_attribute("mediaPresentationDuration")?;
    document.remove_root_attribute("minimumUpdatePeriod")?;
    document.set_root_attribute("availabilityStartTime", &format_start_time(start_time))?;
    document.remove_period_attribute("duration")?;
    Ok(())
}

fn format_start_time(start_time: DateTime<Utc>) -> String {
    start_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
