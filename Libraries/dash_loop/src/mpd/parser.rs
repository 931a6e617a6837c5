use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use quick_xml::NsReader;

use crate::error::FormatError;
use crate::mpd::{
    is_dash_namespace, AdaptationSet, Document, Mpd, Period, PresentationType, Representation,
    SegmentTemplate,
};

/// Result of parsing: the typed records plus the normalised event document they came from.
#[derive(Debug, Clone)]
pub struct ParsedMpd {
    pub mpd: Mpd,
    pub document: Document,
}

/// Element kinds we track while walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Mpd,
    Period,
    AdaptationSet,
    Representation,
    Other,
}

/// Parses an MPD document.
///
/// Fails with [`FormatError::NotAManifest`] when the root element is not an
/// `MPD` in the DASH namespace. The period count is not checked here; callers
/// decide how many periods they accept.
pub fn parse_mpd(xml: &str) -> Result<ParsedMpd, FormatError> {
    let mut reader = NsReader::from_str(xml);

    let mut events: Vec<Event<'static>> = Vec::new();
    let mut stack: Vec<Kind> = Vec::new();
    // Default namespace in scope in the *output* document, per open element.
    let mut defaults: Vec<String> = Vec::new();
    let mut root: Option<usize> = None;
    let mut period_events = Vec::new();
    let mut mpd: Option<Mpd> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let (is_dash, resolved_uri) = match resolved {
            ResolveResult::Bound(Namespace(uri)) => (
                is_dash_namespace(uri),
                Some(String::from_utf8_lossy(uri).into_owned()),
            ),
            _ => (false, None),
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if root.is_none() {
                    let Some(uri) = resolved_uri.as_deref().filter(|_| is_dash && local == "MPD") else {
                        return Err(FormatError::NotAManifest(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    };
                    root = Some(events.len());
                    let attrs = read_attributes(e)?;
                    mpd = Some(Mpd {
                        namespace: uri.to_string(),
                        presentation_type: PresentationType::from_attribute(
                            attrs.get("type").map(String::as_str),
                        ),
                        media_presentation_duration: attrs.get("mediaPresentationDuration").cloned(),
                        periods: Vec::new(),
                    });
                }

                let in_scope = defaults.last().map(String::as_str).unwrap_or_default();
                let kind = if is_dash {
                    let parent = stack.last().copied();
                    let kind = classify(&local, parent);
                    if let Some(mpd) = mpd.as_mut() {
                        record(mpd, kind, &local, parent, e)?;
                    }
                    if kind == Kind::Period {
                        period_events.push(events.len());
                    }
                    kind
                } else {
                    Kind::Other
                };

                // DASH elements are written unprefixed in the source's DASH
                // namespace. Unprefixed foreign elements keep the namespace
                // they resolved to, which may now need its own declaration.
                let wanted = if is_dash {
                    mpd.as_ref().map(|m| m.namespace.clone())
                } else if e.name().prefix().is_none() {
                    Some(resolved_uri.unwrap_or_default())
                } else {
                    None
                };
                let declare = wanted.as_deref().filter(|uri| *uri != in_scope);
                let name = if is_dash {
                    local.as_str()
                } else {
                    std::str::from_utf8(e.name().into_inner()).map_err(|err| FormatError::Attribute {
                        element: local.clone(),
                        message: err.to_string(),
                    })?
                };

                if !is_dash && declare.is_none() && !declares_default_namespace(e) {
                    events.push(event.clone().into_owned());
                } else {
                    let normalised = normalise_start(e, name, declare)?;
                    events.push(if is_empty {
                        Event::Empty(normalised)
                    } else {
                        Event::Start(normalised)
                    });
                }

                if !is_empty {
                    let scope = wanted.unwrap_or_else(|| in_scope.to_string());
                    stack.push(kind);
                    defaults.push(scope);
                }
            }
            Event::End(ref e) => {
                stack.pop();
                defaults.pop();
                if is_dash {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    events.push(Event::End(BytesEnd::new(local)));
                } else {
                    events.push(event.clone().into_owned());
                }
            }
            Event::Eof => break,
            other => events.push(other.into_owned()),
        }
    }

    match (mpd, root) {
        (Some(mpd), Some(root)) => Ok(ParsedMpd {
            mpd,
            document: Document::new(events, root, period_events),
        }),
        _ => Err(FormatError::NotAManifest("document has no root element".to_string())),
    }
}

fn classify(local: &str, parent: Option<Kind>) -> Kind {
    match (local, parent) {
        ("MPD", None) => Kind::Mpd,
        ("Period", Some(Kind::Mpd)) => Kind::Period,
        ("AdaptationSet", Some(Kind::Period)) => Kind::AdaptationSet,
        ("Representation", Some(Kind::AdaptationSet)) => Kind::Representation,
        _ => Kind::Other,
    }
}

/// Copies the attributes of a recognised element into the typed model.
fn record(
    mpd: &mut Mpd,
    kind: Kind,
    local: &str,
    parent: Option<Kind>,
    e: &BytesStart<'_>,
) -> Result<(), FormatError> {
    match kind {
        Kind::Period => {
            let attrs = read_attributes(e)?;
            mpd.periods.push(Period {
                duration: attrs.get("duration").cloned(),
                adaptation_sets: Vec::new(),
            });
        }
        Kind::AdaptationSet => {
            let attrs = read_attributes(e)?;
            if let Some(period) = mpd.periods.last_mut() {
                period.adaptation_sets.push(AdaptationSet {
                    id: attrs.get("id").cloned(),
                    mime_type: attrs.get("mimeType").cloned(),
                    segment_templates: Vec::new(),
                    representations: Vec::new(),
                });
            }
        }
        Kind::Representation => {
            let attrs = read_attributes(e)?;
            if let Some(adaptation) = current_adaptation_set(mpd) {
                adaptation.representations.push(Representation {
                    id: attrs.get("id").cloned(),
                    mime_type: attrs.get("mimeType").cloned(),
                    segment_templates: Vec::new(),
                });
            }
        }
        Kind::Other if local == "SegmentTemplate" => {
            let template = read_segment_template(e)?;
            match parent {
                Some(Kind::AdaptationSet) => {
                    if let Some(adaptation) = current_adaptation_set(mpd) {
                        adaptation.segment_templates.push(template);
                    }
                }
                Some(Kind::Representation) => {
                    if let Some(rep) =
                        current_adaptation_set(mpd).and_then(|a| a.representations.last_mut())
                    {
                        rep.segment_templates.push(template);
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn current_adaptation_set(mpd: &mut Mpd) -> Option<&mut AdaptationSet> {
    mpd.periods.last_mut()?.adaptation_sets.last_mut()
}

fn read_segment_template(e: &BytesStart<'_>) -> Result<SegmentTemplate, FormatError> {
    let attrs = read_attributes(e)?;
    let number = |key: &str| -> Result<Option<u64>, FormatError> {
        attrs
            .get(key)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|err| FormatError::Attribute {
                    element: "SegmentTemplate".to_string(),
                    message: format!("{}={:?}: {}", key, v, err),
                })
            })
            .transpose()
    };

    Ok(SegmentTemplate {
        duration: number("duration")?,
        timescale: number("timescale")?,
        initialization: attrs.get("initialization").cloned(),
    })
}

fn read_attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, FormatError> {
    let element = || String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| FormatError::Attribute {
            element: element(),
            message: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| FormatError::Attribute {
            element: element(),
            message: err.to_string(),
        })?;
        map.insert(key, value.into_owned());
    }
    Ok(map)
}

fn declares_default_namespace(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xmlns")
}

/// Rebuilds an element under `name`, dropping every default namespace
/// declaration and any `xmlns:*` declaration that binds the DASH namespace.
/// `default_namespace`, when given, is declared as the new default.
fn normalise_start(
    e: &BytesStart<'_>,
    name: &str,
    default_namespace: Option<&str>,
) -> Result<BytesStart<'static>, FormatError> {
    let mut start = BytesStart::new(name.to_string());
    if let Some(uri) = default_namespace {
        start.push_attribute(("xmlns", uri));
    }

    for attr in e.attributes() {
        let attr = attr.map_err(|err| FormatError::Attribute {
            element: name.to_string(),
            message: err.to_string(),
        })?;
        let key = attr.key.as_ref();
        if key == b"xmlns" {
            continue;
        }
        if key.starts_with(b"xmlns:") && is_dash_namespace(attr.value.as_ref()) {
            continue;
        }
        start.push_attribute(Attribute {
            key: QName(key),
            value: Cow::Borrowed(attr.value.as_ref()),
        });
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT6S" minBufferTime="PT2S">
  <!-- packaged offline -->
  <Period id="p0" duration="PT6S">
    <AdaptationSet id="video" mimeType="video/mp4">
      <SegmentTemplate duration="2" timescale="1" initialization="$RepresentationID$/init" media="$RepresentationID$/$Number$"/>
      <Representation id="v0" bandwidth="500000"/>
      <Representation id="v1" bandwidth="1000000">
        <SegmentTemplate duration="4000" timescale="1000"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>
"#;

    #[test]
    fn test_parse_typed_model() {
        let parsed = parse_mpd(VOD).unwrap();
        let mpd = parsed.mpd;
        assert_eq!(mpd.namespace, "urn:mpeg:dash:schema:mpd:2011");
        assert_eq!(mpd.presentation_type, PresentationType::Static);
        assert_eq!(mpd.media_presentation_duration.as_deref(), Some("PT6S"));
        assert_eq!(mpd.periods.len(), 1);

        let period = &mpd.periods[0];
        assert_eq!(period.duration.as_deref(), Some("PT6S"));
        let adaptation = &period.adaptation_sets[0];
        assert_eq!(adaptation.id.as_deref(), Some("video"));
        assert_eq!(adaptation.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(adaptation.segment_templates.len(), 1);
        assert_eq!(adaptation.segment_templates[0].duration, Some(2));
        assert!(adaptation.segment_templates[0].initialization.is_some());

        assert_eq!(adaptation.representations.len(), 2);
        assert_eq!(adaptation.representations[0].id.as_deref(), Some("v0"));
        assert!(adaptation.representations[0].segment_templates.is_empty());
        assert_eq!(
            adaptation.representations[1].segment_templates[0].timescale,
            Some(1000)
        );
    }

    #[test]
    fn test_document_round_trips_unchanged_source() {
        let parsed = parse_mpd(VOD).unwrap();
        let xml = String::from_utf8(parsed.document.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(xml, VOD);
    }

    #[test]
    fn test_prefixed_namespace_becomes_default() {
        let xml = r#"<dash:MPD xmlns:dash="urn:mpeg:DASH:schema:MPD:2011" xmlns:xlink="http://www.w3.org/1999/xlink" type="static"><dash:Period><dash:AdaptationSet/></dash:Period></dash:MPD>"#;
        let parsed = parse_mpd(xml).unwrap();
        assert_eq!(parsed.mpd.namespace, "urn:mpeg:DASH:schema:MPD:2011");
        assert_eq!(parsed.mpd.periods[0].adaptation_sets.len(), 1);

        let out = String::from_utf8(parsed.document.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(
            out,
            r#"<MPD xmlns="urn:mpeg:DASH:schema:MPD:2011" xmlns:xlink="http://www.w3.org/1999/xlink" type="static"><Period><AdaptationSet/></Period></MPD>"#
        );
    }

    #[test]
    fn test_foreign_elements_are_kept_verbatim() {
        let xml = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:cenc="urn:mpeg:cenc:2013"><Period><cenc:pssh>AAAA</cenc:pssh></Period></MPD>"#;
        let parsed = parse_mpd(xml).unwrap();
        let out = String::from_utf8(parsed.document.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(out, xml);
    }

    #[test]
    fn test_foreign_default_namespace_survives_prefix_removal() {
        let xml = r#"<dash:MPD xmlns:dash="urn:mpeg:dash:schema:mpd:2011" xmlns="urn:example:ext"><dash:Period><Ext/></dash:Period></dash:MPD>"#;
        let parsed = parse_mpd(xml).unwrap();
        let out = String::from_utf8(parsed.document.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(
            out,
            r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period><Ext xmlns="urn:example:ext"/></Period></MPD>"#
        );
    }

    #[test]
    fn test_nested_namespaces_are_redeclared_where_they_change() {
        let xml = r#"<dash:MPD xmlns:dash="urn:mpeg:dash:schema:mpd:2011"><dash:Period><Ext xmlns="urn:example:ext"><Inner/><dash:AdaptationSet/></Ext><Bare/></dash:Period></dash:MPD>"#;
        let parsed = parse_mpd(xml).unwrap();
        let out = String::from_utf8(parsed.document.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period>"#,
                r#"<Ext xmlns="urn:example:ext"><Inner/><AdaptationSet xmlns="urn:mpeg:dash:schema:mpd:2011"/></Ext>"#,
                r#"<Bare xmlns=""/>"#,
                r#"</Period></MPD>"#
            )
        );
    }

    #[test]
    fn test_wrong_root_is_not_a_manifest() {
        let err = parse_mpd(r#"<Playlist xmlns="urn:mpeg:dash:schema:mpd:2011"/>"#).unwrap_err();
        assert!(matches!(err, FormatError::NotAManifest(_)));
    }

    #[test]
    fn test_wrong_namespace_is_not_a_manifest() {
        let err = parse_mpd(r#"<MPD xmlns="urn:example:other"><Period/></MPD>"#).unwrap_err();
        assert!(matches!(err, FormatError::NotAManifest(_)));

        let err = parse_mpd("<MPD><Period/></MPD>").unwrap_err();
        assert!(matches!(err, FormatError::NotAManifest(_)));
    }

    #[test]
    fn test_empty_document_is_not_a_manifest() {
        let err = parse_mpd(r#"<?xml version="1.0"?>"#).unwrap_err();
        assert!(matches!(err, FormatError::NotAManifest(_)));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_mpd(r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period></MPD>"#)
            .unwrap_err();
        assert!(matches!(err, FormatError::Xml(_)));
    }

    #[test]
    fn test_periods_are_all_recorded() {
        let xml = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period id="a"/><Period id="b"/></MPD>"#;
        let parsed = parse_mpd(xml).unwrap();
        assert_eq!(parsed.mpd.periods.len(), 2);
    }

    #[test]
    fn test_non_numeric_template_duration_is_rejected() {
        let xml = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period><AdaptationSet><SegmentTemplate duration="two"/></AdaptationSet></Period></MPD>"#;
        let err = parse_mpd(xml).unwrap_err();
        assert!(matches!(err, FormatError::Attribute { .. }));
    }
}
