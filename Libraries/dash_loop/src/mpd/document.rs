// Libraries/dash_loop/src/mpd/document.rs

use std::borrow::Cow;

use bytes::Bytes;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use crate::error::{FormatError, SerializeError};

/// The manifest as an ordered list of owned XML events.
///
/// Everything the parser saw is kept (declaration, comments, whitespace,
/// foreign-namespace elements), so writing the events back reproduces the
/// source apart from the edits made through this type. Elements of the MPD
/// namespace are stored unprefixed and the root declares that namespace as the
/// default one.
#[derive(Debug, Clone)]
pub struct Document {
    events: Vec<Event<'static>>,
    root: usize,
    periods: Vec<usize>,
}

impl Document {
    pub(crate) fn new(events: Vec<Event<'static>>, root: usize, periods: Vec<usize>) -> Self {
        Self { events, root, periods }
    }

    /// Value of an attribute on the `MPD` element.
    pub fn root_attribute(&self, key: &str) -> Option<String> {
        start_of(&self.events[self.root]).and_then(|start| attribute_value(start, key))
    }

    /// Value of an attribute on the first `Period` element.
    pub fn period_attribute(&self, key: &str) -> Option<String> {
        let index = *self.periods.first()?;
        start_of(&self.events[index]).and_then(|start| attribute_value(start, key))
    }

    pub fn set_root_attribute(&mut self, key: &str, value: &str) -> Result<(), FormatError> {
        edit_start(&mut self.events[self.root], key, Some(value))
    }

    pub fn remove_root_attribute(&mut self, key: &str) -> Result<(), FormatError> {
        edit_start(&mut self.events[self.root], key, None)
    }

    /// Removes `key` from every `Period` element.
    pub fn remove_period_attribute(&mut self, key: &str) -> Result<(), FormatError> {
        for &index in &self.periods {
            edit_start(&mut self.events[index], key, None)?;
        }
        Ok(())
    }

    /**
     * Render the document to XML bytes.
     * The document is not modified, so repeated calls produce identical output.
     */
    pub fn to_bytes(&self) -> Result<Bytes, SerializeError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event.borrow())?;
        }
        Ok(Bytes::from(writer.into_inner()))
    }
}

fn start_of<'a>(event: &'a Event<'static>) -> Option<&'a BytesStart<'static>> {
    match event {
        Event::Start(start) | Event::Empty(start) => Some(start),
        _ => None,
    }
}

fn attribute_value(start: &BytesStart<'_>, key: &str) -> Option<String> {
    start
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Replaces `key` with `value` (appending it if absent), or removes it when
/// `value` is `None`. Other attributes keep their order and raw encoding.
fn edit_start(event: &mut Event<'static>, key: &str, value: Option<&str>) -> Result<(), FormatError> {
    let (start, empty) = match event {
        Event::Start(start) => (start, false),
        Event::Empty(start) => (start, true),
        _ => return Ok(()),
    };

    let element = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(element.clone());
    let mut replaced = false;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| FormatError::Attribute {
            element: element.clone(),
            message: e.to_string(),
        })?;
        if attr.key.as_ref() == key.as_bytes() {
            if let Some(value) = value {
                rebuilt.push_attribute((key, value));
                replaced = true;
            }
            continue;
        }
        rebuilt.push_attribute(Attribute {
            key: QName(attr.key.as_ref()),
            value: Cow::Borrowed(attr.value.as_ref()),
        });
    }

    if let (Some(value), false) = (value, replaced) {
        rebuilt.push_attribute((key, value));
    }

    *event = if empty { Event::Empty(rebuilt) } else { Event::Start(rebuilt) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::BytesEnd;

    fn sample() -> Document {
        let mut mpd = BytesStart::new("MPD");
        mpd.push_attribute(("xmlns", "urn:mpeg:dash:schema:mpd:2011"));
        mpd.push_attribute(("type", "static"));
        mpd.push_attribute(("mediaPresentationDuration", "PT6S"));
        let mut period = BytesStart::new("Period");
        period.push_attribute(("duration", "PT6S"));
        period.push_attribute(("id", "p0"));

        Document::new(
            vec![
                Event::Start(mpd),
                Event::Empty(period),
                Event::End(BytesEnd::new("MPD")),
            ],
            0,
            vec![1],
        )
    }

    #[test]
    fn test_set_existing_attribute_keeps_position() {
        let mut doc = sample();
        doc.set_root_attribute("type", "dynamic").unwrap();
        let xml = String::from_utf8(doc.to_bytes().unwrap().to_vec()).unwrap();
        assert!(xml.starts_with(
            r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="dynamic" mediaPresentationDuration="PT6S">"#
        ));
    }

    #[test]
    fn test_set_missing_attribute_appends() {
        let mut doc = sample();
        doc.set_root_attribute("availabilityStartTime", "2024-01-01T00:00:00Z").unwrap();
        assert_eq!(
            doc.root_attribute("availabilityStartTime").as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_remove_attributes() {
        let mut doc = sample();
        doc.remove_root_attribute("mediaPresentationDuration").unwrap();
        doc.remove_period_attribute("duration").unwrap();
        assert_eq!(doc.root_attribute("mediaPresentationDuration"), None);
        assert_eq!(doc.period_attribute("duration"), None);
        assert_eq!(doc.period_attribute("id").as_deref(), Some("p0"));

        let xml = String::from_utf8(doc.to_bytes().unwrap().to_vec()).unwrap();
        assert!(xml.contains(r#"<Period id="p0"/>"#));
    }

    #[test]
    fn test_removing_absent_attribute_is_noop() {
        let mut doc = sample();
        let before = doc.to_bytes().unwrap();
        doc.remove_root_attribute("minimumUpdatePeriod").unwrap();
        assert_eq!(before, doc.to_bytes().unwrap());
    }

    #[test]
    fn test_raw_attribute_encoding_is_preserved() {
        let mut mpd = BytesStart::new("MPD");
        mpd.push_attribute(Attribute {
            key: QName(b"profiles"),
            value: Cow::Borrowed(b"a&amp;b"),
        });
        let mut doc = Document::new(
            vec![Event::Start(mpd), Event::End(BytesEnd::new("MPD"))],
            0,
            vec![],
        );
        doc.set_root_attribute("type", "dynamic").unwrap();
        let xml = String::from_utf8(doc.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(xml, r#"<MPD profiles="a&amp;b" type="dynamic"></MPD>"#);
    }
}
