//! Thin event walker over quick-xml shared by the activity decoders.

use std::ops::ControlFlow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::activity::ActivityFormat;
use crate::error::DecodeError;

/// Namespace-free view of one XML event.
#[derive(Debug)]
pub(crate) enum XmlEvent<'a> {
    Open {
        name: &'a str,
        attributes: &'a [(String, String)],
    },
    /// Character data, with entity and character references already resolved.
    Text(&'a str),
    Close {
        name: &'a str,
    },
}

/// Stream `bytes` through `on_event` until EOF or until the callback breaks.
///
/// Element and attribute names are reported without namespace prefixes.
pub(crate) fn walk<F>(
    bytes: &[u8],
    format: Option<ActivityFormat>,
    mut on_event: F,
) -> Result<(), DecodeError>
where
    F: FnMut(XmlEvent<'_>) -> Result<ControlFlow<()>, DecodeError>,
{
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut name = String::new();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut entity_buf = String::new();

    loop {
        let flow = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                read_element(&reader, &e, &mut name, &mut attributes, format)?;
                on_event(XmlEvent::Open {
                    name: &name,
                    attributes: &attributes,
                })?
            }
            Ok(Event::Empty(e)) => {
                read_element(&reader, &e, &mut name, &mut attributes, format)?;
                match on_event(XmlEvent::Open {
                    name: &name,
                    attributes: &attributes,
                })? {
                    ControlFlow::Continue(()) => on_event(XmlEvent::Close { name: &name })?,
                    ControlFlow::Break(()) => ControlFlow::Break(()),
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let decoded = reader
                    .decoder()
                    .decode(local.as_ref())
                    .map_err(|err| decode_error(&reader, format, "name", &err))?;
                on_event(XmlEvent::Close {
                    name: decoded.as_ref(),
                })?
            }
            Ok(Event::Text(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| decode_error(&reader, format, "text", &err))?;
                on_event(XmlEvent::Text(text.as_ref()))?
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| decode_error(&reader, format, "cdata", &err))?;
                on_event(XmlEvent::Text(text.as_ref()))?
            }
            Ok(Event::GeneralRef(e)) => {
                let entity_name = e
                    .decode()
                    .map_err(|err| decode_error(&reader, format, "entity", &err))?;
                entity_buf.clear();
                entity_buf.push('&');
                entity_buf.push_str(entity_name.as_ref());
                entity_buf.push(';');
                match quick_xml::escape::unescape(&entity_buf) {
                    Ok(resolved) => on_event(XmlEvent::Text(resolved.as_ref()))?,
                    Err(err) => {
                        log::warn!("activity: dropping unknown entity {}: {:?}", entity_buf, err);
                        ControlFlow::Continue(())
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => ControlFlow::Continue(()),
            Err(err) => {
                let mut error = DecodeError::malformed("XML_SYNTAX", format!("XML error: {}", err))
                    .with_offset(reader_offset(&reader));
                if let Some(format) = format {
                    error = error.with_format(format);
                }
                return Err(error);
            }
        };
        if flow.is_break() {
            break;
        }
        buf.clear();
    }
    Ok(())
}

fn read_element(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    name: &mut String,
    attributes: &mut Vec<(String, String)>,
    format: Option<ActivityFormat>,
) -> Result<(), DecodeError> {
    let local = element.local_name();
    let decoded = reader
        .decoder()
        .decode(local.as_ref())
        .map_err(|err| decode_error(reader, format, "name", &err))?;
    name.clear();
    name.push_str(decoded.as_ref());

    attributes.clear();
    for attr in element.attributes() {
        let attr = attr.map_err(|err| decode_error(reader, format, "attribute", &err))?;
        let key_local = attr.key.local_name();
        let key = reader
            .decoder()
            .decode(key_local.as_ref())
            .map_err(|err| decode_error(reader, format, "attribute", &err))?;
        let value = reader
            .decoder()
            .decode(&attr.value)
            .map_err(|err| decode_error(reader, format, "attribute", &err))?;
        attributes.push((key.into_owned(), value.into_owned()));
    }
    Ok(())
}

fn decode_error<E: std::fmt::Debug>(
    reader: &Reader<&[u8]>,
    format: Option<ActivityFormat>,
    what: &str,
    err: &E,
) -> DecodeError {
    let mut error = DecodeError::malformed("XML_DECODE", format!("{} decode error: {:?}", what, err))
        .with_offset(reader_offset(reader));
    if let Some(format) = format {
        error = error.with_format(format);
    }
    error
}

fn reader_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

/// Look up an attribute by local name.
pub(crate) fn attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Parse a trimmed decimal number, logging and discarding garbage.
pub(crate) fn parse_number(raw: &str, what: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!("activity: ignoring unparsable {} value {:?}", what, trimmed);
            None
        }
    }
}
