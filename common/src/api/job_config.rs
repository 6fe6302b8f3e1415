use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Map every top-level element of a job's `config.xml` to its inner xml.
///
/// Nested elements are kept as raw markup, empty elements map to an empty string.
pub fn parse_job_config(xml: &str) -> Result<BTreeMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut fields = BTreeMap::new();

    // skip the declaration and anything else in front of the root element
    loop {
        match reader.read_event()? {
            Event::Start(_) => break,
            Event::Empty(_) | Event::Eof => return Ok(fields),
            _ => (),
        }
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let value = reader.read_text(e.name())?;
                fields.insert(name, value.into_owned());
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                fields.insert(name, String::new());
            }
            Event::End(_) | Event::Eof => break,
            _ => (),
        }
    }

    Ok(fields)
}
