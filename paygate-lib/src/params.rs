//! Field/value parameter sets and their older protocol wire format.
//!
//! A [`ParameterSet`] is built per call, signed, sent as flat XML and
//! discarded. Keys are kept sorted so iteration order is already the order
//! the canonical string needs.

use std::collections::BTreeMap;

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Root element of the older protocol XML documents.
const XML_ROOT: &str = "xml";

/// Mapping from field name to value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a field only if `value` is present.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.0.insert(key.into(), value.into());
        }
        self
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Remove a field.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Whether a field exists (empty values included).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as `<xml><k><![CDATA[v]]></k>...</xml>`.
    pub fn to_xml(&self) -> Result<String, String> {
        let mut writer = Writer::new(Vec::new());

        write(&mut writer, Event::Start(BytesStart::new(XML_ROOT)))?;
        for (key, value) in &self.0 {
            write(&mut writer, Event::Start(BytesStart::new(key.as_str())))?;
            if value.contains("]]>") {
                write(&mut writer, Event::Text(BytesText::new(value)))?;
            } else {
                write(&mut writer, Event::CData(BytesCData::new(value.as_str())))?;
            }
            write(&mut writer, Event::End(BytesEnd::new(key.as_str())))?;
        }
        write(&mut writer, Event::End(BytesEnd::new(XML_ROOT)))?;

        String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
    }

    /// Decode a flat XML document. Only direct children of the root element
    /// become fields; deeper nesting is flattened into the parent's text.
    ///
    /// Field text is kept byte for byte: the reply sign covers it verbatim.
    /// Whitespace between fields never reaches a value.
    pub fn from_xml(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);

        let mut params = BTreeMap::new();
        let mut depth = 0usize;
        let mut field: Option<String> = None;
        let mut value = String::new();
        let mut saw_root = false;

        loop {
            match reader.read_event().map_err(|e| e.to_string())? {
                Event::Start(element) => {
                    depth += 1;
                    if depth == 1 {
                        saw_root = true;
                    } else if depth == 2 {
                        field = Some(element_name(element.name().as_ref())?);
                        value.clear();
                    }
                }
                Event::Empty(element) => {
                    if depth == 0 {
                        saw_root = true;
                    } else if depth == 1 {
                        params.insert(element_name(element.name().as_ref())?, String::new());
                    }
                }
                Event::Text(text) if depth >= 2 => {
                    value.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
                Event::CData(data) if depth >= 2 => {
                    value.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
                Event::End(_) => {
                    if depth == 2 {
                        if let Some(name) = field.take() {
                            params.insert(name, std::mem::take(&mut value));
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err("missing root element".to_string());
        }
        Ok(Self(params))
    }

    /// Decode the fields into a typed value (all values are strings).
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = serde_json::to_value(&self.0)?;
        serde_json::from_value(value)
    }

    /// Percent-encoded `k=v&...` query string of the non-empty fields.
    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

fn element_name(raw: &[u8]) -> Result<String, String> {
    String::from_utf8(raw.to_vec()).map_err(|e| e.to_string())
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ParameterSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
