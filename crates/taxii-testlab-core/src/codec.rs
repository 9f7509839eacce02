use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::model::{AttackPattern, Campaign, Indicator, StixObject, ThreatActor};
use crate::CoreError;

/// TAXII envelope as returned by the objects endpoints.
///
/// Objects stay raw so each one can be decoded, or skipped, independently.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub more: Option<bool>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub objects: Vec<Box<RawValue>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bundle<'a> {
    #[serde(rename = "type")]
    pub bundle_type: &'static str,
    pub id: &'a str,
    pub objects: &'a [StixObject],
}

impl<'a> Bundle<'a> {
    #[must_use]
    pub fn new(id: &'a str, objects: &'a [StixObject]) -> Self {
        Self { bundle_type: "bundle", id, objects }
    }
}

#[derive(Deserialize)]
struct RawBundle {
    #[serde(rename = "type")]
    bundle_type: String,
    #[serde(default)]
    objects: Vec<Box<RawValue>>,
}

#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    object_type: String,
}

type Decoder = fn(&str) -> Result<StixObject, serde_json::Error>;

fn decode_as<T>(raw: &str) -> Result<StixObject, serde_json::Error>
where
    T: DeserializeOwned + Into<StixObject>,
{
    serde_json::from_str::<T>(raw).map(Into::into)
}

const DECODERS: &[(&str, Decoder)] = &[
    ("indicator", decode_as::<Indicator>),
    ("attack-pattern", decode_as::<AttackPattern>),
    ("threat-actor", decode_as::<ThreatActor>),
    ("campaign", decode_as::<Campaign>),
];

fn decoder_for(object_type: &str) -> Option<Decoder> {
    DECODERS.iter().find(|(tag, _)| *tag == object_type).map(|(_, decoder)| *decoder)
}

/// # Errors
/// Returns [`CoreError::Decode`] when the body is not a JSON envelope.
pub fn decode_envelope(body: &[u8]) -> Result<Envelope, CoreError> {
    serde_json::from_slice(body)
        .map_err(|err| CoreError::Decode(format!("failed to decode envelope: {err}")))
}

/// Raw objects of a STIX bundle.
///
/// # Errors
/// Returns [`CoreError::Decode`] when the body is not JSON or its `type` is not `bundle`.
pub fn decode_bundle(body: &[u8]) -> Result<Vec<Box<RawValue>>, CoreError> {
    let bundle: RawBundle = serde_json::from_slice(body)
        .map_err(|err| CoreError::Decode(format!("failed to decode bundle: {err}")))?;
    if bundle.bundle_type != "bundle" {
        return Err(CoreError::Decode(format!(
            "expected type bundle, found {}",
            bundle.bundle_type
        )));
    }
    Ok(bundle.objects)
}

/// First decode pass: read only the `type` discriminant.
///
/// # Errors
/// Returns [`CoreError::Decode`] when the object has no string `type`.
pub fn peek_type(raw: &RawValue) -> Result<String, CoreError> {
    serde_json::from_str::<TypeTag>(raw.get())
        .map(|tag| tag.object_type)
        .map_err(|err| CoreError::Decode(format!("object has no readable type: {err}")))
}

/// Second decode pass: dispatch on the type tag. Types without a decoder come
/// back as [`StixObject::Unknown`].
///
/// # Errors
/// Returns [`CoreError::Decode`] when the type cannot be read or a modeled type
/// does not match its schema.
pub fn decode_object(raw: &RawValue) -> Result<StixObject, CoreError> {
    let object_type = peek_type(raw)?;
    match decoder_for(&object_type) {
        Some(decoder) => decoder(raw.get())
            .map_err(|err| CoreError::Decode(format!("failed to decode {object_type}: {err}"))),
        None => serde_json::from_str(raw.get())
            .map(|value| StixObject::Unknown { object_type, value })
            .map_err(|err| CoreError::Decode(format!("failed to decode object: {err}"))),
    }
}

/// Decode a TAXII resource body such as discovery, API root or collections.
///
/// The body must be a JSON object; array bodies are rejected even where serde
/// would accept them as a positional struct.
///
/// # Errors
/// Returns [`CoreError::Decode`] when the body is not an object or does not match `T`.
pub fn decode_resource<T>(body: &[u8]) -> Result<T, CoreError>
where
    T: DeserializeOwned,
{
    let name = std::any::type_name::<T>().rsplit("::").next().unwrap_or("resource");
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| CoreError::Decode(format!("failed to decode {name}: {err}")))?;
    if !value.is_object() {
        return Err(CoreError::Decode(format!("failed to decode {name}: body is not a JSON object")));
    }
    serde_json::from_value(value)
        .map_err(|err| CoreError::Decode(format!("failed to decode {name}: {err}")))
}

/// # Errors
/// Returns [`CoreError::Encode`] when `value` cannot be serialized.
pub fn encode_pretty<T>(value: &T) -> Result<String, CoreError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value)
        .map_err(|err| CoreError::Encode(format!("failed to encode value: {err}")))
}
