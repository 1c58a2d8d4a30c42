//! Headless geometry decoder
//!
//! The compute service encodes every geometry object as a JSON envelope:
//!
//! ```json
//! {"version": 10000, "archive3dm": 70, "opennurbs": -1877964136, "data": "<base64>"}
//! ```
//!
//! Without a native geometry kernel the viewer validates the envelope and
//! keeps the raw archive bytes. Export writes them back as one
//! length-prefixed bundle.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gsolve_cycle::{DecodeFault, GeometryDecoder};
use gsolve_schema::GeometryRecord;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Magic prefix of an exported bundle
pub const BUNDLE_MAGIC: &[u8; 4] = b"GSB1";

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    archive3dm: u32,
    opennurbs: i64,
    data: String,
}

/// One geometry object as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedObject {
    /// Service-side type name
    pub type_name: Option<String>,
    /// Envelope format version
    pub version: u32,
    /// Archive version of `data`
    pub archive3dm: u32,
    /// Writer library version
    pub opennurbs: i64,
    /// Raw archive bytes
    pub data: Vec<u8>,
}

/// Decoder for compute-service object envelopes
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    live: AtomicUsize,
}

impl EnvelopeDecoder {
    /// Create a decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects decoded and not yet released
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl GeometryDecoder for EnvelopeDecoder {
    type Object = EncodedObject;

    fn decode(&self, record: &GeometryRecord) -> Result<EncodedObject, DecodeFault> {
        let envelope = Envelope::deserialize(&record.value)
            .map_err(|e| DecodeFault::new(format!("not a geometry envelope: {e}")))?;
        let data = STANDARD
            .decode(envelope.data.as_bytes())
            .map_err(|e| DecodeFault::new(format!("bad archive encoding: {e}")))?;
        if data.is_empty() {
            return Err(DecodeFault::new("empty archive"));
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(EncodedObject {
            type_name: record.type_name.clone(),
            version: envelope.version,
            archive3dm: envelope.archive3dm,
            opennurbs: envelope.opennurbs,
            data,
        })
    }

    fn to_bytes(&self, objects: &[EncodedObject]) -> Result<Vec<u8>, DecodeFault> {
        let count = u32::try_from(objects.len())
            .map_err(|_| DecodeFault::new("too many objects to export"))?;
        let payload: usize = objects.iter().map(|o| o.data.len() + 8).sum();
        let mut out = Vec::with_capacity(8 + payload);
        out.extend_from_slice(BUNDLE_MAGIC);
        out.extend_from_slice(&count.to_le_bytes());
        for object in objects {
            let len = u32::try_from(object.data.len())
                .map_err(|_| DecodeFault::new("object too large to export"))?;
            out.extend_from_slice(&object.archive3dm.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&object.data);
        }
        Ok(out)
    }

    fn release(&self, objects: Vec<EncodedObject>) {
        self.live.fetch_sub(objects.len(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> GeometryRecord {
        GeometryRecord {
            param: "RH_OUT:mesh".to_string(),
            path: "{ 0; }".to_string(),
            index: 0,
            type_name: Some("Rhino.Geometry.Mesh".to_string()),
            value,
        }
    }

    fn envelope(data: &str) -> serde_json::Value {
        json!({"version": 10000, "archive3dm": 70, "opennurbs": -1877964136, "data": data})
    }

    #[test]
    fn decodes_envelope() {
        let decoder = EnvelopeDecoder::new();
        let object = decoder.decode(&record(envelope("AQID"))).unwrap();

        assert_eq!(object.data, vec![1, 2, 3]);
        assert_eq!(object.archive3dm, 70);
        assert_eq!(object.type_name.as_deref(), Some("Rhino.Geometry.Mesh"));
        assert_eq!(decoder.live_objects(), 1);

        decoder.release(vec![object]);
        assert_eq!(decoder.live_objects(), 0);
    }

    #[test]
    fn rejects_non_envelopes() {
        let decoder = EnvelopeDecoder::new();

        let err = decoder.decode(&record(json!({"kind": "mesh"}))).unwrap_err();
        assert!(err.message().starts_with("not a geometry envelope"));

        let err = decoder.decode(&record(envelope("!!"))).unwrap_err();
        assert!(err.message().starts_with("bad archive encoding"));

        let err = decoder.decode(&record(envelope(""))).unwrap_err();
        assert_eq!(err.message(), "empty archive");
        assert_eq!(decoder.live_objects(), 0);
    }

    #[test]
    fn bundle_layout() {
        let decoder = EnvelopeDecoder::new();
        let a = decoder.decode(&record(envelope("AQID"))).unwrap();
        let b = decoder.decode(&record(envelope("BA=="))).unwrap();

        let bytes = decoder.to_bytes(&[a, b]).unwrap();

        let mut expected = b"GSB1".to_vec();
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&70u32.to_le_bytes());
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(&[1, 2, 3]);
        expected.extend_from_slice(&70u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.push(4);
        assert_eq!(bytes, expected);
    }
}
