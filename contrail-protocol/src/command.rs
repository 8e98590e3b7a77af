use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use itertools::Itertools;

use crate::{FlightId, Value};

/// An encoded command carries exactly four framed fields: source id,
/// method name, positional args and keyword args.
const FIELD_COUNT: usize = 4;

/// A decoded remote method call: invoke `method` on the dataset stored
/// under `source_id`, with the given positional and keyword arguments.
///
/// On the wire each of the four fields is framed as a little-endian u32
/// length prefix followed by the field payload. Length-delimited framing
/// means no byte sequence inside a field can ever be mistaken for a field
/// boundary, so method names and argument values are unrestricted.
///
/// The two argument fields are JSON: positional arguments as an
/// index-keyed mapping (`{"0": …, "1": …}`) so a variable-arity call
/// decodes back into an ordered sequence, keyword arguments as a plain
/// string-keyed mapping. Both are serialized from ordered maps, so equal
/// commands always encode to equal bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub source_id: FlightId,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

impl Command {
    pub fn new(source_id: impl Into<FlightId>, method: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            method: method.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Frame this command into its wire bytes.
    pub fn encode(&self) -> ContrailResult<Bytes> {
        self.args.iter().try_for_each(Value::ensure_finite)?;
        self.kwargs.values().try_for_each(Value::ensure_finite)?;

        let indexed: BTreeMap<String, &Value> = self
            .args
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect();
        let args_payload = serde_json::to_vec(&indexed)
            .map_err(|e| contrail_err!("failed to serialize args: {}", e))?;
        let kwargs_payload = serde_json::to_vec(&self.kwargs)
            .map_err(|e| contrail_err!("failed to serialize kwargs: {}", e))?;

        let fields: [&[u8]; FIELD_COUNT] = [
            self.source_id.as_bytes(),
            self.method.as_bytes(),
            &args_payload,
            &kwargs_payload,
        ];
        let mut buf =
            BytesMut::with_capacity(fields.iter().map(|f| f.len() + size_of::<u32>()).sum());
        for field in fields {
            let len = u32::try_from(field.len())
                .map_err(|_| contrail_err!("command field exceeds u32 length"))?;
            buf.put_u32_le(len);
            buf.put_slice(field);
        }
        Ok(buf.freeze())
    }

    /// Decode wire bytes produced by [`Command::encode`].
    ///
    /// Fails with `MalformedCommand` unless the buffer splits into exactly
    /// four framed fields with a valid id, method and argument mappings.
    pub fn decode(bytes: &[u8]) -> ContrailResult<Self> {
        let mut buf = bytes;
        let mut fields = Vec::with_capacity(FIELD_COUNT);
        for _ in 0..FIELD_COUNT {
            if buf.remaining() < size_of::<u32>() {
                contrail_bail!(MalformedCommand: "expected {} framed fields", FIELD_COUNT);
            }
            let len = buf.get_u32_le() as usize;
            if buf.remaining() < len {
                contrail_bail!(MalformedCommand: "field length {} overruns the buffer", len);
            }
            fields.push(buf.copy_to_bytes(len));
        }
        if buf.has_remaining() {
            contrail_bail!(
                MalformedCommand: "{} trailing bytes after {} fields",
                buf.remaining(),
                FIELD_COUNT
            );
        }

        let source_id = String::from_utf8(fields[0].to_vec())
            .map_err(|_| contrail_err!(MalformedCommand: "source id is not valid UTF-8"))?;
        let method = String::from_utf8(fields[1].to_vec())
            .map_err(|_| contrail_err!(MalformedCommand: "method name is not valid UTF-8"))?;
        let args = decode_args(&fields[2])?;
        let kwargs: BTreeMap<String, Value> = serde_json::from_slice(&fields[3])
            .map_err(|e| contrail_err!(MalformedCommand: "invalid kwargs mapping: {}", e))?;

        Ok(Self {
            source_id,
            method,
            args,
            kwargs,
        })
    }

    /// Human-readable `method(arg, …, name=value)` rendering, as shown in
    /// flight listings.
    pub fn render(&self) -> String {
        let args = self.args.iter().map(Value::to_string);
        let kwargs = self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v));
        format!("{}({})", self.method, args.chain(kwargs).join(", "))
    }
}

/// Reassemble the ordered argument sequence from its index mapping. The
/// indices must be dense from zero; maps are sorted numerically so arities
/// past ten decode in call order rather than lexical order.
fn decode_args(payload: &[u8]) -> ContrailResult<Vec<Value>> {
    let indexed: BTreeMap<String, Value> = serde_json::from_slice(payload)
        .map_err(|e| contrail_err!(MalformedCommand: "invalid args mapping: {}", e))?;
    let mut ordered = indexed
        .into_iter()
        .map(|(index, value)| {
            index
                .parse::<usize>()
                .map(|i| (i, value))
                .map_err(|_| contrail_err!(MalformedCommand: "argument index '{}' is not a number", index))
        })
        .collect::<ContrailResult<Vec<_>>>()?;
    ordered.sort_by_key(|(i, _)| *i);
    for (position, (index, _)) in ordered.iter().enumerate() {
        if *index != position {
            contrail_bail!(MalformedCommand: "argument indices must be dense from 0, got {}", index);
        }
    }
    Ok(ordered.into_iter().map(|(_, value)| value).collect())
}
