//! Admin record codec: frame (magic + length + crc32c) around a canonical
//! CBOR body.
//!
//! Decode is strict: unknown envelope versions, unknown kind tags, missing
//! fields, checksum mismatches, and trailing bytes are all malformed-record
//! errors. Unknown map keys are skipped so a newer producer can add fields
//! without breaking older consumers.

use std::collections::BTreeMap;

use bytes::Bytes;
use crc32c::crc32c;
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use thiserror::Error;

use crate::core::{
    AddVersion, AdminOperation, AdminOperationKind, AdminPayload, BackupStrategy, ClusterName,
    CompressionStrategy, DeleteOldVersion, DeleteStore, DerivedSchemaCreation, EtlSettings,
    ExecutionId, HybridSettings, IncrementalPushPolicy, KillOfflinePushJob, MigrationTarget,
    PartitionerSettings, PushType, SetStoreCurrentVersion, SetStoreOwner, SetStorePartition,
    StoreCreation, StoreName, StoreTarget, SupersetSchemaCreation, UpdateStore,
    UpdateStoreOptions, ValueSchemaCreation,
};

const FRAME_MAGIC: u32 = 0x4144_4D31; // "ADM1"
const FRAME_HEADER_LEN: usize = 12;
const MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;

const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cbor encode: {0}")]
    Cbor(#[from] minicbor::encode::Error<std::convert::Infallible>),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record truncated: {got} bytes, need at least {need}")]
    Truncated { got: usize, need: usize },
    #[error("frame magic mismatch: {got:#010x}")]
    FrameMagicMismatch { got: u32 },
    #[error("frame length invalid: {reason}")]
    FrameLengthInvalid { reason: String },
    #[error("record too large: {got_bytes} bytes (max {max_bytes})")]
    RecordTooLarge { max_bytes: usize, got_bytes: usize },
    #[error("frame crc mismatch: expected {expected:#010x}, got {got:#010x}")]
    FrameCrcMismatch { expected: u32, got: u32 },
    #[error("unsupported envelope version: {0}")]
    UnsupportedEnvelopeVersion(u32),
    #[error("unknown operation kind tag: {0}")]
    UnknownKind(u32),
    #[error("indefinite-length CBOR not allowed")]
    IndefiniteLength,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("trailing bytes after record body")]
    TrailingBytes,
    #[error("cbor decode: {0}")]
    Cbor(#[from] minicbor::decode::Error),
}

/// Codec over raw admin log record bytes.
///
/// `decode` must reject anything it cannot fully understand; the tailer
/// treats every `DecodeError` as a poison record and skips past it.
pub trait OperationCodec: Send + Sync {
    fn encode(&self, op: &AdminOperation) -> Result<Bytes, EncodeError>;
    fn decode(&self, bytes: &[u8]) -> Result<AdminOperation, DecodeError>;
}

/// Default codec: crc-framed canonical CBOR, keys in byte-lexicographic
/// order, options encoded only when present.
#[derive(Clone, Copy, Debug, Default)]
pub struct CborOperationCodec;

impl OperationCodec for CborOperationCodec {
    fn encode(&self, op: &AdminOperation) -> Result<Bytes, EncodeError> {
        let mut body = Vec::new();
        let mut enc = Encoder::new(&mut body);
        encode_envelope(&mut enc, op)?;

        let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        framed.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
        framed.extend_from_slice(&crc32c(&body).to_le_bytes());
        framed.extend_from_slice(&body);
        Ok(Bytes::from(framed))
    }

    fn decode(&self, bytes: &[u8]) -> Result<AdminOperation, DecodeError> {
        if bytes.len() < FRAME_HEADER_LEN {
            return Err(DecodeError::Truncated {
                got: bytes.len(),
                need: FRAME_HEADER_LEN,
            });
        }
        let magic = u32::from_le_bytes(bytes[0..4].try_into().expect("4 bytes"));
        if magic != FRAME_MAGIC {
            return Err(DecodeError::FrameMagicMismatch { got: magic });
        }
        let length = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes")) as usize;
        if length == 0 {
            return Err(DecodeError::FrameLengthInvalid {
                reason: "frame length cannot be zero".to_string(),
            });
        }
        if length > MAX_RECORD_BYTES {
            return Err(DecodeError::RecordTooLarge {
                max_bytes: MAX_RECORD_BYTES,
                got_bytes: length,
            });
        }
        if bytes.len() != FRAME_HEADER_LEN + length {
            return Err(DecodeError::FrameLengthInvalid {
                reason: format!(
                    "frame declares {length} body bytes, record carries {}",
                    bytes.len() - FRAME_HEADER_LEN
                ),
            });
        }
        let expected_crc = u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes"));
        let body = &bytes[FRAME_HEADER_LEN..];
        let actual_crc = crc32c(body);
        if actual_crc != expected_crc {
            return Err(DecodeError::FrameCrcMismatch {
                expected: expected_crc,
                got: actual_crc,
            });
        }

        let mut dec = Decoder::new(body);
        let op = decode_envelope(&mut dec)?;
        if dec.datatype().is_ok() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(op)
    }
}

// =============================================================================
// Envelope
// =============================================================================

fn encode_envelope(
    enc: &mut Encoder<&mut Vec<u8>>,
    op: &AdminOperation,
) -> Result<(), EncodeError> {
    enc.map(5)?;
    enc.str("envelope_v")?;
    enc.u32(ENVELOPE_VERSION)?;
    enc.str("execution_id")?;
    enc.u64(op.execution_id.get())?;
    enc.str("kind")?;
    enc.u32(op.kind().tag())?;
    enc.str("payload")?;
    encode_payload(enc, &op.payload)?;
    enc.str("producer_time_ms")?;
    enc.u64(op.producer_time_ms)?;
    Ok(())
}

fn decode_envelope(dec: &mut Decoder<'_>) -> Result<AdminOperation, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut envelope_v = None;
    let mut execution_id = None;
    let mut kind = None;
    let mut producer_time_ms = None;
    let mut payload_bytes: Option<(usize, usize)> = None;

    for _ in 0..map_len {
        let key = decode_text(dec)?;
        match key {
            "envelope_v" => envelope_v = Some(decode_u32(dec, "envelope_v")?),
            "execution_id" => execution_id = Some(decode_u64(dec, "execution_id")?),
            "kind" => kind = Some(decode_u32(dec, "kind")?),
            "producer_time_ms" => {
                producer_time_ms = Some(decode_u64(dec, "producer_time_ms")?);
            }
            "payload" => {
                // Decoding the payload needs the kind tag, and a producer is
                // not required to order its keys. Remember the span, revisit
                // once the envelope is fully read.
                let start = dec.position();
                skip_value(dec)?;
                payload_bytes = Some((start, dec.position()));
            }
            _ => skip_value(dec)?,
        }
    }

    let envelope_v = envelope_v.ok_or(DecodeError::MissingField("envelope_v"))?;
    if envelope_v != ENVELOPE_VERSION {
        return Err(DecodeError::UnsupportedEnvelopeVersion(envelope_v));
    }
    let execution_id = execution_id.ok_or(DecodeError::MissingField("execution_id"))?;
    let kind_tag = kind.ok_or(DecodeError::MissingField("kind"))?;
    let kind =
        AdminOperationKind::from_tag(kind_tag).ok_or(DecodeError::UnknownKind(kind_tag))?;
    let producer_time_ms =
        producer_time_ms.ok_or(DecodeError::MissingField("producer_time_ms"))?;
    let (start, end) = payload_bytes.ok_or(DecodeError::MissingField("payload"))?;

    let input = dec.input();
    let mut payload_dec = Decoder::new(&input[start..end]);
    let payload = decode_payload(&mut payload_dec, kind)?;

    Ok(AdminOperation {
        execution_id: ExecutionId(execution_id),
        producer_time_ms,
        payload,
    })
}

// =============================================================================
// Payloads
// =============================================================================

fn encode_payload(enc: &mut Encoder<&mut Vec<u8>>, payload: &AdminPayload) -> Result<(), EncodeError> {
    match payload {
        AdminPayload::StoreCreation(p) => {
            enc.map(5)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "key_schema", &p.key_schema)?;
            put_str(enc, "owner", &p.owner)?;
            put_str(enc, "store", p.store.as_str())?;
            put_str(enc, "value_schema", &p.value_schema)?;
        }
        AdminPayload::ValueSchemaCreation(p) => {
            enc.map(4)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "schema", &p.schema)?;
            enc.str("schema_id")?;
            enc.i32(p.schema_id)?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::DerivedSchemaCreation(p) => {
            enc.map(5)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            enc.str("derived_schema_id")?;
            enc.i32(p.derived_schema_id)?;
            put_str(enc, "schema", &p.schema)?;
            put_str(enc, "store", p.store.as_str())?;
            enc.str("value_schema_id")?;
            enc.i32(p.value_schema_id)?;
        }
        AdminPayload::SupersetSchemaCreation(p) => {
            enc.map(6)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "store", p.store.as_str())?;
            put_str(enc, "superset_schema", &p.superset_schema)?;
            enc.str("superset_schema_id")?;
            enc.i32(p.superset_schema_id)?;
            put_str(enc, "value_schema", &p.value_schema)?;
            enc.str("value_schema_id")?;
            enc.i32(p.value_schema_id)?;
        }
        AdminPayload::DisableStoreWrite(p)
        | AdminPayload::EnableStoreWrite(p)
        | AdminPayload::DisableStoreRead(p)
        | AdminPayload::EnableStoreRead(p)
        | AdminPayload::DeleteAllVersions(p) => {
            encode_store_target(enc, p)?;
        }
        AdminPayload::KillOfflinePushJob(p) => {
            enc.map(2)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "topic", &p.topic)?;
        }
        AdminPayload::SetStoreCurrentVersion(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "store", p.store.as_str())?;
            enc.str("version")?;
            enc.i64(p.version)?;
        }
        AdminPayload::SetStoreOwner(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "owner", &p.owner)?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::SetStorePartition(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            enc.str("partition_count")?;
            enc.u32(p.partition_count)?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::UpdateStore(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            enc.str("options")?;
            encode_update_options(enc, &p.options)?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::DeleteStore(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            enc.str("largest_used_version_number")?;
            enc.i64(p.largest_used_version_number)?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::DeleteOldVersion(p) => {
            enc.map(3)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            put_str(enc, "store", p.store.as_str())?;
            enc.str("version_number")?;
            enc.i64(p.version_number)?;
        }
        AdminPayload::MigrateStore(p) | AdminPayload::AbortMigration(p) => {
            enc.map(3)?;
            put_str(enc, "dest_cluster", p.dest_cluster.as_str())?;
            put_str(enc, "src_cluster", p.src_cluster.as_str())?;
            put_str(enc, "store", p.store.as_str())?;
        }
        AdminPayload::AddVersion(p) => {
            let mut len = 6;
            if p.push_stream_source_address.is_some() {
                len += 1;
            }
            enc.map(len)?;
            put_str(enc, "cluster", p.cluster.as_str())?;
            enc.str("partition_count")?;
            enc.u32(p.partition_count)?;
            put_str(enc, "push_job_id", &p.push_job_id)?;
            if let Some(addr) = &p.push_stream_source_address {
                put_str(enc, "push_stream_source_address", addr)?;
            }
            put_str(enc, "push_type", p.push_type.as_str())?;
            put_str(enc, "store", p.store.as_str())?;
            enc.str("version_number")?;
            enc.i64(p.version_number)?;
        }
    }
    Ok(())
}

fn encode_store_target(
    enc: &mut Encoder<&mut Vec<u8>>,
    p: &StoreTarget,
) -> Result<(), EncodeError> {
    enc.map(2)?;
    put_str(enc, "cluster", p.cluster.as_str())?;
    put_str(enc, "store", p.store.as_str())?;
    Ok(())
}

fn decode_payload(
    dec: &mut Decoder<'_>,
    kind: AdminOperationKind,
) -> Result<AdminPayload, DecodeError> {
    match kind {
        AdminOperationKind::StoreCreation => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut owner = None;
            let mut key_schema = None;
            let mut value_schema = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "owner" => owner = Some(decode_text(dec)?.to_string()),
                    "key_schema" => key_schema = Some(decode_text(dec)?.to_string()),
                    "value_schema" => value_schema = Some(decode_text(dec)?.to_string()),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::StoreCreation(StoreCreation {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                owner: owner.ok_or(DecodeError::MissingField("owner"))?,
                key_schema: key_schema.ok_or(DecodeError::MissingField("key_schema"))?,
                value_schema: value_schema.ok_or(DecodeError::MissingField("value_schema"))?,
            }))
        }
        AdminOperationKind::ValueSchemaCreation => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut schema = None;
            let mut schema_id = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "schema" => schema = Some(decode_text(dec)?.to_string()),
                    "schema_id" => schema_id = Some(decode_i32(dec, "schema_id")?),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::ValueSchemaCreation(ValueSchemaCreation {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                schema: schema.ok_or(DecodeError::MissingField("schema"))?,
                schema_id: schema_id.ok_or(DecodeError::MissingField("schema_id"))?,
            }))
        }
        AdminOperationKind::DerivedSchemaCreation => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut schema = None;
            let mut value_schema_id = None;
            let mut derived_schema_id = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "schema" => schema = Some(decode_text(dec)?.to_string()),
                    "value_schema_id" => {
                        value_schema_id = Some(decode_i32(dec, "value_schema_id")?);
                    }
                    "derived_schema_id" => {
                        derived_schema_id = Some(decode_i32(dec, "derived_schema_id")?);
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::DerivedSchemaCreation(DerivedSchemaCreation {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                schema: schema.ok_or(DecodeError::MissingField("schema"))?,
                value_schema_id: value_schema_id
                    .ok_or(DecodeError::MissingField("value_schema_id"))?,
                derived_schema_id: derived_schema_id
                    .ok_or(DecodeError::MissingField("derived_schema_id"))?,
            }))
        }
        AdminOperationKind::SupersetSchemaCreation => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut value_schema = None;
            let mut value_schema_id = None;
            let mut superset_schema = None;
            let mut superset_schema_id = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "value_schema" => value_schema = Some(decode_text(dec)?.to_string()),
                    "value_schema_id" => {
                        value_schema_id = Some(decode_i32(dec, "value_schema_id")?);
                    }
                    "superset_schema" => superset_schema = Some(decode_text(dec)?.to_string()),
                    "superset_schema_id" => {
                        superset_schema_id = Some(decode_i32(dec, "superset_schema_id")?);
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::SupersetSchemaCreation(SupersetSchemaCreation {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                value_schema: value_schema.ok_or(DecodeError::MissingField("value_schema"))?,
                value_schema_id: value_schema_id
                    .ok_or(DecodeError::MissingField("value_schema_id"))?,
                superset_schema: superset_schema
                    .ok_or(DecodeError::MissingField("superset_schema"))?,
                superset_schema_id: superset_schema_id
                    .ok_or(DecodeError::MissingField("superset_schema_id"))?,
            }))
        }
        AdminOperationKind::DisableStoreWrite => {
            Ok(AdminPayload::DisableStoreWrite(decode_store_target(dec)?))
        }
        AdminOperationKind::EnableStoreWrite => {
            Ok(AdminPayload::EnableStoreWrite(decode_store_target(dec)?))
        }
        AdminOperationKind::DisableStoreRead => {
            Ok(AdminPayload::DisableStoreRead(decode_store_target(dec)?))
        }
        AdminOperationKind::EnableStoreRead => {
            Ok(AdminPayload::EnableStoreRead(decode_store_target(dec)?))
        }
        AdminOperationKind::DeleteAllVersions => {
            Ok(AdminPayload::DeleteAllVersions(decode_store_target(dec)?))
        }
        AdminOperationKind::KillOfflinePushJob => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut topic = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "topic" => topic = Some(decode_text(dec)?.to_string()),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::KillOfflinePushJob(KillOfflinePushJob {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                topic: topic.ok_or(DecodeError::MissingField("topic"))?,
            }))
        }
        AdminOperationKind::SetStoreCurrentVersion => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut version = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "version" => version = Some(decode_i64(dec, "version")?),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::SetStoreCurrentVersion(SetStoreCurrentVersion {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                version: version.ok_or(DecodeError::MissingField("version"))?,
            }))
        }
        AdminOperationKind::SetStoreOwner => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut owner = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "owner" => owner = Some(decode_text(dec)?.to_string()),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::SetStoreOwner(SetStoreOwner {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                owner: owner.ok_or(DecodeError::MissingField("owner"))?,
            }))
        }
        AdminOperationKind::SetStorePartition => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut partition_count = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "partition_count" => {
                        partition_count = Some(decode_u32(dec, "partition_count")?);
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::SetStorePartition(SetStorePartition {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                partition_count: partition_count
                    .ok_or(DecodeError::MissingField("partition_count"))?,
            }))
        }
        AdminOperationKind::UpdateStore => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut options = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "options" => options = Some(decode_update_options(dec)?),
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::UpdateStore(UpdateStore {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                options: options.ok_or(DecodeError::MissingField("options"))?,
            }))
        }
        AdminOperationKind::DeleteStore => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut largest = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "largest_used_version_number" => {
                        largest = Some(decode_i64(dec, "largest_used_version_number")?);
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::DeleteStore(DeleteStore {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                largest_used_version_number: largest
                    .ok_or(DecodeError::MissingField("largest_used_version_number"))?,
            }))
        }
        AdminOperationKind::DeleteOldVersion => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut version_number = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "version_number" => {
                        version_number = Some(decode_i64(dec, "version_number")?);
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::DeleteOldVersion(DeleteOldVersion {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                version_number: version_number
                    .ok_or(DecodeError::MissingField("version_number"))?,
            }))
        }
        AdminOperationKind::MigrateStore => {
            Ok(AdminPayload::MigrateStore(decode_migration_target(dec)?))
        }
        AdminOperationKind::AbortMigration => {
            Ok(AdminPayload::AbortMigration(decode_migration_target(dec)?))
        }
        AdminOperationKind::AddVersion => {
            let map_len = decode_map_len(dec)?;
            let mut cluster = None;
            let mut store = None;
            let mut push_job_id = None;
            let mut version_number = None;
            let mut partition_count = None;
            let mut push_type = None;
            let mut push_stream_source_address = None;
            for _ in 0..map_len {
                match decode_text(dec)? {
                    "cluster" => cluster = Some(decode_cluster(dec)?),
                    "store" => store = Some(decode_store(dec)?),
                    "push_job_id" => push_job_id = Some(decode_text(dec)?.to_string()),
                    "version_number" => {
                        version_number = Some(decode_i64(dec, "version_number")?);
                    }
                    "partition_count" => {
                        partition_count = Some(decode_u32(dec, "partition_count")?);
                    }
                    "push_type" => {
                        let raw = decode_text(dec)?;
                        push_type =
                            Some(PushType::parse(raw).ok_or(DecodeError::InvalidField {
                                field: "push_type",
                                reason: format!("unknown push type {raw:?}"),
                            })?);
                    }
                    "push_stream_source_address" => {
                        push_stream_source_address = Some(decode_text(dec)?.to_string());
                    }
                    _ => skip_value(dec)?,
                }
            }
            Ok(AdminPayload::AddVersion(AddVersion {
                cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
                store: store.ok_or(DecodeError::MissingField("store"))?,
                push_job_id: push_job_id.ok_or(DecodeError::MissingField("push_job_id"))?,
                version_number: version_number
                    .ok_or(DecodeError::MissingField("version_number"))?,
                partition_count: partition_count
                    .ok_or(DecodeError::MissingField("partition_count"))?,
                push_type: push_type.ok_or(DecodeError::MissingField("push_type"))?,
                push_stream_source_address,
            }))
        }
    }
}

fn decode_store_target(dec: &mut Decoder<'_>) -> Result<StoreTarget, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut cluster = None;
    let mut store = None;
    for _ in 0..map_len {
        match decode_text(dec)? {
            "cluster" => cluster = Some(decode_cluster(dec)?),
            "store" => store = Some(decode_store(dec)?),
            _ => skip_value(dec)?,
        }
    }
    Ok(StoreTarget {
        cluster: cluster.ok_or(DecodeError::MissingField("cluster"))?,
        store: store.ok_or(DecodeError::MissingField("store"))?,
    })
}

fn decode_migration_target(dec: &mut Decoder<'_>) -> Result<MigrationTarget, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut src_cluster = None;
    let mut dest_cluster = None;
    let mut store = None;
    for _ in 0..map_len {
        match decode_text(dec)? {
            "src_cluster" => src_cluster = Some(decode_cluster(dec)?),
            "dest_cluster" => dest_cluster = Some(decode_cluster(dec)?),
            "store" => store = Some(decode_store(dec)?),
            _ => skip_value(dec)?,
        }
    }
    Ok(MigrationTarget {
        src_cluster: src_cluster.ok_or(DecodeError::MissingField("src_cluster"))?,
        dest_cluster: dest_cluster.ok_or(DecodeError::MissingField("dest_cluster"))?,
        store: store.ok_or(DecodeError::MissingField("store"))?,
    })
}

// =============================================================================
// UpdateStoreOptions
// =============================================================================

fn encode_update_options(
    enc: &mut Encoder<&mut Vec<u8>>,
    o: &UpdateStoreOptions,
) -> Result<(), EncodeError> {
    // current_version is always present (sentinel-bearing); everything else
    // only when set.
    let len = 1
        + [
            o.access_controlled.is_some(),
            o.backup_strategy.is_some(),
            o.backup_version_retention_ms.is_some(),
            o.batch_get_limit.is_some(),
            o.batch_get_router_cache_enabled.is_some(),
            o.bootstrap_to_online_timeout_in_hours.is_some(),
            o.chunking_enabled.is_some(),
            o.client_decompression_enabled.is_some(),
            o.compression_strategy.is_some(),
            o.enable_reads.is_some(),
            o.enable_writes.is_some(),
            o.etl.is_some(),
            o.hybrid.is_some(),
            o.hybrid_store_disk_quota_enabled.is_some(),
            o.hybrid_store_overhead_bypass.is_some(),
            o.incremental_push_enabled.is_some(),
            o.incremental_push_policy.is_some(),
            o.is_migrating.is_some(),
            o.largest_used_version_number.is_some(),
            o.leader_follower_model_enabled.is_some(),
            o.native_replication_enabled.is_some(),
            o.num_versions_to_preserve.is_some(),
            o.owner.is_some(),
            o.partition_count.is_some(),
            o.partitioner.is_some(),
            o.push_stream_source_address.is_some(),
            o.read_computation_enabled.is_some(),
            o.read_quota_in_cu.is_some(),
            o.replication_factor.is_some(),
            o.schema_auto_register_from_push_job_enabled.is_some(),
            o.single_get_router_cache_enabled.is_some(),
            o.storage_quota_in_byte.is_some(),
            o.write_computation_enabled.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u64;
    enc.map(len)?;

    put_opt_bool(enc, "access_controlled", o.access_controlled)?;
    if let Some(v) = o.backup_strategy {
        put_str(enc, "backup_strategy", v.as_str())?;
    }
    put_opt_i64(enc, "backup_version_retention_ms", o.backup_version_retention_ms)?;
    put_opt_i32(enc, "batch_get_limit", o.batch_get_limit)?;
    put_opt_bool(enc, "batch_get_router_cache_enabled", o.batch_get_router_cache_enabled)?;
    put_opt_i32(
        enc,
        "bootstrap_to_online_timeout_in_hours",
        o.bootstrap_to_online_timeout_in_hours,
    )?;
    put_opt_bool(enc, "chunking_enabled", o.chunking_enabled)?;
    put_opt_bool(enc, "client_decompression_enabled", o.client_decompression_enabled)?;
    if let Some(v) = o.compression_strategy {
        put_str(enc, "compression_strategy", v.as_str())?;
    }
    enc.str("current_version")?;
    enc.i64(o.current_version)?;
    put_opt_bool(enc, "enable_reads", o.enable_reads)?;
    put_opt_bool(enc, "enable_writes", o.enable_writes)?;
    if let Some(etl) = &o.etl {
        enc.str("etl")?;
        enc.map(3)?;
        put_str(enc, "etled_proxy_user_account", &etl.etled_proxy_user_account)?;
        enc.str("future_version_etl_enabled")?;
        enc.bool(etl.future_version_etl_enabled)?;
        enc.str("regular_version_etl_enabled")?;
        enc.bool(etl.regular_version_etl_enabled)?;
    }
    if let Some(hybrid) = &o.hybrid {
        enc.str("hybrid")?;
        enc.map(2)?;
        enc.str("offset_lag_threshold")?;
        enc.i64(hybrid.offset_lag_threshold)?;
        enc.str("rewind_seconds")?;
        enc.i64(hybrid.rewind_seconds)?;
    }
    put_opt_bool(enc, "hybrid_store_disk_quota_enabled", o.hybrid_store_disk_quota_enabled)?;
    put_opt_bool(enc, "hybrid_store_overhead_bypass", o.hybrid_store_overhead_bypass)?;
    put_opt_bool(enc, "incremental_push_enabled", o.incremental_push_enabled)?;
    if let Some(v) = o.incremental_push_policy {
        put_str(enc, "incremental_push_policy", v.as_str())?;
    }
    put_opt_bool(enc, "is_migrating", o.is_migrating)?;
    put_opt_i64(enc, "largest_used_version_number", o.largest_used_version_number)?;
    put_opt_bool(enc, "leader_follower_model_enabled", o.leader_follower_model_enabled)?;
    put_opt_bool(enc, "native_replication_enabled", o.native_replication_enabled)?;
    put_opt_i32(enc, "num_versions_to_preserve", o.num_versions_to_preserve)?;
    if let Some(v) = &o.owner {
        put_str(enc, "owner", v)?;
    }
    if let Some(v) = o.partition_count {
        enc.str("partition_count")?;
        enc.u32(v)?;
    }
    if let Some(p) = &o.partitioner {
        enc.str("partitioner")?;
        enc.map(3)?;
        enc.str("amplification_factor")?;
        enc.i32(p.amplification_factor)?;
        put_str(enc, "partitioner_class", &p.partitioner_class)?;
        enc.str("partitioner_params")?;
        enc.map(p.partitioner_params.len() as u64)?;
        for (key, value) in &p.partitioner_params {
            put_str(enc, key, value)?;
        }
    }
    if let Some(v) = &o.push_stream_source_address {
        put_str(enc, "push_stream_source_address", v)?;
    }
    put_opt_bool(enc, "read_computation_enabled", o.read_computation_enabled)?;
    put_opt_i64(enc, "read_quota_in_cu", o.read_quota_in_cu)?;
    put_opt_i32(enc, "replication_factor", o.replication_factor)?;
    put_opt_bool(
        enc,
        "schema_auto_register_from_push_job_enabled",
        o.schema_auto_register_from_push_job_enabled,
    )?;
    put_opt_bool(enc, "single_get_router_cache_enabled", o.single_get_router_cache_enabled)?;
    put_opt_i64(enc, "storage_quota_in_byte", o.storage_quota_in_byte)?;
    put_opt_bool(enc, "write_computation_enabled", o.write_computation_enabled)?;
    Ok(())
}

fn decode_update_options(dec: &mut Decoder<'_>) -> Result<UpdateStoreOptions, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut o = UpdateStoreOptions::default();
    for _ in 0..map_len {
        match decode_text(dec)? {
            "access_controlled" => o.access_controlled = Some(decode_bool(dec, "access_controlled")?),
            "backup_strategy" => {
                let raw = decode_text(dec)?;
                o.backup_strategy =
                    Some(BackupStrategy::parse(raw).ok_or(DecodeError::InvalidField {
                        field: "backup_strategy",
                        reason: format!("unknown backup strategy {raw:?}"),
                    })?);
            }
            "backup_version_retention_ms" => {
                o.backup_version_retention_ms =
                    Some(decode_i64(dec, "backup_version_retention_ms")?);
            }
            "batch_get_limit" => o.batch_get_limit = Some(decode_i32(dec, "batch_get_limit")?),
            "batch_get_router_cache_enabled" => {
                o.batch_get_router_cache_enabled =
                    Some(decode_bool(dec, "batch_get_router_cache_enabled")?);
            }
            "bootstrap_to_online_timeout_in_hours" => {
                o.bootstrap_to_online_timeout_in_hours =
                    Some(decode_i32(dec, "bootstrap_to_online_timeout_in_hours")?);
            }
            "chunking_enabled" => o.chunking_enabled = Some(decode_bool(dec, "chunking_enabled")?),
            "client_decompression_enabled" => {
                o.client_decompression_enabled =
                    Some(decode_bool(dec, "client_decompression_enabled")?);
            }
            "compression_strategy" => {
                let raw = decode_text(dec)?;
                o.compression_strategy =
                    Some(CompressionStrategy::parse(raw).ok_or(DecodeError::InvalidField {
                        field: "compression_strategy",
                        reason: format!("unknown compression strategy {raw:?}"),
                    })?);
            }
            "current_version" => o.current_version = decode_i64(dec, "current_version")?,
            "enable_reads" => o.enable_reads = Some(decode_bool(dec, "enable_reads")?),
            "enable_writes" => o.enable_writes = Some(decode_bool(dec, "enable_writes")?),
            "etl" => o.etl = Some(decode_etl(dec)?),
            "hybrid" => o.hybrid = Some(decode_hybrid(dec)?),
            "hybrid_store_disk_quota_enabled" => {
                o.hybrid_store_disk_quota_enabled =
                    Some(decode_bool(dec, "hybrid_store_disk_quota_enabled")?);
            }
            "hybrid_store_overhead_bypass" => {
                o.hybrid_store_overhead_bypass =
                    Some(decode_bool(dec, "hybrid_store_overhead_bypass")?);
            }
            "incremental_push_enabled" => {
                o.incremental_push_enabled = Some(decode_bool(dec, "incremental_push_enabled")?);
            }
            "incremental_push_policy" => {
                let raw = decode_text(dec)?;
                o.incremental_push_policy =
                    Some(IncrementalPushPolicy::parse(raw).ok_or(DecodeError::InvalidField {
                        field: "incremental_push_policy",
                        reason: format!("unknown incremental push policy {raw:?}"),
                    })?);
            }
            "is_migrating" => o.is_migrating = Some(decode_bool(dec, "is_migrating")?),
            "largest_used_version_number" => {
                o.largest_used_version_number =
                    Some(decode_i64(dec, "largest_used_version_number")?);
            }
            "leader_follower_model_enabled" => {
                o.leader_follower_model_enabled =
                    Some(decode_bool(dec, "leader_follower_model_enabled")?);
            }
            "native_replication_enabled" => {
                o.native_replication_enabled =
                    Some(decode_bool(dec, "native_replication_enabled")?);
            }
            "num_versions_to_preserve" => {
                o.num_versions_to_preserve = Some(decode_i32(dec, "num_versions_to_preserve")?);
            }
            "owner" => o.owner = Some(decode_text(dec)?.to_string()),
            "partition_count" => o.partition_count = Some(decode_u32(dec, "partition_count")?),
            "partitioner" => o.partitioner = Some(decode_partitioner(dec)?),
            "push_stream_source_address" => {
                o.push_stream_source_address = Some(decode_text(dec)?.to_string());
            }
            "read_computation_enabled" => {
                o.read_computation_enabled = Some(decode_bool(dec, "read_computation_enabled")?);
            }
            "read_quota_in_cu" => o.read_quota_in_cu = Some(decode_i64(dec, "read_quota_in_cu")?),
            "replication_factor" => {
                o.replication_factor = Some(decode_i32(dec, "replication_factor")?);
            }
            "schema_auto_register_from_push_job_enabled" => {
                o.schema_auto_register_from_push_job_enabled =
                    Some(decode_bool(dec, "schema_auto_register_from_push_job_enabled")?);
            }
            "single_get_router_cache_enabled" => {
                o.single_get_router_cache_enabled =
                    Some(decode_bool(dec, "single_get_router_cache_enabled")?);
            }
            "storage_quota_in_byte" => {
                o.storage_quota_in_byte = Some(decode_i64(dec, "storage_quota_in_byte")?);
            }
            "write_computation_enabled" => {
                o.write_computation_enabled =
                    Some(decode_bool(dec, "write_computation_enabled")?);
            }
            _ => skip_value(dec)?,
        }
    }
    Ok(o)
}

fn decode_etl(dec: &mut Decoder<'_>) -> Result<EtlSettings, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut regular = None;
    let mut future = None;
    let mut proxy = None;
    for _ in 0..map_len {
        match decode_text(dec)? {
            "regular_version_etl_enabled" => {
                regular = Some(decode_bool(dec, "regular_version_etl_enabled")?);
            }
            "future_version_etl_enabled" => {
                future = Some(decode_bool(dec, "future_version_etl_enabled")?);
            }
            "etled_proxy_user_account" => proxy = Some(decode_text(dec)?.to_string()),
            _ => skip_value(dec)?,
        }
    }
    Ok(EtlSettings {
        regular_version_etl_enabled: regular
            .ok_or(DecodeError::MissingField("regular_version_etl_enabled"))?,
        future_version_etl_enabled: future
            .ok_or(DecodeError::MissingField("future_version_etl_enabled"))?,
        etled_proxy_user_account: proxy
            .ok_or(DecodeError::MissingField("etled_proxy_user_account"))?,
    })
}

fn decode_hybrid(dec: &mut Decoder<'_>) -> Result<HybridSettings, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut rewind = None;
    let mut lag = None;
    for _ in 0..map_len {
        match decode_text(dec)? {
            "rewind_seconds" => rewind = Some(decode_i64(dec, "rewind_seconds")?),
            "offset_lag_threshold" => lag = Some(decode_i64(dec, "offset_lag_threshold")?),
            _ => skip_value(dec)?,
        }
    }
    Ok(HybridSettings {
        rewind_seconds: rewind.ok_or(DecodeError::MissingField("rewind_seconds"))?,
        offset_lag_threshold: lag.ok_or(DecodeError::MissingField("offset_lag_threshold"))?,
    })
}

fn decode_partitioner(dec: &mut Decoder<'_>) -> Result<PartitionerSettings, DecodeError> {
    let map_len = decode_map_len(dec)?;
    let mut class = None;
    let mut params = BTreeMap::new();
    let mut amplification = None;
    for _ in 0..map_len {
        match decode_text(dec)? {
            "partitioner_class" => class = Some(decode_text(dec)?.to_string()),
            "amplification_factor" => {
                amplification = Some(decode_i32(dec, "amplification_factor")?);
            }
            "partitioner_params" => {
                let params_len = decode_map_len(dec)?;
                for _ in 0..params_len {
                    let key = decode_text(dec)?.to_string();
                    let value = decode_text(dec)?.to_string();
                    params.insert(key, value);
                }
            }
            _ => skip_value(dec)?,
        }
    }
    Ok(PartitionerSettings {
        partitioner_class: class.ok_or(DecodeError::MissingField("partitioner_class"))?,
        partitioner_params: params,
        amplification_factor: amplification
            .ok_or(DecodeError::MissingField("amplification_factor"))?,
    })
}

// =============================================================================
// CBOR helpers
// =============================================================================

fn put_str(enc: &mut Encoder<&mut Vec<u8>>, key: &str, value: &str) -> Result<(), EncodeError> {
    enc.str(key)?;
    enc.str(value)?;
    Ok(())
}

fn put_opt_bool(
    enc: &mut Encoder<&mut Vec<u8>>,
    key: &str,
    value: Option<bool>,
) -> Result<(), EncodeError> {
    if let Some(v) = value {
        enc.str(key)?;
        enc.bool(v)?;
    }
    Ok(())
}

fn put_opt_i32(
    enc: &mut Encoder<&mut Vec<u8>>,
    key: &str,
    value: Option<i32>,
) -> Result<(), EncodeError> {
    if let Some(v) = value {
        enc.str(key)?;
        enc.i32(v)?;
    }
    Ok(())
}

fn put_opt_i64(
    enc: &mut Encoder<&mut Vec<u8>>,
    key: &str,
    value: Option<i64>,
) -> Result<(), EncodeError> {
    if let Some(v) = value {
        enc.str(key)?;
        enc.i64(v)?;
    }
    Ok(())
}

fn decode_map_len(dec: &mut Decoder<'_>) -> Result<u64, DecodeError> {
    match dec.map()? {
        Some(len) => Ok(len),
        None => Err(DecodeError::IndefiniteLength),
    }
}

fn decode_text<'b>(dec: &mut Decoder<'b>) -> Result<&'b str, DecodeError> {
    if dec.datatype()? == Type::StringIndef {
        return Err(DecodeError::IndefiniteLength);
    }
    Ok(dec.str()?)
}

fn decode_cluster(dec: &mut Decoder<'_>) -> Result<ClusterName, DecodeError> {
    let raw = decode_text(dec)?;
    ClusterName::new(raw).map_err(|e| DecodeError::InvalidField {
        field: "cluster",
        reason: e.to_string(),
    })
}

fn decode_store(dec: &mut Decoder<'_>) -> Result<StoreName, DecodeError> {
    let raw = decode_text(dec)?;
    StoreName::new(raw).map_err(|e| DecodeError::InvalidField {
        field: "store",
        reason: e.to_string(),
    })
}

fn decode_u64(dec: &mut Decoder<'_>, field: &'static str) -> Result<u64, DecodeError> {
    dec.u64().map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn decode_u32(dec: &mut Decoder<'_>, field: &'static str) -> Result<u32, DecodeError> {
    dec.u32().map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn decode_i32(dec: &mut Decoder<'_>, field: &'static str) -> Result<i32, DecodeError> {
    dec.i32().map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn decode_i64(dec: &mut Decoder<'_>, field: &'static str) -> Result<i64, DecodeError> {
    dec.i64().map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn decode_bool(dec: &mut Decoder<'_>, field: &'static str) -> Result<bool, DecodeError> {
    dec.bool().map_err(|e| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn skip_value(dec: &mut Decoder<'_>) -> Result<(), DecodeError> {
    dec.skip()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionId, IGNORED_CURRENT_VERSION};

    fn cluster() -> ClusterName {
        ClusterName::new("cluster0").unwrap()
    }

    fn store() -> StoreName {
        StoreName::new("user_activity").unwrap()
    }

    fn roundtrip(op: &AdminOperation) -> AdminOperation {
        let codec = CborOperationCodec;
        let bytes = codec.encode(op).expect("encode");
        codec.decode(&bytes).expect("decode")
    }

    #[test]
    fn store_creation_roundtrip() {
        let op = AdminOperation {
            execution_id: ExecutionId(42),
            producer_time_ms: 1_650_000_000_000,
            payload: AdminPayload::StoreCreation(StoreCreation {
                cluster: cluster(),
                store: store(),
                owner: "team-feed".into(),
                key_schema: "\"string\"".into(),
                value_schema: "\"bytes\"".into(),
            }),
        };
        assert_eq!(roundtrip(&op), op);
    }

    #[test]
    fn update_store_sparse_roundtrip() {
        let options = UpdateStoreOptions {
            owner: Some("new-owner".into()),
            enable_writes: Some(false),
            current_version: 7,
            hybrid: Some(HybridSettings {
                rewind_seconds: 86_400,
                offset_lag_threshold: 1_000,
            }),
            partitioner: Some(PartitionerSettings {
                partitioner_class: "DefaultPartitioner".into(),
                partitioner_params: [("seed".to_string(), "13".to_string())].into(),
                amplification_factor: 1,
            }),
            backup_strategy: Some(BackupStrategy::DeleteOnNewPushStart),
            ..UpdateStoreOptions::default()
        };
        let op = AdminOperation {
            execution_id: ExecutionId(9),
            producer_time_ms: 5,
            payload: AdminPayload::UpdateStore(UpdateStore {
                cluster: cluster(),
                store: store(),
                options,
            }),
        };
        let decoded = roundtrip(&op);
        assert_eq!(decoded, op);
        match decoded.payload {
            AdminPayload::UpdateStore(p) => {
                assert_eq!(p.options.enable_reads, None);
                assert_eq!(p.options.current_version, 7);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn update_store_defaults_keep_sentinel() {
        let op = AdminOperation {
            execution_id: ExecutionId(1),
            producer_time_ms: 0,
            payload: AdminPayload::UpdateStore(UpdateStore {
                cluster: cluster(),
                store: store(),
                options: UpdateStoreOptions::default(),
            }),
        };
        match roundtrip(&op).payload {
            AdminPayload::UpdateStore(p) => {
                assert_eq!(p.options.current_version, IGNORED_CURRENT_VERSION);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn add_version_roundtrip_with_and_without_source() {
        let codec = CborOperationCodec;
        for source in [None, Some("kafka.dc2:9092".to_string())] {
            let op = AdminOperation {
                execution_id: ExecutionId(3),
                producer_time_ms: 77,
                payload: AdminPayload::AddVersion(AddVersion {
                    cluster: cluster(),
                    store: store(),
                    push_job_id: "push-2024-01".into(),
                    version_number: 12,
                    partition_count: 16,
                    push_type: PushType::Batch,
                    push_stream_source_address: source.clone(),
                }),
            };
            let decoded = codec.decode(&codec.encode(&op).unwrap()).unwrap();
            assert_eq!(decoded, op);
        }
    }

    #[test]
    fn all_kinds_roundtrip() {
        let target = StoreTarget {
            cluster: cluster(),
            store: store(),
        };
        let migration = MigrationTarget {
            src_cluster: cluster(),
            dest_cluster: ClusterName::new("cluster1").unwrap(),
            store: store(),
        };
        let payloads = vec![
            AdminPayload::DisableStoreWrite(target.clone()),
            AdminPayload::EnableStoreWrite(target.clone()),
            AdminPayload::DisableStoreRead(target.clone()),
            AdminPayload::EnableStoreRead(target.clone()),
            AdminPayload::DeleteAllVersions(target),
            AdminPayload::KillOfflinePushJob(KillOfflinePushJob {
                cluster: cluster(),
                topic: "user_activity_v3".into(),
            }),
            AdminPayload::SetStoreCurrentVersion(SetStoreCurrentVersion {
                cluster: cluster(),
                store: store(),
                version: 3,
            }),
            AdminPayload::SetStoreOwner(SetStoreOwner {
                cluster: cluster(),
                store: store(),
                owner: "owner2".into(),
            }),
            AdminPayload::SetStorePartition(SetStorePartition {
                cluster: cluster(),
                store: store(),
                partition_count: 8,
            }),
            AdminPayload::DeleteStore(DeleteStore {
                cluster: cluster(),
                store: store(),
                largest_used_version_number: 19,
            }),
            AdminPayload::DeleteOldVersion(DeleteOldVersion {
                cluster: cluster(),
                store: store(),
                version_number: 2,
            }),
            AdminPayload::MigrateStore(migration.clone()),
            AdminPayload::AbortMigration(migration),
            AdminPayload::ValueSchemaCreation(ValueSchemaCreation {
                cluster: cluster(),
                store: store(),
                schema: "{\"type\":\"record\"}".into(),
                schema_id: 4,
            }),
            AdminPayload::DerivedSchemaCreation(DerivedSchemaCreation {
                cluster: cluster(),
                store: store(),
                schema: "{\"type\":\"record\"}".into(),
                value_schema_id: 4,
                derived_schema_id: 1,
            }),
            AdminPayload::SupersetSchemaCreation(SupersetSchemaCreation {
                cluster: cluster(),
                store: store(),
                value_schema: "{\"v\":1}".into(),
                value_schema_id: 5,
                superset_schema: "{\"v\":2}".into(),
                superset_schema_id: 6,
            }),
        ];
        for (i, payload) in payloads.into_iter().enumerate() {
            let op = AdminOperation {
                execution_id: ExecutionId(i as u64 + 1),
                producer_time_ms: i as u64,
                payload,
            };
            assert_eq!(roundtrip(&op), op, "kind {}", op.kind());
        }
    }

    #[test]
    fn rejects_bad_magic_and_crc() {
        let codec = CborOperationCodec;
        let op = AdminOperation {
            execution_id: ExecutionId(1),
            producer_time_ms: 0,
            payload: AdminPayload::EnableStoreRead(StoreTarget {
                cluster: cluster(),
                store: store(),
            }),
        };
        let bytes = codec.encode(&op).unwrap();

        let mut bad_magic = bytes.to_vec();
        bad_magic[0] ^= 0xff;
        assert!(matches!(
            codec.decode(&bad_magic),
            Err(DecodeError::FrameMagicMismatch { .. })
        ));

        let mut bad_body = bytes.to_vec();
        let last = bad_body.len() - 1;
        bad_body[last] ^= 0xff;
        assert!(matches!(
            codec.decode(&bad_body),
            Err(DecodeError::FrameCrcMismatch { .. })
        ));

        assert!(matches!(
            codec.decode(&bytes[..6]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    fn frame_by_hand(envelope_v: u32, kind_tag: u32) -> Vec<u8> {
        let mut body = Vec::new();
        let mut enc = Encoder::new(&mut body);
        enc.map(5).unwrap();
        enc.str("envelope_v").unwrap();
        enc.u32(envelope_v).unwrap();
        enc.str("execution_id").unwrap();
        enc.u64(1).unwrap();
        enc.str("kind").unwrap();
        enc.u32(kind_tag).unwrap();
        enc.str("payload").unwrap();
        enc.map(0).unwrap();
        enc.str("producer_time_ms").unwrap();
        enc.u64(0).unwrap();

        let mut framed = Vec::new();
        framed.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
        framed.extend_from_slice(&crc32c(&body).to_le_bytes());
        framed.extend_from_slice(&body);
        framed
    }

    #[test]
    fn rejects_unknown_envelope_version_and_kind() {
        assert!(matches!(
            CborOperationCodec.decode(&frame_by_hand(ENVELOPE_VERSION, 999)),
            Err(DecodeError::UnknownKind(999))
        ));
        assert!(matches!(
            CborOperationCodec.decode(&frame_by_hand(2, 1)),
            Err(DecodeError::UnsupportedEnvelopeVersion(2))
        ));
    }
}
