//! `WorkReport`/`WorkResult` (spec §3), shaped after the teacher's
//! `DeferredTransfer`/`ProvisionEntry` pattern: a fixed-field struct plus
//! explicit codec functions, rather than a derive macro (the teacher's codec
//! is entirely hand-written free functions; this keeps the same texture).

use jam_codec::{
    decode_bytes, decode_fixed_u16, decode_fixed_u32, decode_fixed_u64, decode_natural,
    decode_option, decode_seq, encode_bytes, encode_fixed_u16, encode_fixed_u32, encode_fixed_u64,
    encode_natural, encode_option, encode_seq, CodecError, Reader, Result, Writer,
};

use crate::primitives::{
    CoreIndex, ErasureRoot, ExportsRoot, Gas, OpaqueHash, ServiceId, StateRoot, TimeSlot,
    WorkPackageHash,
};

/// The chain-historic context a report was produced against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineContext {
    pub anchor: HeaderAnchor,
    pub lookup_anchor: HeaderAnchor,
    pub lookup_anchor_slot: TimeSlot,
    pub prerequisites: Vec<WorkPackageHash>,
}

/// A header/state/beefy-root triple identifying an anchor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderAnchor {
    pub header_hash: OpaqueHash,
    pub state_root: StateRoot,
    pub beefy_root: OpaqueHash,
}

impl HeaderAnchor {
    pub fn encode(&self, w: &mut Writer) {
        self.header_hash.encode(w);
        self.state_root.encode(w);
        self.beefy_root.encode(w);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            header_hash: OpaqueHash::decode(r)?,
            state_root: StateRoot::decode(r)?,
            beefy_root: OpaqueHash::decode(r)?,
        })
    }
}

impl RefineContext {
    pub fn encode(&self, w: &mut Writer) {
        self.anchor.encode(w);
        self.lookup_anchor.encode(w);
        encode_fixed_u32(self.lookup_anchor_slot, w);
        encode_seq(&self.prerequisites, w, |h, w| h.encode(w));
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            anchor: HeaderAnchor::decode(r)?,
            lookup_anchor: HeaderAnchor::decode(r)?,
            lookup_anchor_slot: decode_fixed_u32(r)?,
            prerequisites: decode_seq(r, WorkPackageHash::decode)?,
        })
    }
}

/// Package spec: identity, size, and the two roots a report commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSpec {
    pub hash: WorkPackageHash,
    pub length: u32,
    pub erasure_root: ErasureRoot,
    pub exports_root: ExportsRoot,
    pub exports_count: u16,
}

impl PackageSpec {
    pub fn encode(&self, w: &mut Writer) {
        self.hash.encode(w);
        encode_fixed_u32(self.length, w);
        self.erasure_root.encode(w);
        self.exports_root.encode(w);
        encode_fixed_u16(self.exports_count, w);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            hash: WorkPackageHash::decode(r)?,
            length: decode_fixed_u32(r)?,
            erasure_root: ErasureRoot::decode(r)?,
            exports_root: ExportsRoot::decode(r)?,
            exports_count: decode_fixed_u16(r)?,
        })
    }
}

/// Tagged result variant for a single `WorkResult` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkExecResult {
    Ok(Vec<u8>),
    OutOfGas,
    Panic,
    BadCode,
    CodeOversize,
}

impl WorkExecResult {
    const TAG_OK: u8 = 0;
    const TAG_OUT_OF_GAS: u8 = 1;
    const TAG_PANIC: u8 = 2;
    const TAG_BAD_CODE: u8 = 3;
    const TAG_CODE_OVERSIZE: u8 = 4;

    pub fn encode(&self, w: &mut Writer) {
        match self {
            Self::Ok(bytes) => {
                w.push_byte(Self::TAG_OK);
                encode_bytes(bytes, w);
            }
            Self::OutOfGas => w.push_byte(Self::TAG_OUT_OF_GAS),
            Self::Panic => w.push_byte(Self::TAG_PANIC),
            Self::BadCode => w.push_byte(Self::TAG_BAD_CODE),
            Self::CodeOversize => w.push_byte(Self::TAG_CODE_OVERSIZE),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        match r.take_byte()? {
            Self::TAG_OK => Ok(Self::Ok(decode_bytes(r)?)),
            Self::TAG_OUT_OF_GAS => Ok(Self::OutOfGas),
            Self::TAG_PANIC => Ok(Self::Panic),
            Self::TAG_BAD_CODE => Ok(Self::BadCode),
            Self::TAG_CODE_OVERSIZE => Ok(Self::CodeOversize),
            other => Err(CodecError::BadDiscriminator(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkResult {
    pub service_id: ServiceId,
    pub code_hash: OpaqueHash,
    pub payload_hash: OpaqueHash,
    pub accumulate_gas: Gas,
    pub result: WorkExecResult,
    pub refine_load_gas_used: Gas,
    pub refine_load_imports: u32,
    pub refine_load_extrinsic_count: u32,
    pub refine_load_extrinsic_size: u32,
    pub refine_load_exports: u32,
}

impl WorkResult {
    pub fn encode(&self, w: &mut Writer) {
        encode_fixed_u32(self.service_id, w);
        self.code_hash.encode(w);
        self.payload_hash.encode(w);
        encode_fixed_u64(self.accumulate_gas, w);
        self.result.encode(w);
        encode_fixed_u64(self.refine_load_gas_used, w);
        encode_natural(u64::from(self.refine_load_imports), w);
        encode_natural(u64::from(self.refine_load_extrinsic_count), w);
        encode_natural(u64::from(self.refine_load_extrinsic_size), w);
        encode_natural(u64::from(self.refine_load_exports), w);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            service_id: decode_fixed_u32(r)?,
            code_hash: OpaqueHash::decode(r)?,
            payload_hash: OpaqueHash::decode(r)?,
            accumulate_gas: decode_fixed_u64(r)?,
            result: WorkExecResult::decode(r)?,
            refine_load_gas_used: decode_fixed_u64(r)?,
            refine_load_imports: decode_natural(r)? as u32,
            refine_load_extrinsic_count: decode_natural(r)? as u32,
            refine_load_extrinsic_size: decode_natural(r)? as u32,
            refine_load_exports: decode_natural(r)? as u32,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkReport {
    pub package_spec: PackageSpec,
    pub context: RefineContext,
    pub core_index: CoreIndex,
    pub authorizer_hash: OpaqueHash,
    pub auth_output: Vec<u8>,
    pub segment_root_lookup: Vec<(WorkPackageHash, ExportsRoot)>,
    pub results: Vec<WorkResult>,
    pub auth_gas_used: Gas,
}

impl WorkReport {
    pub fn encode(&self, w: &mut Writer) {
        self.package_spec.encode(w);
        self.context.encode(w);
        encode_fixed_u16(self.core_index, w);
        self.authorizer_hash.encode(w);
        encode_bytes(&self.auth_output, w);
        encode_seq(&self.segment_root_lookup, w, |(pkg, root), w| {
            pkg.encode(w);
            root.encode(w);
        });
        encode_seq(&self.results, w, |r, w| r.encode(w));
        encode_fixed_u64(self.auth_gas_used, w);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            package_spec: PackageSpec::decode(r)?,
            context: RefineContext::decode(r)?,
            core_index: decode_fixed_u16(r)?,
            authorizer_hash: OpaqueHash::decode(r)?,
            auth_output: decode_bytes(r)?,
            segment_root_lookup: decode_seq(r, |r| {
                Ok((WorkPackageHash::decode(r)?, ExportsRoot::decode(r)?))
            })?,
            results: decode_seq(r, WorkResult::decode)?,
            auth_gas_used: decode_fixed_u64(r)?,
        })
    }

    /// Result count bound by spec §3 ("1..4 `WorkResult`s").
    #[must_use]
    pub fn has_valid_result_count(&self) -> bool {
        (1..=4).contains(&self.results.len())
    }
}

pub fn encode_option_hash(value: &Option<OpaqueHash>, w: &mut Writer) {
    encode_option(value, w, |h, w| h.encode(w));
}

pub fn decode_option_hash(r: &mut Reader<'_>) -> Result<Option<OpaqueHash>> {
    decode_option(r, OpaqueHash::decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> WorkReport {
        WorkReport {
            package_spec: PackageSpec {
                hash: WorkPackageHash::zero(),
                length: 10,
                erasure_root: ErasureRoot::zero(),
                exports_root: ExportsRoot::zero(),
                exports_count: 0,
            },
            context: RefineContext {
                anchor: HeaderAnchor {
                    header_hash: OpaqueHash::zero(),
                    state_root: StateRoot::zero(),
                    beefy_root: OpaqueHash::zero(),
                },
                lookup_anchor: HeaderAnchor {
                    header_hash: OpaqueHash::zero(),
                    state_root: StateRoot::zero(),
                    beefy_root: OpaqueHash::zero(),
                },
                lookup_anchor_slot: 0,
                prerequisites: vec![],
            },
            core_index: 0,
            authorizer_hash: OpaqueHash::zero(),
            auth_output: vec![1, 2, 3],
            segment_root_lookup: vec![],
            results: vec![WorkResult {
                service_id: 7,
                code_hash: OpaqueHash::zero(),
                payload_hash: OpaqueHash::zero(),
                accumulate_gas: 1000,
                result: WorkExecResult::Ok(vec![9, 9]),
                refine_load_gas_used: 5,
                refine_load_imports: 0,
                refine_load_extrinsic_count: 0,
                refine_load_extrinsic_size: 0,
                refine_load_exports: 0,
            }],
            auth_gas_used: 42,
        }
    }

    #[test]
    fn work_report_roundtrip() {
        let report = sample_report();
        let mut w = Writer::new();
        report.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        let decoded = WorkReport::decode(&mut r).unwrap();
        r.finish().unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn result_count_validated() {
        let mut report = sample_report();
        assert!(report.has_valid_result_count());
        report.results.clear();
        assert!(!report.has_valid_result_count());
    }
}
