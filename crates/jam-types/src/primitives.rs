//! Primitive semantic types (spec §3).

use jam_codec::{decode_fixed_bytes, decode_fixed_u32, encode_fixed_bytes, encode_fixed_u32, Reader, Result, Writer};

macro_rules! opaque_hash_newtype {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            #[must_use]
            pub fn zero() -> Self {
                Self([0u8; 32])
            }

            pub fn encode(&self, w: &mut Writer) {
                encode_fixed_bytes(&self.0, w);
            }

            pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
                Ok(Self(decode_fixed_bytes(r)?))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(value: [u8; 32]) -> Self {
                Self(value)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

opaque_hash_newtype!(OpaqueHash);
opaque_hash_newtype!(WorkPackageHash);
opaque_hash_newtype!(WorkReportHash);
opaque_hash_newtype!(ExportsRoot);
opaque_hash_newtype!(ErasureRoot);
opaque_hash_newtype!(StateRoot);
opaque_hash_newtype!(HeaderHash);
opaque_hash_newtype!(BeefyRoot);
opaque_hash_newtype!(Entropy);

/// Four-slot rotating entropy buffer (η), newest at index 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntropyBuffer(pub [Entropy; 4]);

impl EntropyBuffer {
    /// Roll a fresh entropy value in at the front, shifting the rest back
    /// (spec §3: "Rolled by every STF pass").
    pub fn roll(&mut self, fresh: Entropy) {
        self.0[3] = self.0[2];
        self.0[2] = self.0[1];
        self.0[1] = self.0[0];
        self.0[0] = fresh;
    }

    pub fn encode(&self, w: &mut Writer) {
        for slot in &self.0 {
            slot.encode(w);
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let mut out = [Entropy::zero(); 4];
        for slot in &mut out {
            *slot = Entropy::decode(r)?;
        }
        Ok(Self(out))
    }
}

pub type TimeSlot = u32;
pub type ServiceId = u32;
pub type ValidatorIndex = u16;
pub type CoreIndex = u16;
pub type Gas = u64;
pub type Balance = u64;

pub fn encode_time_slot(value: TimeSlot, w: &mut Writer) {
    encode_fixed_u32(value, w);
}

pub fn decode_time_slot(r: &mut Reader<'_>) -> Result<TimeSlot> {
    decode_fixed_u32(r)
}

pub fn encode_service_id(value: ServiceId, w: &mut Writer) {
    encode_fixed_u32(value, w);
}

pub fn decode_service_id(r: &mut Reader<'_>) -> Result<ServiceId> {
    decode_fixed_u32(r)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ed25519Public(pub [u8; 32]);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandersnatchPublic(pub [u8; 32]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlsPublic(pub [u8; 144]);

impl Default for BlsPublic {
    fn default() -> Self {
        Self([0u8; 144])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorMetadata(pub [u8; 128]);

impl Default for ValidatorMetadata {
    fn default() -> Self {
        Self([0u8; 128])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandersnatchVrfSignature(pub [u8; 96]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandersnatchRingVrfSignature(pub [u8; 784]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

/// A single validator's public key bundle, ordered the same way across
/// `ι`/`κ`/`λ` (next/current/previous).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorData {
    pub bandersnatch: BandersnatchPublic,
    pub ed25519: Ed25519Public,
    pub bls: BlsPublic,
    pub metadata: ValidatorMetadata,
}

impl Default for ValidatorData {
    fn default() -> Self {
        Self {
            bandersnatch: BandersnatchPublic::default(),
            ed25519: Ed25519Public::default(),
            bls: BlsPublic::default(),
            metadata: ValidatorMetadata::default(),
        }
    }
}

impl ValidatorData {
    pub fn encode(&self, w: &mut Writer) {
        encode_fixed_bytes(&self.bandersnatch.0, w);
        encode_fixed_bytes(&self.ed25519.0, w);
        encode_fixed_bytes(&self.bls.0, w);
        encode_fixed_bytes(&self.metadata.0, w);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            bandersnatch: BandersnatchPublic(decode_fixed_bytes(r)?),
            ed25519: Ed25519Public(decode_fixed_bytes(r)?),
            bls: BlsPublic(decode_fixed_bytes(r)?),
            metadata: ValidatorMetadata(decode_fixed_bytes(r)?),
        })
    }
}
