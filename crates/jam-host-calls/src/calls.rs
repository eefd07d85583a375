//! The accumulate host-call implementations, one function per index.
//!
//! Each call pays the 10-gas base charge in [`dispatch`] before doing
//! anything else, mirroring `pvm-rust/src/state_wrapper.rs::next_step_impl`
//! (gas is deducted by the step loop, not by each handler). A handler that
//! hits an unmapped RAM address returns [`HostCallOutcome::Trap`]; everything
//! else reports success or failure through `ω7` (and occasionally `ω8`)
//! using the sentinels in [`crate::codes`].

use jam_types::{OpaqueHash, ServiceAccount, ServiceId, ValidatorData};

use crate::codes;
use crate::context::{DeferredTransfer, HostCallContext};
use crate::ids;

const VALIDATOR_SIZE: usize = 32 + 32 + 144 + 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCallOutcome {
    Continue,
    OutOfGas,
    Trap,
}

pub fn dispatch(id: u64, ctx: &mut HostCallContext) -> HostCallOutcome {
    *ctx.gas -= jam_pvm::HOST_CALL_BASE_GAS;
    if *ctx.gas < 0 {
        return HostCallOutcome::OutOfGas;
    }
    match id {
        ids::GAS => gas(ctx),
        ids::LOOKUP => lookup(ctx),
        ids::READ => read(ctx),
        ids::WRITE => write(ctx),
        ids::INFO => info(ctx),
        ids::BLESS => bless(ctx),
        ids::ASSIGN => assign(ctx),
        ids::DESIGNATE => designate(ctx),
        ids::CHECKPOINT => checkpoint(ctx),
        ids::NEW => new_service(ctx),
        ids::UPGRADE => upgrade(ctx),
        ids::TRANSFER => transfer(ctx),
        ids::EJECT => eject(ctx),
        ids::QUERY => query(ctx),
        ids::SOLICIT => solicit(ctx),
        ids::FORGET => forget(ctx),
        ids::YIELD => yield_call(ctx),
        ids::DEBUG_LOG => debug_log(ctx),
        _ => {
            ctx.registers[7] = codes::WHAT;
            HostCallOutcome::Continue
        }
    }
}

fn read_ram(ctx: &mut HostCallContext, addr: u64, len: usize) -> Result<Vec<u8>, HostCallOutcome> {
    ctx.ram.read(addr as u32, len).map_err(|_| HostCallOutcome::Trap)
}

fn write_ram(ctx: &mut HostCallContext, addr: u64, data: &[u8]) -> Result<(), HostCallOutcome> {
    ctx.ram.write(addr as u32, data).map_err(|_| HostCallOutcome::Trap)
}

fn write_clamped(ctx: &mut HostCallContext, out_offset: u64, from: u64, len: u64, source: &[u8]) -> Result<(), HostCallOutcome> {
    let from = from as usize;
    let len = len as usize;
    let end = (from + len).min(source.len());
    let start = from.min(source.len());
    write_ram(ctx, out_offset, &source[start..end])
}

fn storage_hash(service_id: ServiceId, user_key: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(4 + user_key.len());
    buf.extend_from_slice(&service_id.to_le_bytes());
    buf.extend_from_slice(user_key);
    jam_crypto::blake2b256(&buf)
}

fn gas(ctx: &mut HostCallContext) -> HostCallOutcome {
    ctx.registers[7] = *ctx.gas as u64;
    HostCallOutcome::Continue
}

/// LOOKUP (1): `ω7` = service selector (`NONE` = self), `ω8` = hash offset,
/// `ω9` = output offset, `ω10` = from, `ω11` = length.
fn lookup(ctx: &mut HostCallContext) -> HostCallOutcome {
    let selector = ctx.registers[7];
    let hash_offset = ctx.registers[8];
    let out_offset = ctx.registers[9];
    let from = ctx.registers[10];
    let len = ctx.registers[11];

    let hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => h,
        Err(e) => return e,
    };
    let target = if selector == codes::NONE {
        ctx.service_id
    } else {
        selector as ServiceId
    };
    let value = ctx
        .services
        .get(&target)
        .and_then(|acc| acc.preimages.get(&OpaqueHash(hash.try_into().unwrap())))
        .cloned();

    match value {
        Some(bytes) => {
            if let Err(e) = write_clamped(ctx, out_offset, from, len, &bytes) {
                return e;
            }
            ctx.registers[7] = bytes.len() as u64;
        }
        None => ctx.registers[7] = codes::NONE,
    }
    HostCallOutcome::Continue
}

/// READ (2): `ω7` = key offset, `ω8` = key length, `ω9` = output offset,
/// `ω10` = from, `ω11` = length.
fn read(ctx: &mut HostCallContext) -> HostCallOutcome {
    let key_offset = ctx.registers[7];
    let key_len = ctx.registers[8];
    let out_offset = ctx.registers[9];
    let from = ctx.registers[10];
    let len = ctx.registers[11];

    let key_bytes = match read_ram(ctx, key_offset, key_len as usize) {
        Ok(k) => k,
        Err(e) => return e,
    };
    let hash = storage_hash(ctx.service_id, &key_bytes);
    let value = ctx
        .services
        .get(&ctx.service_id)
        .and_then(|acc| acc.storage.get(&hash))
        .cloned();

    match value {
        Some(bytes) => {
            if let Err(e) = write_clamped(ctx, out_offset, from, len, &bytes) {
                return e;
            }
            ctx.registers[7] = bytes.len() as u64;
        }
        None => ctx.registers[7] = codes::NONE,
    }
    HostCallOutcome::Continue
}

/// WRITE (3): `ω7` = key offset, `ω8` = key length, `ω9` = value offset,
/// `ω10` = value length. A zero-length value deletes the entry.
fn write(ctx: &mut HostCallContext) -> HostCallOutcome {
    let key_offset = ctx.registers[7];
    let key_len = ctx.registers[8];
    let value_offset = ctx.registers[9];
    let value_len = ctx.registers[10];

    let key_bytes = match read_ram(ctx, key_offset, key_len as usize) {
        Ok(k) => k,
        Err(e) => return e,
    };
    let new_value = if value_len == 0 {
        None
    } else {
        match read_ram(ctx, value_offset, value_len as usize) {
            Ok(v) => Some(v),
            Err(e) => return e,
        }
    };
    let hash = storage_hash(ctx.service_id, &key_bytes);

    let Some(account) = ctx.services.get_mut(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    let previous = account.storage.get(&hash).map(std::vec::Vec::len);
    let previous_entry = account.storage.insert(hash, new_value.clone().unwrap_or_default());
    if new_value.is_none() {
        account.storage.remove(&hash);
    }

    if account.meets_threshold(ctx.params) {
        ctx.registers[7] = previous.map_or(codes::NONE, |len| len as u64);
    } else {
        // Roll back: restore whatever was there before.
        match previous_entry {
            Some(prior_value) => {
                account.storage.insert(hash, prior_value);
            }
            None => {
                account.storage.remove(&hash);
            }
        }
        ctx.registers[7] = codes::FULL;
    }
    HostCallOutcome::Continue
}

/// INFO (4): `ω7` = service selector, `ω8` = output offset, `ω9` = from,
/// `ω10` = length. Encodes a fixed 96-byte account summary.
fn info(ctx: &mut HostCallContext) -> HostCallOutcome {
    let selector = ctx.registers[7];
    let out_offset = ctx.registers[8];
    let from = ctx.registers[9];
    let len = ctx.registers[10];

    let target = if selector == codes::NONE {
        ctx.service_id
    } else {
        selector as ServiceId
    };
    let Some(account) = ctx.services.get(&target) else {
        ctx.registers[7] = codes::NONE;
        return HostCallOutcome::Continue;
    };

    let (items, octets) = account.footprint();
    let threshold = account.threshold_balance(ctx.params);
    let mut blob = Vec::with_capacity(96);
    blob.extend_from_slice(&account.code_hash.0);
    blob.extend_from_slice(&account.balance.to_le_bytes());
    blob.extend_from_slice(&threshold.to_le_bytes());
    blob.extend_from_slice(&account.min_gas_accumulate.to_le_bytes());
    blob.extend_from_slice(&account.min_gas_on_transfer.to_le_bytes());
    blob.extend_from_slice(&octets.to_le_bytes());
    blob.extend_from_slice(&(items as u32).to_le_bytes());
    blob.extend_from_slice(&account.gratis_storage_offset.to_le_bytes());
    blob.extend_from_slice(&account.creation_slot.to_le_bytes());
    blob.extend_from_slice(&account.last_accumulation_slot.to_le_bytes());
    blob.extend_from_slice(&account.parent_service.unwrap_or(0).to_le_bytes());
    debug_assert_eq!(blob.len(), 96);

    if let Err(e) = write_clamped(ctx, out_offset, from, len, &blob) {
        return e;
    }
    ctx.registers[7] = 96;
    HostCallOutcome::Continue
}

/// BLESS (5): only the current manager may reassign the manager/assigners/
/// delegator/always-accumulate privilege set, and only to known service ids
/// (spec §4.4: "`WHO` if caller is not manager or any id is unknown").
fn bless(ctx: &mut HostCallContext) -> HostCallOutcome {
    if ctx.service_id != ctx.privileges.manager {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    }
    let manager = ctx.registers[7] as ServiceId;
    let assigners_offset = ctx.registers[8];
    let delegator = ctx.registers[9] as ServiceId;
    let always_accessors_offset = ctx.registers[10];
    let n = ctx.registers[11];

    let core_count = ctx.auth_queues.len();
    let assigners_bytes = match read_ram(ctx, assigners_offset, core_count * 4) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let assigners: Vec<ServiceId> = assigners_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();

    let accessors_bytes = match read_ram(ctx, always_accessors_offset, n as usize * 12) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let mut always_accumulate = std::collections::BTreeMap::new();
    for entry in accessors_bytes.chunks_exact(12) {
        let sid = u32::from_le_bytes(entry[0..4].try_into().unwrap());
        let gas = u64::from_le_bytes(entry[4..12].try_into().unwrap());
        always_accumulate.insert(sid, gas);
    }

    let unknown = !ctx.services.contains_key(&manager)
        || !ctx.services.contains_key(&delegator)
        || assigners.iter().any(|sid| !ctx.services.contains_key(sid))
        || always_accumulate.keys().any(|sid| !ctx.services.contains_key(sid));
    if unknown {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    }

    ctx.privileges.manager = manager;
    ctx.privileges.assigners = assigners;
    ctx.privileges.designate = delegator;
    ctx.privileges.always_accumulate = always_accumulate;
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// ASSIGN (6): the assigner of `core_index` replaces its pending
/// authorization queue and hands the assigner slot to a new service.
fn assign(ctx: &mut HostCallContext) -> HostCallOutcome {
    let core_index = ctx.registers[7] as usize;
    let auth_queue_offset = ctx.registers[8];
    let new_assigner = ctx.registers[9] as ServiceId;

    if core_index >= ctx.auth_queues.len() {
        ctx.registers[7] = codes::CORE;
        return HostCallOutcome::Continue;
    }
    if ctx.privileges.assigners.get(core_index) != Some(&ctx.service_id) {
        ctx.registers[7] = codes::HUH;
        return HostCallOutcome::Continue;
    }

    let queue_len = ctx.params.max_authorizations_queue_items as usize;
    let bytes = match read_ram(ctx, auth_queue_offset, queue_len * 32) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let queue = bytes.chunks_exact(32).map(|c| OpaqueHash(c.try_into().unwrap())).collect();

    ctx.auth_queues[core_index] = queue;
    ctx.privileges.assigners[core_index] = new_assigner;
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// DESIGNATE (7): only the delegator service may replace the next-epoch
/// validator set.
fn designate(ctx: &mut HostCallContext) -> HostCallOutcome {
    if ctx.service_id != ctx.privileges.designate {
        ctx.registers[7] = codes::HUH;
        return HostCallOutcome::Continue;
    }
    let validators_offset = ctx.registers[7];
    let count = ctx.next_validators.len();
    let bytes = match read_ram(ctx, validators_offset, count * VALIDATOR_SIZE) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let mut decoded = Vec::with_capacity(count);
    for chunk in bytes.chunks_exact(VALIDATOR_SIZE) {
        let mut r = jam_codec::Reader::new(chunk);
        match ValidatorData::decode(&mut r) {
            Ok(v) => decoded.push(v),
            Err(_) => {
                ctx.registers[7] = codes::WHAT;
                return HostCallOutcome::Continue;
            }
        }
    }
    *ctx.next_validators = decoded;
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// CHECKPOINT (8): marks the current accumulation dimension as the point to
/// roll back to if a later operation in the same invocation panics.
fn checkpoint(ctx: &mut HostCallContext) -> HostCallOutcome {
    *ctx.checkpoint_requested = true;
    ctx.registers[7] = *ctx.gas as u64;
    HostCallOutcome::Continue
}

const NEXTFREEID_MODULUS_BASE: u64 = 1u64 << 32;

fn next_free_service_id(ctx: &HostCallContext, desired: Option<ServiceId>) -> ServiceId {
    if let Some(id) = desired {
        if !ctx.services.contains_key(&id) {
            return id;
        }
    }
    let min_public = u64::from(ctx.params.min_public_service_index);
    let modulus = NEXTFREEID_MODULUS_BASE - (1u64 << 8) - min_public;
    let mut candidate = u64::from(*ctx.next_free_id);
    loop {
        let id = (candidate % modulus + min_public) as ServiceId;
        if !ctx.services.contains_key(&id) {
            return id;
        }
        candidate += 1;
    }
}

/// NEW (9): `ω7` = code hash offset, `ω8` = code length, `ω9` = min
/// accumulate gas, `ω10` = min on-transfer gas, `ω11` = gratis offset,
/// `ω12` = desired id (or `NONE` for auto-allocation).
fn new_service(ctx: &mut HostCallContext) -> HostCallOutcome {
    let code_hash_offset = ctx.registers[7];
    let code_len = ctx.registers[8];
    let min_acc_gas = ctx.registers[9];
    let min_memo_gas = ctx.registers[10];
    let gratis = ctx.registers[11];
    let desired = ctx.registers[12];

    let code_hash = match read_ram(ctx, code_hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };

    let desired_id = if desired == codes::NONE {
        None
    } else {
        Some(desired as ServiceId)
    };
    let new_id = next_free_service_id(ctx, desired_id);

    let mut account = ServiceAccount::new(code_hash, ctx.timeslot);
    account.min_gas_accumulate = min_acc_gas;
    account.min_gas_on_transfer = min_memo_gas;
    account.gratis_storage_offset = gratis;
    account.parent_service = Some(ctx.service_id);
    account.preimage_lookups.insert(
        jam_types::PreimageLookupKey {
            hash: code_hash,
            length: code_len as u32,
        },
        vec![],
    );
    let new_threshold = account.threshold_balance(ctx.params);
    account.balance = new_threshold;

    let Some(creator) = ctx.services.get_mut(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    if creator.balance < new_threshold || creator.balance - new_threshold < creator.threshold_balance(ctx.params) {
        ctx.registers[7] = codes::CASH;
        return HostCallOutcome::Continue;
    }
    creator.balance -= new_threshold;

    ctx.services.insert(new_id, account);
    let next_id = next_free_service_id(ctx, None);
    *ctx.next_free_id = next_id;
    ctx.registers[7] = u64::from(new_id);
    HostCallOutcome::Continue
}

/// UPGRADE (10): replaces the calling service's own code hash and gas
/// minimums.
fn upgrade(ctx: &mut HostCallContext) -> HostCallOutcome {
    let code_hash_offset = ctx.registers[7];
    let new_min_acc_gas = ctx.registers[8];
    let new_min_memo_gas = ctx.registers[9];

    let code_hash = match read_ram(ctx, code_hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };
    let Some(account) = ctx.services.get_mut(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    account.code_hash = code_hash;
    account.min_gas_accumulate = new_min_acc_gas;
    account.min_gas_on_transfer = new_min_memo_gas;
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// TRANSFER (11): queues a deferred transfer, paying `ω9`'s gas limit on top
/// of the base host-call charge.
fn transfer(ctx: &mut HostCallContext) -> HostCallOutcome {
    let dest = ctx.registers[7] as ServiceId;
    let amount = ctx.registers[8];
    let gas_limit = ctx.registers[9];
    let memo_offset = ctx.registers[10];

    let Some(dest_account) = ctx.services.get(&dest) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    if gas_limit < dest_account.min_gas_on_transfer {
        ctx.registers[7] = codes::LOW;
        return HostCallOutcome::Continue;
    }

    let Some(source) = ctx.services.get(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    if source.balance < amount {
        ctx.registers[7] = codes::CASH;
        return HostCallOutcome::Continue;
    }
    let remaining = source.balance - amount;
    if remaining < source.threshold_balance(ctx.params) {
        ctx.registers[7] = codes::CASH;
        return HostCallOutcome::Continue;
    }

    if *ctx.gas < gas_limit as i64 {
        return HostCallOutcome::OutOfGas;
    }

    let memo_len = ctx.params.transfer_memo_size as usize;
    let memo = match read_ram(ctx, memo_offset, memo_len) {
        Ok(m) => m,
        Err(e) => return e,
    };

    *ctx.gas -= gas_limit as i64;
    ctx.services.get_mut(&ctx.service_id).expect("checked above").balance -= amount;
    ctx.transfers_out.push(DeferredTransfer {
        source: ctx.service_id,
        dest,
        amount,
        memo,
        gas_limit,
    });
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// EJECT (12): the creating service reclaims an orphaned child account's
/// balance once it proves it knows the child's exact code hash.
fn eject(ctx: &mut HostCallContext) -> HostCallOutcome {
    let target_id = ctx.registers[7] as ServiceId;
    let hash_offset = ctx.registers[8];
    let proof_hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };

    let Some(target) = ctx.services.get(&target_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    if target.parent_service != Some(ctx.service_id) || target.code_hash != proof_hash {
        ctx.registers[7] = codes::HUH;
        return HostCallOutcome::Continue;
    }
    let balance = target.balance;
    ctx.services.remove(&target_id);
    if let Some(acc) = ctx.services.get_mut(&ctx.service_id) {
        acc.balance += balance;
    }
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// QUERY (13): reports the preimage-lookup timeslot history for a hash the
/// calling service has solicited, packing up to two slots per register.
fn query(ctx: &mut HostCallContext) -> HostCallOutcome {
    let hash_offset = ctx.registers[7];
    let preimage_size = ctx.registers[8] as u32;
    let hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };
    let key = jam_types::PreimageLookupKey {
        hash,
        length: preimage_size,
    };
    let Some(slots) = ctx
        .services
        .get(&ctx.service_id)
        .and_then(|a| a.preimage_lookups.get(&key))
        .cloned()
    else {
        ctx.registers[7] = codes::NONE;
        return HostCallOutcome::Continue;
    };
    const TWO_TO_32: u64 = 1u64 << 32;
    match slots.as_slice() {
        [] => ctx.registers[7] = 0,
        [x] => ctx.registers[7] = 1 + (u64::from(*x) * TWO_TO_32),
        [x, y] => {
            ctx.registers[7] = 2 + (u64::from(*x) * TWO_TO_32);
            ctx.registers[8] = u64::from(*y);
        }
        [x, y, z] => {
            ctx.registers[7] = 3 + (u64::from(*x) * TWO_TO_32);
            ctx.registers[8] = u64::from(*y) + (u64::from(*z) * TWO_TO_32);
        }
        _ => unreachable!("preimage lookups cap at three slots"),
    }
    HostCallOutcome::Continue
}

/// SOLICIT (14): `ω7` = hash offset, `ω8` = preimage size. Opens a new
/// pending lookup, or re-solicits one that was provided then forgotten.
fn solicit(ctx: &mut HostCallContext) -> HostCallOutcome {
    let hash_offset = ctx.registers[7];
    let preimage_size = ctx.registers[8] as u32;
    let hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };
    let key = jam_types::PreimageLookupKey {
        hash,
        length: preimage_size,
    };
    let timeslot = ctx.timeslot;

    let Some(account_ref) = ctx.services.get(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    let existing_len = account_ref.preimage_lookups.get(&key).map(Vec::len);
    if !matches!(existing_len, None | Some(2)) {
        ctx.registers[7] = codes::HUH;
        return HostCallOutcome::Continue;
    }

    let account = ctx
        .services
        .get_mut(&ctx.service_id)
        .expect("existence checked above");
    match existing_len {
        None => {
            account.preimage_lookups.insert(key, vec![]);
        }
        Some(2) => {
            account.push_lookup_slot(key, timeslot).expect("length checked above");
        }
        _ => unreachable!("checked above"),
    }

    if account.meets_threshold(ctx.params) {
        ctx.registers[7] = codes::OK;
    } else {
        match existing_len {
            None => {
                account.preimage_lookups.remove(&key);
            }
            Some(_) => {
                account.preimage_lookups.get_mut(&key).expect("just pushed").pop();
            }
        }
        ctx.registers[7] = codes::FULL;
    }
    HostCallOutcome::Continue
}

/// FORGET (15): `ω7` = hash offset, `ω8` = preimage length. Retires a
/// lookup's timeslot history once the expungement period has elapsed.
fn forget(ctx: &mut HostCallContext) -> HostCallOutcome {
    let hash_offset = ctx.registers[7];
    let preimage_len = ctx.registers[8] as u32;
    let hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };
    let key = jam_types::PreimageLookupKey {
        hash,
        length: preimage_len,
    };
    let now = ctx.timeslot;
    let period = ctx.params.preimage_expungement_period;

    let Some(account) = ctx.services.get_mut(&ctx.service_id) else {
        ctx.registers[7] = codes::WHO;
        return HostCallOutcome::Continue;
    };
    let Some(slots) = account.preimage_lookups.get(&key).cloned() else {
        ctx.registers[7] = codes::HUH;
        return HostCallOutcome::Continue;
    };

    let outcome = match slots.as_slice() {
        [] => {
            account.preimage_lookups.remove(&key);
            account.preimages.remove(&hash);
            codes::OK
        }
        [provided] => {
            if now.saturating_sub(*provided) < period {
                codes::HUH
            } else {
                account.preimage_lookups.insert(key, vec![*provided, now]);
                account.preimages.remove(&hash);
                codes::OK
            }
        }
        [_, _] => codes::HUH,
        [_, resolicited_at, forgotten_at] => {
            if now.saturating_sub(*forgotten_at) < period {
                codes::HUH
            } else {
                account.preimage_lookups.insert(key, vec![*resolicited_at]);
                codes::OK
            }
        }
        _ => unreachable!("preimage lookups cap at three slots"),
    };
    ctx.registers[7] = outcome;
    HostCallOutcome::Continue
}

/// YIELD (16): records the accumulation-root contribution hash for this
/// invocation.
fn yield_call(ctx: &mut HostCallContext) -> HostCallOutcome {
    let hash_offset = ctx.registers[7];
    let hash = match read_ram(ctx, hash_offset, 32) {
        Ok(h) => OpaqueHash(h.try_into().unwrap()),
        Err(e) => return e,
    };
    *ctx.yield_hash = Some(hash);
    ctx.registers[7] = codes::OK;
    HostCallOutcome::Continue
}

/// LOG (100): debug-only, never fails. `ω7` = level, `ω8` = message offset,
/// `ω9` = message length.
fn debug_log(ctx: &mut HostCallContext) -> HostCallOutcome {
    let level = ctx.registers[7];
    let msg_offset = ctx.registers[8];
    let msg_len = ctx.registers[9];
    let message = match read_ram(ctx, msg_offset, msg_len as usize) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return e,
    };
    tracing::debug!(service = ctx.service_id, level, %message, "pvm log");
    ctx.log.push(message);
    HostCallOutcome::Continue
}
