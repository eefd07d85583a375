//! State-dictionary tooling (spec §4.2, §4.7, C8): trie-key construction for
//! every state component, plus the diff/pretty-print helpers used by test
//! harnesses.

pub mod dictionary;
pub mod diff;

pub use dictionary::{
    component_key, deconstruct_component_key, deconstruct_preimage_key,
    deconstruct_preimage_lookup_key, deconstruct_service_base_key, deconstruct_storage_key,
    preimage_key, preimage_lookup_key, service_base_key, storage_key, DictKey, RetainedRange,
    TAG_SERVICE_BASE,
};
pub use diff::{DictionaryDiff, MerklizationDictionary};
