//! Per-subsystem state-transition functions (spec §4.5). Each module exports
//! one `apply_*` function taking a borrowed pre-state plus its extrinsic and
//! `&Params`, returning an owned post-state (or the untouched pre-state on
//! error, per spec §9 "Ownership model") — `jam-core` drives them in the
//! fixed order spec §2 specifies.

pub mod assurances;
pub mod disputes;
pub mod history;
pub mod preimages;
pub mod reports;
pub mod safrole;
pub mod statistics;

pub use assurances::{apply_assurances, AssuranceEntry, AssurancesError, AssurancesInput, AssurancesOutput};
pub use disputes::{apply_disputes, Culprit, DisputesError, DisputesInput, DisputesOutput, Fault, Judgement, Verdict};
pub use history::{apply_history, HistoryInput};
pub use preimages::{apply_preimages, PreimageEntry, PreimagesError, PreimagesInput};
pub use reports::{apply_reports, GuaranteeEntry, ReportsError, ReportsInput, ReportsOutput};
pub use safrole::{apply_safrole, EpochMark, SafroleError, SafroleInput, SafroleOutput, TicketEnvelope};
pub use statistics::{apply_statistics, StatisticsInput};
