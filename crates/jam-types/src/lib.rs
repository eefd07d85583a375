//! Typed state data model (spec §3, component C3).

pub mod params;
pub mod primitives;
pub mod service;
pub mod state;
pub mod work_report;

pub use params::Params;
pub use primitives::*;
pub use service::{PreimageLookupKey, ServiceAccount, ServiceAccountError};
pub use state::{
    AccumulatedReports, Assignment, AuthPools, AuthQueues, BlockInfo, CoreActivityRecord,
    DisputesRecords, JamState, PendingReports, Privileges, ReadyRecord, RecentHistory,
    ReportsReady, SafroleState, ServiceActivityRecord, Services, SlotSealerSeries, Ticket,
    ValidatorActivityRecord, ValidatorStats,
};
pub use work_report::{
    HeaderAnchor, PackageSpec, RefineContext, WorkExecResult, WorkReport, WorkResult,
};
