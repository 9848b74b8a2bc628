//! Moderation: guarded staff actions and player reports.

pub mod handlers;
pub mod reports;
pub mod types;

pub use types::{
    BanRequest, ListReportsQuery, LockRequest, Report, ReportAction, ReportActionRecord,
    ReportContext, ReportId, ResolveReportRequest,
};
