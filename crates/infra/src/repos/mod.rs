pub mod attendance_records;
pub mod audit_log;
pub mod clubs;
pub mod coaches;
pub mod leave_requests;
pub mod members;
pub mod membership_applications;
pub mod training_sessions;

pub use attendance_records::{
    AttendanceCounts, AttendanceMethod, AttendanceStatus, UpsertedAttendance, WriteAttendance,
};
pub use audit_log::{ActorRole, AuditFilter, NewAuditEntry};
pub use clubs::CreateClub;
pub use coaches::CreateCoach;
pub use leave_requests::{CreateLeaveRequest, LeaveStatus};
pub use members::{AccessFlag, CreateMember, MemberFilter};
pub use membership_applications::{
    ApplicationFilter, ApplicationStatus, ApplicationTransition, CreateApplication,
};
pub use training_sessions::{CreateSessionData, SessionFilter, SessionStatus, UpdateSessionData};
