use crate::repos::attendance_records::{AttendanceMethod, AttendanceStatus};
use crate::repos::audit_log::ActorRole;
use crate::repos::leave_requests::LeaveStatus;
use crate::repos::members::AccessFlag;
use crate::repos::membership_applications::ApplicationStatus;
use crate::repos::training_sessions::SessionStatus;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClubRow {
    pub id: Uuid,
    pub name: String,
    pub sport_category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberRow {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub club_id: Uuid,
    pub access_flag: AccessFlag,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub health_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CoachRow {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub club_id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Personal details captured when the application was (re)submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub health_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdCard,
    MedicalCertificate,
    Photo,
    ParentalConsent,
    Other,
}

/// Reference to a file held by the document store. Bytes never pass through here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub url: String,
    pub file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationActivityKind {
    Submitted,
    Resubmitted,
    InfoRequested,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub kind: ApplicationActivityKind,
    pub note: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MembershipApplicationRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub personal_info: Json<PersonalInfo>,
    pub documents: Json<Vec<DocumentRef>>,
    pub status: ApplicationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub activity_log: Json<Vec<ApplicationActivity>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainingSessionRow {
    pub id: Uuid,
    pub club_id: Uuid,
    pub coach_id: Uuid,
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub status: SessionStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingSessionRow {
    /// Scheduled start as an instant. Session times are stored in UTC.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.session_date.and_time(self.start_time).and_utc()
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.session_date.and_time(self.end_time).and_utc()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttendanceRecordRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub status: AttendanceStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub method: AttendanceMethod,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaveRequestRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub reason: String,
    pub status: LeaveStatus,
    pub requested_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub seq: i64,
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub club_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub prev_hash: String,
    pub entry_hash: String,
}
