use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use infra::models::{
    ApplicationActivity, ApplicationActivityKind, DocumentKind as DocumentKindRow,
    DocumentRef as DocumentRefRow, MembershipApplicationRow, PersonalInfo as PersonalInfoRow,
};
use infra::repos::ApplicationStatus as ApplicationStatusRow;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ApplicationStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "APPROVED")]
    Approved,
    #[graphql(name = "REJECTED")]
    Rejected,
    #[graphql(name = "INFO_REQUESTED")]
    InfoRequested,
}

impl From<ApplicationStatusRow> for ApplicationStatus {
    fn from(status: ApplicationStatusRow) -> Self {
        match status {
            ApplicationStatusRow::Pending => ApplicationStatus::Pending,
            ApplicationStatusRow::Approved => ApplicationStatus::Approved,
            ApplicationStatusRow::Rejected => ApplicationStatus::Rejected,
            ApplicationStatusRow::InfoRequested => ApplicationStatus::InfoRequested,
        }
    }
}

impl From<ApplicationStatus> for ApplicationStatusRow {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Pending => ApplicationStatusRow::Pending,
            ApplicationStatus::Approved => ApplicationStatusRow::Approved,
            ApplicationStatus::Rejected => ApplicationStatusRow::Rejected,
            ApplicationStatus::InfoRequested => ApplicationStatusRow::InfoRequested,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ReviewDecision {
    #[graphql(name = "APPROVE")]
    Approve,
    #[graphql(name = "REJECT")]
    Reject,
    #[graphql(name = "REQUEST_INFO")]
    RequestInfo,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DocumentKind {
    #[graphql(name = "ID_CARD")]
    IdCard,
    #[graphql(name = "MEDICAL_CERTIFICATE")]
    MedicalCertificate,
    #[graphql(name = "PHOTO")]
    Photo,
    #[graphql(name = "PARENTAL_CONSENT")]
    ParentalConsent,
    #[graphql(name = "OTHER")]
    Other,
}

impl From<DocumentKindRow> for DocumentKind {
    fn from(kind: DocumentKindRow) -> Self {
        match kind {
            DocumentKindRow::IdCard => DocumentKind::IdCard,
            DocumentKindRow::MedicalCertificate => DocumentKind::MedicalCertificate,
            DocumentKindRow::Photo => DocumentKind::Photo,
            DocumentKindRow::ParentalConsent => DocumentKind::ParentalConsent,
            DocumentKindRow::Other => DocumentKind::Other,
        }
    }
}

impl From<DocumentKind> for DocumentKindRow {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::IdCard => DocumentKindRow::IdCard,
            DocumentKind::MedicalCertificate => DocumentKindRow::MedicalCertificate,
            DocumentKind::Photo => DocumentKindRow::Photo,
            DocumentKind::ParentalConsent => DocumentKindRow::ParentalConsent,
            DocumentKind::Other => DocumentKindRow::Other,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ActivityKind {
    #[graphql(name = "SUBMITTED")]
    Submitted,
    #[graphql(name = "RESUBMITTED")]
    Resubmitted,
    #[graphql(name = "INFO_REQUESTED")]
    InfoRequested,
    #[graphql(name = "APPROVED")]
    Approved,
    #[graphql(name = "REJECTED")]
    Rejected,
}

impl From<ApplicationActivityKind> for ActivityKind {
    fn from(kind: ApplicationActivityKind) -> Self {
        match kind {
            ApplicationActivityKind::Submitted => ActivityKind::Submitted,
            ApplicationActivityKind::Resubmitted => ActivityKind::Resubmitted,
            ApplicationActivityKind::InfoRequested => ActivityKind::InfoRequested,
            ApplicationActivityKind::Approved => ActivityKind::Approved,
            ApplicationActivityKind::Rejected => ActivityKind::Rejected,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
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

impl From<PersonalInfoRow> for PersonalInfo {
    fn from(info: PersonalInfoRow) -> Self {
        Self {
            full_name: info.full_name,
            date_of_birth: info.date_of_birth,
            phone: info.phone,
            email: info.email,
            address: info.address,
            emergency_contact_name: info.emergency_contact_name,
            emergency_contact_phone: info.emergency_contact_phone,
            health_notes: info.health_notes,
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct PersonalInfoInput {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub health_notes: Option<String>,
}

impl From<PersonalInfoInput> for PersonalInfoRow {
    fn from(input: PersonalInfoInput) -> Self {
        Self {
            full_name: input.full_name,
            date_of_birth: input.date_of_birth,
            phone: input.phone,
            email: input.email,
            address: input.address,
            emergency_contact_name: input.emergency_contact_name,
            emergency_contact_phone: input.emergency_contact_phone,
            health_notes: input.health_notes,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub url: String,
    pub file_name: String,
    pub file_size: i64,
}

impl From<DocumentRefRow> for DocumentRef {
    fn from(doc: DocumentRefRow) -> Self {
        Self {
            kind: doc.kind.into(),
            url: doc.url,
            file_name: doc.file_name,
            file_size: doc.file_size,
        }
    }
}

/// Reference returned by the document store after upload.
#[derive(InputObject, Clone, Debug)]
pub struct DocumentInput {
    pub kind: DocumentKind,
    pub url: String,
    pub file_name: String,
    pub file_size: i64,
}

impl From<DocumentInput> for DocumentRefRow {
    fn from(input: DocumentInput) -> Self {
        Self {
            kind: input.kind.into(),
            url: input.url,
            file_name: input.file_name,
            file_size: input.file_size,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ApplicationActivityEntry {
    pub at: DateTime<Utc>,
    pub actor_id: ID,
    pub kind: ActivityKind,
    pub note: Option<String>,
}

impl From<ApplicationActivity> for ApplicationActivityEntry {
    fn from(entry: ApplicationActivity) -> Self {
        Self {
            at: entry.at,
            actor_id: entry.actor_id.into(),
            kind: entry.kind.into(),
            note: entry.note,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct MembershipApplication {
    pub id: ID,
    pub member_id: ID,
    pub club_id: ID,
    pub status: ApplicationStatus,
    pub personal_info: PersonalInfo,
    pub documents: Vec<DocumentRef>,
    pub reviewed_by: Option<ID>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub activity_log: Vec<ApplicationActivityEntry>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MembershipApplicationRow> for MembershipApplication {
    fn from(row: MembershipApplicationRow) -> Self {
        Self {
            id: row.id.into(),
            member_id: row.member_id.into(),
            club_id: row.club_id.into(),
            status: row.status.into(),
            personal_info: row.personal_info.0.into(),
            documents: row.documents.0.into_iter().map(DocumentRef::from).collect(),
            reviewed_by: row.reviewed_by.map(Into::into),
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
            activity_log: row
                .activity_log
                .0
                .into_iter()
                .map(ApplicationActivityEntry::from)
                .collect(),
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct SubmitApplicationInput {
    pub club_id: Uuid,
    pub personal_info: PersonalInfoInput,
    #[graphql(default)]
    pub documents: Vec<DocumentInput>,
}

#[derive(InputObject, Clone, Debug)]
pub struct ResubmitApplicationInput {
    pub application_id: Uuid,
    pub personal_info: PersonalInfoInput,
    #[graphql(default)]
    pub documents: Vec<DocumentInput>,
}

#[derive(InputObject, Clone, Debug)]
pub struct ReviewApplicationInput {
    pub application_id: Uuid,
    pub decision: ReviewDecision,
    /// Required when rejecting or requesting more information
    pub notes: Option<String>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct ApplicationFilterInput {
    pub club_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}
