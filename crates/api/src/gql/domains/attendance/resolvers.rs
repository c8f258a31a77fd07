use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::current_actor;
use crate::auth::Actor;
use crate::gql::error::{DomainError, DomainResult, DomainResultExt, OptionExt};
use crate::gql::types::{AttendanceRecord, AttendanceStats, MarkAttendanceInput};
use crate::state::AppState;
use infra::models::MemberRow;
use infra::repos::{attendance_records, members, training_sessions, ActorRole};

use super::service;

/// Resolve the member a per-member query is about: the caller's own profile when no id
/// is given, otherwise the named member after a read check.
async fn readable_member(
    state: &AppState,
    actor: &Actor,
    member_id: Option<Uuid>,
) -> DomainResult<MemberRow> {
    let member_id = member_id
        .or(actor.member_id)
        .ok_or_else(|| DomainError::validation("memberId is required"))?;
    let member = members::get_by_id(&state.db, member_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Member {
            club_id: member.club_id,
            member_id: member.id,
        },
        Action::Read,
    )?;
    Ok(member)
}

#[derive(Default)]
pub struct AttendanceQuery;

#[Object]
impl AttendanceQuery {
    /// Attendance of a session. Members only see their own record.
    async fn session_attendance(
        &self,
        ctx: &Context<'_>,
        session_id: Uuid,
    ) -> Result<Vec<AttendanceRecord>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let session = training_sessions::get_by_id(&state.db, session_id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::Session {
                club_id: session.club_id,
                coach_id: session.coach_id,
            },
            Action::Read,
        )
        .extend_err()?;

        let rows = attendance_records::list_by_session(&state.db, session.id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;

        Ok(rows
            .into_iter()
            .filter(|r| actor.role != ActorRole::Member || actor.member_id == Some(r.member_id))
            .map(AttendanceRecord::from)
            .collect())
    }

    /// Attendance history of a member, newest first (defaults to the caller)
    async fn member_attendance(
        &self,
        ctx: &Context<'_>,
        member_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceRecord>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let member = readable_member(state, &actor, member_id).await.extend_err()?;

        let rows = attendance_records::list_by_member(&state.db, member.id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    /// Totals and rate recomputed from the ledger (defaults to the caller)
    async fn attendance_stats(
        &self,
        ctx: &Context<'_>,
        member_id: Option<Uuid>,
    ) -> Result<AttendanceStats> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let member = readable_member(state, &actor, member_id).await.extend_err()?;

        service::member_stats(&state.db, member.id, Utc::now().date_naive())
            .await
            .extend_err()
    }
}

#[derive(Default)]
pub struct AttendanceMutation;

#[Object]
impl AttendanceMutation {
    /// Record a member's attendance for a session (owning coach).
    /// Repeated calls update the same record.
    async fn mark_attendance(
        &self,
        ctx: &Context<'_>,
        input: MarkAttendanceInput,
    ) -> Result<AttendanceRecord> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::mark_attendance(&state.db, &actor, input)
            .await
            .extend_err()?;
        Ok(row.into())
    }

    /// Check yourself in to a session of your club
    async fn check_in(&self, ctx: &Context<'_>, session_id: Uuid) -> Result<AttendanceRecord> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::check_in(&state.db, &actor, session_id, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }
}
