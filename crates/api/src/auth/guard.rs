//! Club and role scoped authorization.
//!
//! Every club operation calls [`authorize`] (or [`scoped_club`] for list queries)
//! before it reads or writes anything else. Denials are reported as
//! [`DomainError::Forbidden`], which renders exactly like `NotFound`.

use infra::repos::ActorRole;
use uuid::Uuid;

use crate::gql::error::{DomainError, DomainResult};

/// The verified caller, as supplied by the identity provider and bound to its profile rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity_id: Uuid,
    pub role: ActorRole,
    pub club_id: Option<Uuid>,
    /// Set when the identity owns a member profile.
    pub member_id: Option<Uuid>,
    /// Set when the identity owns a coach profile.
    pub coach_id: Option<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    fn in_club(&self, club_id: Uuid) -> bool {
        self.club_id == Some(club_id)
    }

    fn is_member(&self, member_id: Uuid) -> bool {
        self.member_id == Some(member_id)
    }

    fn is_coach(&self, coach_id: Uuid) -> bool {
        self.coach_id == Some(coach_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    /// Decide on someone else's request (applications, leave requests).
    Review,
}

/// The club-scoped thing being touched, reduced to the fields the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Club { club_id: Uuid },
    Member { club_id: Uuid, member_id: Uuid },
    Application { club_id: Uuid, member_id: Uuid },
    Session { club_id: Uuid, coach_id: Uuid },
    /// `coach_id` is the owning coach of the session the record belongs to.
    Attendance { club_id: Uuid, member_id: Uuid, coach_id: Uuid },
    LeaveRequest { club_id: Uuid, member_id: Uuid, coach_id: Uuid },
    AuditLog { club_id: Option<Uuid> },
}

impl Resource {
    pub fn club_id(&self) -> Option<Uuid> {
        match *self {
            Resource::Club { club_id }
            | Resource::Member { club_id, .. }
            | Resource::Application { club_id, .. }
            | Resource::Session { club_id, .. }
            | Resource::Attendance { club_id, .. }
            | Resource::LeaveRequest { club_id, .. } => Some(club_id),
            Resource::AuditLog { club_id } => club_id,
        }
    }
}

pub fn authorize(actor: &Actor, resource: &Resource, action: Action) -> DomainResult<()> {
    if permits(actor, resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            identity_id = %actor.identity_id,
            role = actor.role.as_str(),
            ?resource,
            ?action,
            "authorization denied"
        );
        Err(DomainError::Forbidden)
    }
}

fn permits(actor: &Actor, resource: &Resource, action: Action) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Coach => coach_permits(actor, resource, action),
        ActorRole::Member => member_permits(actor, resource, action),
    }
}

fn coach_permits(actor: &Actor, resource: &Resource, action: Action) -> bool {
    let Some(club_id) = resource.club_id() else {
        return false;
    };
    if !actor.in_club(club_id) {
        return false;
    }

    match (*resource, action) {
        (_, Action::Read) => true,
        (Resource::Application { .. }, Action::Review) => true,
        // Session-owned data is written and reviewed by the owning coach only
        (Resource::Session { coach_id, .. }, Action::Write | Action::Review)
        | (Resource::Attendance { coach_id, .. }, Action::Write | Action::Review)
        | (Resource::LeaveRequest { coach_id, .. }, Action::Write | Action::Review) => {
            actor.is_coach(coach_id)
        }
        _ => false,
    }
}

fn member_permits(actor: &Actor, resource: &Resource, action: Action) -> bool {
    if action == Action::Review {
        return false;
    }

    match *resource {
        Resource::Application { club_id, member_id }
        | Resource::LeaveRequest {
            club_id, member_id, ..
        }
        | Resource::Attendance {
            club_id, member_id, ..
        } => actor.in_club(club_id) && actor.is_member(member_id),
        Resource::Member { club_id, member_id } => {
            action == Action::Read && actor.in_club(club_id) && actor.is_member(member_id)
        }
        Resource::Session { club_id, .. } | Resource::Club { club_id } => {
            action == Action::Read && actor.in_club(club_id)
        }
        Resource::AuditLog { .. } => false,
    }
}

/// Resolve the club a list query may see.
///
/// Returns `None` only for administrators asking across all clubs. Everyone else is
/// pinned to their own club; asking for another club is a denial, not an empty page.
pub fn scoped_club(actor: &Actor, requested: Option<Uuid>) -> DomainResult<Option<Uuid>> {
    if actor.is_admin() {
        return Ok(requested);
    }

    let own = actor.club_id.ok_or(DomainError::Forbidden)?;
    match requested {
        Some(club_id) if club_id != own => Err(DomainError::Forbidden),
        _ => Ok(Some(own)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        club: Uuid,
        other_club: Uuid,
        coach: Actor,
        other_coach: Actor,
        member: Actor,
        admin: Actor,
    }

    fn fixture() -> Fixture {
        let club = Uuid::new_v4();
        let other_club = Uuid::new_v4();
        Fixture {
            club,
            other_club,
            coach: Actor {
                identity_id: Uuid::new_v4(),
                role: ActorRole::Coach,
                club_id: Some(club),
                member_id: None,
                coach_id: Some(Uuid::new_v4()),
            },
            other_coach: Actor {
                identity_id: Uuid::new_v4(),
                role: ActorRole::Coach,
                club_id: Some(other_club),
                member_id: None,
                coach_id: Some(Uuid::new_v4()),
            },
            member: Actor {
                identity_id: Uuid::new_v4(),
                role: ActorRole::Member,
                club_id: Some(club),
                member_id: Some(Uuid::new_v4()),
                coach_id: None,
            },
            admin: Actor {
                identity_id: Uuid::new_v4(),
                role: ActorRole::Admin,
                club_id: None,
                member_id: None,
                coach_id: None,
            },
        }
    }

    fn every_resource_in(club_id: Uuid, member_id: Uuid, coach_id: Uuid) -> Vec<Resource> {
        vec![
            Resource::Club { club_id },
            Resource::Member { club_id, member_id },
            Resource::Application { club_id, member_id },
            Resource::Session { club_id, coach_id },
            Resource::Attendance {
                club_id,
                member_id,
                coach_id,
            },
            Resource::LeaveRequest {
                club_id,
                member_id,
                coach_id,
            },
            Resource::AuditLog {
                club_id: Some(club_id),
            },
        ]
    }

    #[test]
    fn foreign_club_actors_are_denied_everything() {
        let f = fixture();
        let member_id = f.member.member_id.unwrap();
        let coach_id = f.coach.coach_id.unwrap();

        for resource in every_resource_in(f.club, member_id, coach_id) {
            for action in [Action::Read, Action::Write, Action::Review] {
                assert!(
                    matches!(
                        authorize(&f.other_coach, &resource, action),
                        Err(DomainError::Forbidden)
                    ),
                    "{resource:?} {action:?}"
                );
            }
        }
    }

    #[test]
    fn admin_may_act_on_any_club() {
        let f = fixture();
        for resource in every_resource_in(f.other_club, Uuid::new_v4(), Uuid::new_v4()) {
            assert!(authorize(&f.admin, &resource, Action::Review).is_ok());
        }
    }

    #[test]
    fn coach_reviews_applications_in_own_club() {
        let f = fixture();
        let resource = Resource::Application {
            club_id: f.club,
            member_id: Uuid::new_v4(),
        };
        assert!(authorize(&f.coach, &resource, Action::Review).is_ok());
        assert!(authorize(&f.other_coach, &resource, Action::Review).is_err());
    }

    #[test]
    fn only_owning_coach_writes_session_data() {
        let f = fixture();
        let colleague = Actor {
            coach_id: Some(Uuid::new_v4()),
            ..f.coach.clone()
        };
        let session = Resource::Session {
            club_id: f.club,
            coach_id: f.coach.coach_id.unwrap(),
        };
        let leave = Resource::LeaveRequest {
            club_id: f.club,
            member_id: Uuid::new_v4(),
            coach_id: f.coach.coach_id.unwrap(),
        };

        assert!(authorize(&f.coach, &session, Action::Write).is_ok());
        assert!(authorize(&f.coach, &leave, Action::Review).is_ok());
        assert!(authorize(&colleague, &session, Action::Read).is_ok());
        assert!(authorize(&colleague, &session, Action::Write).is_err());
        assert!(authorize(&colleague, &leave, Action::Review).is_err());
    }

    #[test]
    fn member_sees_only_own_records() {
        let f = fixture();
        let own = f.member.member_id.unwrap();
        let someone_else = Uuid::new_v4();

        let mine = Resource::Application {
            club_id: f.club,
            member_id: own,
        };
        let theirs = Resource::Application {
            club_id: f.club,
            member_id: someone_else,
        };
        assert!(authorize(&f.member, &mine, Action::Write).is_ok());
        assert!(authorize(&f.member, &theirs, Action::Read).is_err());
        assert!(authorize(&f.member, &mine, Action::Review).is_err());
    }

    #[test]
    fn member_reads_club_sessions_but_cannot_write_them() {
        let f = fixture();
        let session = Resource::Session {
            club_id: f.club,
            coach_id: Uuid::new_v4(),
        };
        assert!(authorize(&f.member, &session, Action::Read).is_ok());
        assert!(authorize(&f.member, &session, Action::Write).is_err());

        let foreign = Resource::Session {
            club_id: f.other_club,
            coach_id: Uuid::new_v4(),
        };
        assert!(authorize(&f.member, &foreign, Action::Read).is_err());
    }

    #[test]
    fn members_never_read_the_audit_log() {
        let f = fixture();
        let audit = Resource::AuditLog {
            club_id: Some(f.club),
        };
        assert!(authorize(&f.member, &audit, Action::Read).is_err());
        assert!(authorize(&f.coach, &audit, Action::Read).is_ok());
        assert!(authorize(&f.coach, &Resource::AuditLog { club_id: None }, Action::Read).is_err());
    }

    #[test]
    fn list_scope_pins_non_admins_to_their_club() {
        let f = fixture();
        assert_eq!(scoped_club(&f.coach, None).unwrap(), Some(f.club));
        assert_eq!(scoped_club(&f.coach, Some(f.club)).unwrap(), Some(f.club));
        assert!(matches!(
            scoped_club(&f.coach, Some(f.other_club)),
            Err(DomainError::Forbidden)
        ));
        assert_eq!(scoped_club(&f.admin, None).unwrap(), None);
        assert_eq!(
            scoped_club(&f.admin, Some(f.other_club)).unwrap(),
            Some(f.other_club)
        );
    }

    #[test]
    fn actor_without_club_cannot_list() {
        let f = fixture();
        let orphan = Actor {
            club_id: None,
            ..f.member
        };
        assert!(scoped_club(&orphan, None).is_err());
    }
}
