// Each domain contains: mod.rs, resolvers.rs, service.rs, types.rs

pub mod applications;
pub mod attendance;
pub mod audit_log;
pub mod clubs;
pub mod leave_requests;
pub mod members;
pub mod sessions;
