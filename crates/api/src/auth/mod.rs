pub mod config;
pub mod guard;
pub mod jwt;
pub mod permissions;

pub use config::AuthConfig;
pub use guard::{authorize, scoped_club, Action, Actor, Resource};
pub use jwt::{Claims, JwtService};
