pub mod invitation;
pub mod membership;
pub mod project;
pub mod tenant;
pub mod user;

pub use invitation::{Invitation, InvitationStatus};
pub use membership::{Membership, MembershipStatus};
pub use project::{Project, ProjectStatus};
pub use tenant::Tenant;
pub use user::User;
