pub mod schedule;
pub mod user;

pub use schedule::{NewSchedule, Schedule, UpdateOutcome};
pub use user::{NewUser, PublicUser, User};
