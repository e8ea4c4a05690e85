//! Pure business rules shared by services, controllers and the booking agent.
//!
//! Nothing in here touches the database or the network.

pub mod goals;
pub mod money;
pub mod periods;
pub mod scheduling;

pub use goals::calculate_goal_progress;
pub use money::{format_currency, Currency};
pub use periods::{period_range, Period};
pub use scheduling::{available_slots, intervals_overlap};
