//! Domain models for the goal board.
//!
//! # Core Concepts
//!
//! - [`Goal`]: A trackable team objective. Carries 1–5 [`CategoryName`]s, a
//!   display [`GoalSize`], an `order` slot in the board, and owns its
//!   [`SubGoal`]s and [`Note`]s.
//! - [`SubGoal`]: A child objective. When a goal has sub-goals, the goal's
//!   progress is the rounded mean of theirs (see [`mean_progress`]).
//! - [`Category`]: A named, colored tag. Goals reference categories by name.
//! - [`Note`]: A timestamped annotation on a goal, optionally pinned.
//!
//! Filtering ([`GoalFilter`]) and the board roll-up ([`BoardSummary`]) are
//! computed from the full goal list and never change stored state.

mod category;
mod filter;
mod goal;
mod note;
mod order;
mod sub_goal;
mod summary;

pub use category::*;
pub use filter::*;
pub use goal::*;
pub(crate) use goal::clamp_progress;
pub use note::*;
pub use order::*;
pub use sub_goal::*;
pub use summary::*;
