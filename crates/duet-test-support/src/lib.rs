//! Shared test doubles for the Duet workspace.

mod clock;
mod questions;
mod rng;

pub use clock::{FixedClock, ManualClock};
pub use questions::{StaticQuestionProvider, numbered_questions};
pub use rng::{MockRng, SequenceRng};
