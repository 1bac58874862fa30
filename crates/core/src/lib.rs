#![forbid(unsafe_code)]

pub mod evaluator;
pub mod model;
pub mod time;

pub use evaluator::{Scoring, Verdict, evaluate, normalize_line};
pub use time::Clock;
