pub mod calculator;
pub mod okapi;
pub mod tfidf;
pub mod combiner;
pub mod external;

pub use calculator::{create_calculator, Argument, ArgumentType, ScoreCalculator};
pub use combiner::{create_combiner, ScoreCombiner};
