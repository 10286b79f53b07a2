mod flags;
mod stats;

pub use stats::Stats;

pub(crate) use flags::flag_set;
