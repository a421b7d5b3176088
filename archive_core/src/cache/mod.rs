pub mod recency;

pub use recency::RecencyCache;
