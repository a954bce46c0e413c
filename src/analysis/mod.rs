pub mod recommendation;

pub use recommendation::{aggregate, Recommendation, RecommendationLevel};
