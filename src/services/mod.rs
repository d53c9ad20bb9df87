// src/services/mod.rs
//
// Shared services module containing business logic services
// that can be used across different domain modules

pub mod google;
pub mod rate_limit;
pub mod recommendations;
pub mod users;

// Re-export commonly used types for convenience
pub use google::GoogleService;
pub use rate_limit::RateLimitService;
pub use recommendations::RecommendationService;
pub use users::UserService;
