//! Services module - business logic shared by the route handlers.

pub mod account_service;
pub mod cache_service;
pub mod email_service;
pub mod image_service;
pub mod jwt_service;
pub mod media_service;
pub mod password_service;
pub mod rate_limiter;
pub mod slug_service;
pub mod text_service;

// Re-export for convenience
pub use cache_service::{CacheBackend, InMemoryCache};
pub use email_service::EmailService;
pub use jwt_service::{Claims, JwtService, SharedJwtService, TokenPair, TokenType};
pub use media_service::UploadError;
pub use rate_limiter::SlidingWindowLimiter;
pub use slug_service::slugify;
