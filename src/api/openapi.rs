//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Authentication
        crate::routes::auth::register,
        crate::routes::auth::verify_email,
        crate::routes::auth::login,
        crate::routes::auth::refresh_token,
        crate::routes::auth::request_password_reset,
        crate::routes::auth::confirm_password_reset,
        crate::routes::auth::change_password,
        // Users
        crate::routes::users::list_users,
        crate::routes::users::get_me,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
        // Posts
        crate::routes::posts::list_posts,
        crate::routes::posts::get_post,
        crate::routes::posts::create_post,
        crate::routes::posts::update_post,
        crate::routes::posts::delete_post,
        crate::routes::posts::like_post,
        crate::routes::posts::remove_like,
        crate::routes::posts::toggle_like,
        // Comments
        crate::routes::comments::list_comments,
        crate::routes::comments::create_comment,
        crate::routes::comments::get_comment,
        crate::routes::comments::update_comment,
        crate::routes::comments::delete_comment,
        // Advertisements
        crate::routes::ads::list_ads,
        crate::routes::ads::get_ad,
        crate::routes::ads::create_ad,
        crate::routes::ads::update_ad,
        crate::routes::ads::delete_ad,
        crate::routes::ads::delete_ad_image,
        // Services
        crate::routes::catalog::list_services,
        crate::routes::catalog::get_service,
        crate::routes::catalog::create_service,
        crate::routes::catalog::update_service,
        crate::routes::catalog::delete_service,
        // Social
        crate::routes::social::list_socials,
        crate::routes::social::get_social,
        crate::routes::social::create_social,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::models::UserResponse,
        crate::models::AuthorSummary,
        crate::models::user::LoginRequest,
        crate::models::user::LoginResponse,
        crate::models::user::RefreshRequest,
        crate::models::user::TokenResponse,
        crate::models::user::PasswordResetRequest,
        crate::models::user::PasswordResetConfirmRequest,
        crate::models::user::ChangePasswordRequest,
        crate::models::user::MessageResponse,
        crate::models::PostResponse,
        crate::models::post::LikeToggleResponse,
        crate::models::comment::CommentRequest,
        crate::models::CommentResponse,
        crate::models::Category,
        crate::models::AdvertisementResponse,
        crate::models::AdvertisementImageResponse,
        crate::models::service::ServiceListItem,
        crate::models::service::ServiceResponse,
        crate::models::Social,
        crate::models::SocialPhone,
        crate::models::social::CreateSocialRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, email verification, login and password management"),
        (name = "Users", description = "User profiles"),
        (name = "Posts", description = "Posts and likes"),
        (name = "Comments", description = "Comments on posts"),
        (name = "Advertisements", description = "Classified ads with image galleries"),
        (name = "Services", description = "Services catalog"),
        (name = "Social", description = "Directory of useful contacts"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "Classifieds API",
        description = "REST API for accounts, posts, comments, classified ads, a services catalog and a contacts directory",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081/api/v1", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Update version to match Cargo.toml version
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();

        openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new)
            .add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
    }
}
