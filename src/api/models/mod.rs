//! Domain records and API request/response types.

pub mod advertisement;
pub mod comment;
pub mod pagination;
pub mod post;
pub mod price;
pub mod service;
pub mod social;
pub mod user;

pub use advertisement::{
    Advertisement, AdvertisementImage, AdvertisementImageResponse, AdvertisementResponse,
    Category, NewAdvertisement,
};
pub use comment::{Comment, CommentResponse, NewComment};
pub use pagination::{Page, PageRequest};
pub use post::{NewPost, Post, PostResponse, PostStats};
pub use price::Price;
pub use service::{NewService, Service, ServiceFilter, ServiceOrdering};
pub use social::{NewSocial, Social, SocialPhone};
pub use user::{AuthorSummary, NewUser, User, UserResponse};
