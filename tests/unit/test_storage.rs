//! In-memory storage backend: cascades, likes, slugs and account purging

use chrono::{Duration, Utc};
use classifieds_api::models::{
    Category, NewAdvertisement, NewComment, NewPost, NewService, NewUser, Price, User,
};
use classifieds_api::services::account_service::purge_unverified_users;
use classifieds_api::storage::{
    AdFilter, LocalMediaStore, MediaStore, MemoryStorageBackend, StorageBackend, StorageError,
};
use tempfile::TempDir;

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        avatar: None,
        is_active: true,
        is_staff: false,
        is_superuser: false,
        is_email_verified: true,
        email_verification_token: None,
        email_verification_sent_at: Some(Utc::now()),
    }
}

fn new_ad(owner: &User, title: &str, category: Category) -> NewAdvertisement {
    NewAdvertisement {
        owner_id: owner.id,
        slug_base: title.to_string(),
        title: title.to_string(),
        description: String::new(),
        category,
        price: None,
        location: String::new(),
        contact_phone: "12345".to_string(),
        contact_email: String::new(),
        is_active: true,
        main_image: None,
    }
}

fn new_service(title: &str, slug: &str) -> NewService {
    NewService {
        title: title.to_string(),
        slug: slug.to_string(),
        image: None,
        description: String::new(),
        price: Price::from_cents(1000),
        is_active: true,
    }
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let storage = MemoryStorageBackend::new();
    storage.create_user(new_user("a@example.com")).await.unwrap();
    let result = storage.create_user(new_user("A@example.com")).await;
    assert!(matches!(result, Err(StorageError::Conflict(_))));
}

#[tokio::test]
async fn test_likes_are_unique_per_user() {
    let storage = MemoryStorageBackend::new();
    let author = storage.create_user(new_user("a@example.com")).await.unwrap();
    let fan = storage.create_user(new_user("b@example.com")).await.unwrap();
    let post = storage
        .create_post(NewPost {
            author_id: author.id,
            body: "hello".to_string(),
            image: None,
        })
        .await
        .unwrap();

    assert!(storage.add_like(post.id, fan.id).await.unwrap());
    assert!(!storage.add_like(post.id, fan.id).await.unwrap());

    let stats = storage.post_stats(post.id, Some(fan.id)).await.unwrap();
    assert_eq!(stats.likes_count, 1);
    assert!(stats.liked);
    let stats = storage.post_stats(post.id, None).await.unwrap();
    assert!(!stats.liked);

    assert!(storage.remove_like(post.id, fan.id).await.unwrap());
    assert!(!storage.remove_like(post.id, fan.id).await.unwrap());
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let storage = MemoryStorageBackend::new();
    let author = storage.create_user(new_user("a@example.com")).await.unwrap();
    let reader = storage.create_user(new_user("b@example.com")).await.unwrap();
    let own_post = storage
        .create_post(NewPost {
            author_id: author.id,
            body: "mine".to_string(),
            image: Some("posts/x.png".to_string()),
        })
        .await
        .unwrap();
    let other_post = storage
        .create_post(NewPost {
            author_id: reader.id,
            body: "theirs".to_string(),
            image: None,
        })
        .await
        .unwrap();
    storage
        .create_comment(NewComment {
            post_id: other_post.id,
            author_id: author.id,
            body: "nice".to_string(),
        })
        .await
        .unwrap();
    storage
        .create_comment(NewComment {
            post_id: own_post.id,
            author_id: reader.id,
            body: "reply".to_string(),
        })
        .await
        .unwrap();
    storage.add_like(other_post.id, author.id).await.unwrap();
    let ad = storage
        .create_advertisement(new_ad(&author, "lamp", Category::Sell))
        .await
        .unwrap();
    storage
        .add_advertisement_image(ad.id, "ads/1.png".to_string(), 0)
        .await
        .unwrap();

    let mut paths = storage.user_media_paths(author.id).await.unwrap();
    paths.sort();
    assert_eq!(paths, ["ads/1.png", "posts/x.png"]);

    storage.delete_user(author.id).await.unwrap();

    assert!(storage.get_user(author.id).await.unwrap().is_none());
    assert!(
        storage
            .get_post_by_public_id(own_post.public_id)
            .await
            .unwrap()
            .is_none()
    );
    let stats = storage.post_stats(other_post.id, None).await.unwrap();
    assert_eq!(stats.likes_count, 0);
    assert_eq!(stats.comments_count, 0);
    assert!(
        storage
            .get_advertisement_by_slug(&ad.slug)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        storage
            .list_advertisement_images(ad.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        storage.delete_user(author.id).await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_ad_slugs_and_filters() {
    let storage = MemoryStorageBackend::new();
    let owner = storage.create_user(new_user("a@example.com")).await.unwrap();
    let other = storage.create_user(new_user("b@example.com")).await.unwrap();
    let bike = storage
        .create_advertisement(new_ad(&owner, "bike", Category::Sell))
        .await
        .unwrap();
    storage
        .create_advertisement(new_ad(&owner, "kitten", Category::Free))
        .await
        .unwrap();
    storage
        .create_advertisement(new_ad(&other, "bike", Category::Sell))
        .await
        .unwrap();

    assert_eq!(bike.slug, format!("bike-{}", bike.id));

    let (ads, count) = storage
        .list_advertisements(
            &AdFilter {
                category: Some(Category::Sell),
                owner_id: None,
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert!(ads.iter().all(|ad| ad.category == Category::Sell));

    let (_, count) = storage
        .list_advertisements(
            &AdFilter {
                category: None,
                owner_id: Some(owner.id),
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_service_slug_exists_respects_exclusion() {
    let storage = MemoryStorageBackend::new();
    let service = storage
        .create_service(new_service("Cleaning", "cleaning"))
        .await
        .unwrap();

    assert!(storage.service_slug_exists("cleaning", None).await.unwrap());
    assert!(
        !storage
            .service_slug_exists("cleaning", Some(service.id))
            .await
            .unwrap()
    );
    assert!(!storage.service_slug_exists("cleaning-1", None).await.unwrap());
}

#[tokio::test]
async fn test_purge_unverified_users() {
    let storage = MemoryStorageBackend::new();
    let media_dir = TempDir::new().unwrap();
    let media = LocalMediaStore::new(media_dir.path(), "/media");
    let now = Utc::now();

    let avatar = media.save("avatars", "png", b"fake").await.unwrap();
    let mut stale = new_user("stale@example.com");
    stale.is_active = false;
    stale.is_email_verified = false;
    stale.avatar = Some(avatar.clone());
    stale.email_verification_token = Some("t1".to_string());
    stale.email_verification_sent_at = Some(now - Duration::hours(30));
    let stale = storage.create_user(stale).await.unwrap();

    let mut fresh = new_user("fresh@example.com");
    fresh.is_active = false;
    fresh.is_email_verified = false;
    fresh.email_verification_token = Some("t2".to_string());
    fresh.email_verification_sent_at = Some(now - Duration::hours(2));
    let fresh = storage.create_user(fresh).await.unwrap();

    let mut verified = new_user("verified@example.com");
    verified.email_verification_sent_at = Some(now - Duration::days(10));
    let verified = storage.create_user(verified).await.unwrap();

    let removed = purge_unverified_users(&storage, &media, now).await.unwrap();
    assert_eq!(removed, 1);
    assert!(storage.get_user(stale.id).await.unwrap().is_none());
    assert!(storage.get_user(fresh.id).await.unwrap().is_some());
    assert!(storage.get_user(verified.id).await.unwrap().is_some());
    assert!(!media_dir.path().join(&avatar).exists());
}
