//! End-to-end store flows against a live MongoDB.
//!
//! Every test resolves the connection from `MONGODB_URI` and returns early
//! when it is not set, so the suite stays green on machines without a
//! database.

use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::{Client, Database};

use tours_core::models::review::{CreateReviewDto, UpdateReviewDto};
use tours_core::models::tour::TourRatings;
use tours_core::models::user::{ChangePasswordDto, CreateUserDto, ResetPasswordDto};
use tours_core::{Error, ReviewStore, UserStore};

async fn test_db() -> Option<Database> {
    dotenv::dotenv().ok();
    let _ = env_logger::builder().is_test(true).try_init();

    let uri = std::env::var("MONGODB_URI").ok()?;
    let client = Client::with_uri_str(&uri).await.ok()?;
    Some(client.database("tours_core_test"))
}

async fn insert_tour(db: &Database) -> ObjectId {
    let id = ObjectId::new();
    db.collection::<Document>("tours")
        .insert_one(doc! { "_id": id, "name": "The Forest Hiker" }, None)
        .await
        .unwrap();
    id
}

async fn tour_ratings(db: &Database, id: ObjectId) -> TourRatings {
    db.collection::<TourRatings>("tours")
        .find_one(doc! { "_id": id }, None)
        .await
        .unwrap()
        .expect("tour should exist")
}

fn review_dto(tour: ObjectId, author: ObjectId, rating: f64) -> CreateReviewDto {
    CreateReviewDto {
        text: "Worth every penny".to_string(),
        rating,
        tour,
        author,
    }
}

fn register_dto() -> CreateUserDto {
    CreateUserDto {
        name: "Ada".to_string(),
        email: format!("u{}@example.com", ObjectId::new()),
        photo: None,
        password: "password123".to_string(),
        password_confirm: "password123".to_string(),
    }
}

#[tokio::test]
async fn first_review_sets_the_aggregate() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);
    let tour = insert_tour(&db).await;

    store
        .create(review_dto(tour, ObjectId::new(), 5.0))
        .await
        .unwrap();

    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 1);
    assert_eq!(ratings.ratings_average, 5.0);
}

#[tokio::test]
async fn deleting_reviews_walks_the_aggregate_back_to_defaults() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);
    let tour = insert_tour(&db).await;

    let four = store
        .create(review_dto(tour, ObjectId::new(), 4.0))
        .await
        .unwrap();
    let five = store
        .create(review_dto(tour, ObjectId::new(), 5.0))
        .await
        .unwrap();

    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 2);
    assert!((ratings.ratings_average - 4.5).abs() < 1e-9);

    let removed = store.delete_by_id(four.id.unwrap()).await.unwrap();
    assert_eq!(removed.unwrap().rating, 4.0);
    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 1);
    assert_eq!(ratings.ratings_average, 5.0);

    store.delete_by_id(five.id.unwrap()).await.unwrap();
    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 0);
    assert_eq!(ratings.ratings_average, 4.5);
}

#[tokio::test]
async fn updating_a_review_recomputes_the_aggregate() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);
    let tour = insert_tour(&db).await;

    let review = store
        .create(review_dto(tour, ObjectId::new(), 4.0))
        .await
        .unwrap();

    let update = UpdateReviewDto {
        text: None,
        rating: Some(2.0),
    };
    let previous = store
        .update_by_id(review.id.unwrap(), update)
        .await
        .unwrap()
        .expect("review should exist");
    assert_eq!(previous.rating, 4.0, "capture returns the pre-mutation state");

    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 1);
    assert_eq!(ratings.ratings_average, 2.0);
}

#[tokio::test]
async fn mutating_a_missing_review_is_a_no_op() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);

    let updated = store
        .update_by_id(ObjectId::new(), UpdateReviewDto::default())
        .await
        .unwrap();
    assert!(updated.is_none());

    let deleted = store.delete_by_id(ObjectId::new()).await.unwrap();
    assert!(deleted.is_none());
}

#[tokio::test]
async fn one_review_per_tour_and_author() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);
    store.ensure_indexes().await.unwrap();

    let tour = insert_tour(&db).await;
    let author = ObjectId::new();

    store.create(review_dto(tour, author, 5.0)).await.unwrap();
    let second = store.create(review_dto(tour, author, 1.0)).await;
    assert!(matches!(second, Err(Error::DuplicateReview)));

    let ratings = tour_ratings(&db, tour).await;
    assert_eq!(ratings.ratings_quantity, 1);
}

#[tokio::test]
async fn reviews_for_a_missing_tour_still_settle() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let store = ReviewStore::new(&db);

    // No tour document at all; the aggregate write has nowhere to land and
    // the operation must still succeed.
    store
        .create(review_dto(ObjectId::new(), ObjectId::new(), 3.0))
        .await
        .unwrap();
}

#[tokio::test]
async fn reset_flow_is_single_use() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let users = UserStore::new(&db);

    let registered = users.register(register_dto()).await.unwrap();
    assert!(registered.password_changed_at.is_none());

    let raw_token = users
        .request_password_reset(&registered.email)
        .await
        .unwrap()
        .expect("account exists");

    let wrong = users
        .reset_password(ResetPasswordDto {
            token: "a".repeat(64),
            password: "newpassword1".to_string(),
            password_confirm: "newpassword1".to_string(),
        })
        .await;
    assert!(matches!(wrong, Err(Error::ResetRejected)));

    let reset = users
        .reset_password(ResetPasswordDto {
            token: raw_token.clone(),
            password: "newpassword1".to_string(),
            password_confirm: "newpassword1".to_string(),
        })
        .await
        .unwrap();
    assert!(reset.verify_password("newpassword1"));
    assert!(reset.password_changed_at.is_some());

    let reused = users
        .reset_password(ResetPasswordDto {
            token: raw_token,
            password: "anotherpass1".to_string(),
            password_confirm: "anotherpass1".to_string(),
        })
        .await;
    assert!(matches!(reused, Err(Error::ResetRejected)));

    let stored = users.find_by_email(&registered.email).await.unwrap().unwrap();
    assert!(stored.password_reset_token_hash.is_none());
    assert!(stored.password_reset_expires_at.is_none());
    assert!(stored.verify_password("newpassword1"));
}

#[tokio::test]
async fn changing_a_password_stamps_and_rehashes() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let users = UserStore::new(&db);

    let registered = users.register(register_dto()).await.unwrap();
    let issued_at = chrono::Utc::now().timestamp();

    let changed = users
        .change_password(
            registered.id.unwrap(),
            ChangePasswordDto {
                password: "newpassword1".to_string(),
                password_confirm: "newpassword1".to_string(),
            },
        )
        .await
        .unwrap()
        .expect("account exists");

    assert!(changed.verify_password("newpassword1"));
    assert!(!changed.verify_password("password123"));
    assert!(changed.password_changed_after(issued_at - 3600));

    let stored = users.find_by_email(&registered.email).await.unwrap().unwrap();
    assert!(stored.verify_password("newpassword1"));
    assert!(stored.password_changed_at.is_some());
}

#[tokio::test]
async fn tour_reviews_read_with_author_public_fields() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let users = UserStore::new(&db);
    let reviews = ReviewStore::new(&db);

    let author = users.register(register_dto()).await.unwrap();
    let tour = insert_tour(&db).await;

    reviews
        .create(review_dto(tour, author.id.unwrap(), 5.0))
        .await
        .unwrap();

    let listed = reviews.find_by_tour(tour).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].rating, 5.0);
    assert_eq!(listed[0].author.name, "Ada");
}

#[tokio::test]
async fn deactivated_accounts_leave_default_reads() {
    let db = match test_db().await {
        Some(db) => db,
        None => return,
    };
    let users = UserStore::new(&db);

    let registered = users.register(register_dto()).await.unwrap();
    let id = registered.id.unwrap();

    assert!(users.find_by_id(id).await.unwrap().is_some());
    assert!(users.deactivate(id).await.unwrap());
    assert!(users.find_by_id(id).await.unwrap().is_none());
    assert!(users.find_by_email(&registered.email).await.unwrap().is_none());
}
