use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use validator::Validate;

use crate::error::{is_duplicate_key, Error, Result};
use crate::models::review::{CreateReviewDto, Review, ReviewWithAuthor, UpdateReviewDto};
use crate::ratings::{RatingAggregator, ReviewChanged};

/// All review mutations go through this store so that every one of them ends
/// with a `ReviewChanged` notification to the rating aggregator.
pub struct ReviewStore {
    reviews: Collection<Review>,
    ratings: RatingAggregator,
}

impl ReviewStore {
    pub fn new(db: &Database) -> Self {
        Self {
            reviews: db.collection("reviews"),
            ratings: RatingAggregator::new(db),
        }
    }

    /// One review per (tour, author).
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "tour": 1, "author": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.reviews.create_index(index, None).await?;
        Ok(())
    }

    pub async fn create(&self, dto: CreateReviewDto) -> Result<Review> {
        dto.validate()?;

        let review = Review {
            id: None,
            text: dto.text,
            rating: dto.rating,
            tour: dto.tour,
            author: dto.author,
            created_at: DateTime::from_millis(Utc::now().timestamp_millis()),
        };

        let inserted = match self.reviews.insert_one(&review, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => return Err(Error::DuplicateReview),
            Err(e) => return Err(e.into()),
        };

        self.ratings
            .review_changed(ReviewChanged { tour: review.tour })
            .await?;

        Ok(Review {
            id: inserted.inserted_id.as_object_id(),
            ..review
        })
    }

    /// Query-based update. The target is resolved first to capture its tour
    /// reference; after the mutation that reference drives the recompute.
    /// Returns the pre-mutation document, or None when nothing matched.
    pub async fn update_by_id(&self, id: ObjectId, dto: UpdateReviewDto) -> Result<Option<Review>> {
        dto.validate()?;

        let existing = match self.reviews.find_one(doc! { "_id": id }, None).await? {
            Some(review) => review,
            None => return Ok(None),
        };

        let mut set = Document::new();
        if let Some(text) = dto.text {
            set.insert("text", text);
        }
        if let Some(rating) = dto.rating {
            set.insert("rating", rating);
        }
        if !set.is_empty() {
            self.reviews
                .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
                .await?;
        }

        self.ratings
            .review_changed(ReviewChanged { tour: existing.tour })
            .await?;

        Ok(Some(existing))
    }

    /// Query-based delete with the same capture-then-mutate sequencing as
    /// `update_by_id`.
    pub async fn delete_by_id(&self, id: ObjectId) -> Result<Option<Review>> {
        let existing = match self.reviews.find_one(doc! { "_id": id }, None).await? {
            Some(review) => review,
            None => return Ok(None),
        };

        self.reviews.delete_one(doc! { "_id": id }, None).await?;

        self.ratings
            .review_changed(ReviewChanged { tour: existing.tour })
            .await?;

        Ok(Some(existing))
    }

    /// Reviews for one tour with the author collapsed to their public fields.
    pub async fn find_by_tour(&self, tour_id: ObjectId) -> Result<Vec<ReviewWithAuthor>> {
        let pipeline = vec![
            doc! { "$match": { "tour": tour_id } },
            doc! { "$lookup": {
                "from": "users",
                "localField": "author",
                "foreignField": "_id",
                "as": "author",
            } },
            doc! { "$unwind": "$author" },
            doc! { "$project": {
                "text": 1,
                "rating": 1,
                "tour": 1,
                "author.name": 1,
                "author.photo": 1,
            } },
        ];

        let cursor = self.reviews.aggregate(pipeline, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        let mut reviews = Vec::with_capacity(documents.len());
        for document in documents {
            let review: ReviewWithAuthor = mongodb::bson::from_document(document)?;
            reviews.push(review);
        }
        Ok(reviews)
    }
}
