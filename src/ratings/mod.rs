//! Keeps a tour's denormalized rating aggregate in sync with its review set.

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

use crate::error::Result;
use crate::models::review::Review;
use crate::models::tour::{TourRatings, DEFAULT_RATINGS_AVERAGE, DEFAULT_RATINGS_QUANTITY};

/// Notification emitted by the review store after any operation that changed
/// the review set of a tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewChanged {
    pub tour: ObjectId,
}

/// Count and mean rating over one tour's reviews.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingStats {
    pub quantity: i64,
    pub average: f64,
}

impl Default for RatingStats {
    fn default() -> Self {
        Self {
            quantity: DEFAULT_RATINGS_QUANTITY,
            average: DEFAULT_RATINGS_AVERAGE,
        }
    }
}

impl RatingStats {
    /// Pure recompute-from-scratch fold; an empty set yields the defaults.
    pub fn from_ratings(ratings: &[f64]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: f64 = ratings.iter().sum();
        Self {
            quantity: ratings.len() as i64,
            average: sum / ratings.len() as f64,
        }
    }
}

pub struct RatingAggregator {
    reviews: Collection<Review>,
    tours: Collection<TourRatings>,
}

impl RatingAggregator {
    pub fn new(db: &Database) -> Self {
        Self {
            reviews: db.collection("reviews"),
            tours: db.collection("tours"),
        }
    }

    /// Subscription point for the review store's change notifications.
    pub async fn review_changed(&self, event: ReviewChanged) -> Result<()> {
        self.recompute(event.tour).await
    }

    /// Recompute the aggregate from the full review set and write exactly the
    /// two rating fields back. A missing tour is a no-op.
    pub async fn recompute(&self, tour_id: ObjectId) -> Result<()> {
        let cursor = self.reviews.find(doc! { "tour": tour_id }, None).await?;
        let reviews: Vec<Review> = cursor.try_collect().await?;
        let ratings: Vec<f64> = reviews.iter().map(|review| review.rating).collect();
        let stats = RatingStats::from_ratings(&ratings);

        let result = self
            .tours
            .update_one(
                doc! { "_id": tour_id },
                doc! { "$set": {
                    "ratings_quantity": stats.quantity,
                    "ratings_average": stats.average,
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            log::debug!("tour {} no longer exists, rating write skipped", tour_id);
        } else {
            log::debug!(
                "tour {} ratings recomputed: {} reviews, average {:.2}",
                tour_id,
                stats.quantity,
                stats.average
            );
        }
        Ok(())
    }
}
