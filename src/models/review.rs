use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub text: String,
    pub rating: f64,
    pub tour: ObjectId,
    pub author: ObjectId,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewDto {
    #[validate(length(min = 1, message = "Review can not be empty"))]
    pub text: String,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: f64,
    pub tour: ObjectId,
    pub author: ObjectId,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewDto {
    #[validate(length(min = 1, message = "Review can not be empty"))]
    pub text: Option<String>,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,
}

/// A review as returned from default reads: the author collapsed to their
/// public fields, creation timestamp not exposed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewWithAuthor {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub text: String,
    pub rating: f64,
    pub tour: ObjectId,
    pub author: AuthorSummary,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthorSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}
