use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RATINGS_QUANTITY: i64 = 0;
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// The slice of a tour document this crate owns: the two derived rating
/// fields. Everything else on the document belongs to other parts of the
/// system and is never read or written here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TourRatings {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub ratings_quantity: i64,
    #[serde(default = "default_ratings_average")]
    pub ratings_average: f64,
}

fn default_ratings_average() -> f64 {
    DEFAULT_RATINGS_AVERAGE
}
