//! Listing platform payload types
//!
//! These are the shapes that move through the cache. The relational schema
//! behind them belongs to the host application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Full listing detail as served on a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub city: String,
    pub price: i64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_m2: f64,
    pub property_type: String,
    pub listing_kind: String,
    pub featured: bool,
    pub images: Vec<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact listing representation for result sets and popular lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    pub city: String,
    pub price: i64,
    pub bedrooms: i32,
    pub property_type: String,
    pub listing_kind: String,
    pub cover_image: Option<String>,
    pub views: i64,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<ListingSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Aggregated analytics for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub views: i64,
    pub leads: i64,
    pub new_listings: i64,
}

impl Listing {
    pub fn summary(&self) -> ListingSummary {
        ListingSummary {
            id: self.id,
            title: self.title.clone(),
            city: self.city.clone(),
            price: self.price,
            bedrooms: self.bedrooms,
            property_type: self.property_type.clone(),
            listing_kind: self.listing_kind.clone(),
            cover_image: self.images.first().cloned(),
            views: self.views,
        }
    }
}
