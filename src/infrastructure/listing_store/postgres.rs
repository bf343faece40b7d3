//! PostgreSQL listing store implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::domain::cache::QueryCriteria;
use crate::domain::listing::{DailySnapshot, Listing, ListingStore, ListingSummary, SearchPage};
use crate::domain::DomainError;

const LISTING_COLUMNS: &str = "id, title, description, city, price, bedrooms, bathrooms, \
                               area_m2, property_type, listing_kind, featured, images, views, \
                               created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, title, city, price, bedrooms, property_type, listing_kind, images, views";

/// PostgreSQL implementation of ListingStore
#[derive(Debug, Clone)]
pub struct PostgresListingStore {
    pool: PgPool,
}

impl PostgresListingStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn summaries(&self, sql: String, limit: i64) -> Result<Vec<ListingSummary>, DomainError> {
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to fetch listings: {}", e)))?;

        rows.iter().map(row_to_summary).collect()
    }
}

#[async_trait]
impl ListingStore for PostgresListingStore {
    async fn listing(&self, id: i64) -> Result<Option<Listing>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM listings WHERE id = $1 AND published = TRUE",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get listing: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_listing(&row)?)),
            None => Ok(None),
        }
    }

    async fn popular_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError> {
        self.summaries(
            format!(
                "SELECT {} FROM listings WHERE published = TRUE \
                 ORDER BY views DESC, id LIMIT $1",
                SUMMARY_COLUMNS
            ),
            limit,
        )
        .await
    }

    async fn featured_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError> {
        self.summaries(
            format!(
                "SELECT {} FROM listings WHERE published = TRUE AND featured = TRUE \
                 ORDER BY updated_at DESC LIMIT $1",
                SUMMARY_COLUMNS
            ),
            limit,
        )
        .await
    }

    async fn recent_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError> {
        self.summaries(
            format!(
                "SELECT {} FROM listings WHERE published = TRUE \
                 ORDER BY created_at DESC LIMIT $1",
                SUMMARY_COLUMNS
            ),
            limit,
        )
        .await
    }

    async fn search(&self, criteria: &QueryCriteria) -> Result<SearchPage, DomainError> {
        let filter = SearchFilter::from_criteria(criteria);

        let count_sql = format!("SELECT COUNT(*) FROM listings WHERE {}", filter.where_clause);
        let total: i64 = filter
            .bind_scalar(sqlx::query_scalar(&count_sql))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count listings: {}", e)))?;

        let page_sql = format!(
            "SELECT {} FROM listings WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            SUMMARY_COLUMNS,
            filter.where_clause,
            filter.order_by,
            filter.per_page,
            (filter.page - 1) * filter.per_page,
        );
        let rows = filter
            .bind_rows(sqlx::query(&page_sql))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to search listings: {}", e)))?;

        let items = rows
            .iter()
            .map(row_to_summary)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchPage {
            items,
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    async fn daily_snapshot(&self, date: NaiveDate) -> Result<Option<DailySnapshot>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT date, views, leads, new_listings
            FROM daily_stats
            WHERE date = $1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get daily snapshot: {}", e)))?;

        match row {
            Some(row) => Ok(Some(DailySnapshot {
                date: row.get("date"),
                views: row.get("views"),
                leads: row.get("leads"),
                new_listings: row.get("new_listings"),
            })),
            None => Ok(None),
        }
    }

    async fn add_view_counts(&self, listing_id: i64, count: i64) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE listings SET views = views + $2 WHERE id = $1")
            .bind(listing_id)
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to add view counts: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::storage(format!(
                "Listing '{}' not found for view flush",
                listing_id
            )));
        }

        Ok(())
    }
}

/// Bind values a search filter accumulates in placeholder order
enum Bind {
    Text(String),
    Int(i64),
}

/// WHERE clause and ordering derived from search criteria.
///
/// Filter conditions use numbered placeholders so the same binds serve
/// both the COUNT and the page query. Pagination is clamped and inlined
/// as integers, never user text.
struct SearchFilter {
    where_clause: String,
    order_by: String,
    binds: Vec<Bind>,
    page: i64,
    per_page: i64,
}

impl SearchFilter {
    fn from_criteria(criteria: &QueryCriteria) -> Self {
        let mut conditions = vec!["published = TRUE".to_string()];
        let mut binds = Vec::new();

        let mut text_filter = |field: &str, value: Option<&str>| {
            if let Some(value) = value {
                binds.push(Bind::Text(value.to_string()));
                conditions.push(format!("{} = ${}", field, binds.len()));
            }
        };

        text_filter("city", criteria.get_str("city"));
        text_filter("property_type", criteria.get_str("property_type"));
        text_filter("listing_kind", criteria.get_str("listing_kind"));

        if criteria.get_bool("featured") == Some(true) {
            conditions.push("featured = TRUE".to_string());
        }

        if let Some(min_price) = criteria.get_i64("min_price") {
            binds.push(Bind::Int(min_price));
            conditions.push(format!("price >= ${}", binds.len()));
        }

        if let Some(max_price) = criteria.get_i64("max_price") {
            binds.push(Bind::Int(max_price));
            conditions.push(format!("price <= ${}", binds.len()));
        }

        if let Some(bedrooms) = criteria.get_i64("bedrooms") {
            binds.push(Bind::Int(bedrooms));
            conditions.push(format!("bedrooms >= ${}", binds.len()));
        }

        let order_by = match criteria.get_str("sort") {
            Some("newest") => "created_at DESC",
            Some("price_asc") => "price ASC, id",
            Some("price_desc") => "price DESC, id",
            Some("popular") => "views DESC, id",
            _ => "updated_at DESC",
        }
        .to_string();

        let page = criteria.get_i64("page").unwrap_or(1).max(1);
        let per_page = criteria.get_i64("per_page").unwrap_or(20).clamp(1, 100);

        Self {
            where_clause: conditions.join(" AND "),
            order_by,
            binds,
            page,
            per_page,
        }
    }

    fn bind_rows<'q>(
        &'q self,
        mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        for bind in &self.binds {
            query = match bind {
                Bind::Text(value) => query.bind(value),
                Bind::Int(value) => query.bind(value),
            };
        }

        query
    }

    fn bind_scalar<'q, O>(
        &'q self,
        mut query: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
        for bind in &self.binds {
            query = match bind {
                Bind::Text(value) => query.bind(value),
                Bind::Int(value) => query.bind(value),
            };
        }

        query
    }
}

fn row_to_listing(row: &sqlx::postgres::PgRow) -> Result<Listing, DomainError> {
    let images: serde_json::Value = row.get("images");
    let images = serde_json::from_value(images)
        .map_err(|e| DomainError::storage(format!("Invalid images payload in database: {}", e)))?;

    Ok(Listing {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        city: row.get("city"),
        price: row.get("price"),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        area_m2: row.get("area_m2"),
        property_type: row.get("property_type"),
        listing_kind: row.get("listing_kind"),
        featured: row.get("featured"),
        images,
        views: row.get("views"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_summary(row: &sqlx::postgres::PgRow) -> Result<ListingSummary, DomainError> {
    let images: serde_json::Value = row.get("images");
    let images: Vec<String> = serde_json::from_value(images)
        .map_err(|e| DomainError::storage(format!("Invalid images payload in database: {}", e)))?;

    Ok(ListingSummary {
        id: row.get("id"),
        title: row.get("title"),
        city: row.get("city"),
        price: row.get("price"),
        bedrooms: row.get("bedrooms"),
        property_type: row.get("property_type"),
        listing_kind: row.get("listing_kind"),
        cover_image: images.into_iter().next(),
        views: row.get("views"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_filter_numbers_placeholders_in_order() {
        let criteria = QueryCriteria::new()
            .city("porto")
            .listing_kind("sale")
            .min_price(100_000)
            .max_price(400_000);

        let filter = SearchFilter::from_criteria(&criteria);

        assert_eq!(
            filter.where_clause,
            "published = TRUE AND city = $1 AND listing_kind = $2 \
             AND price >= $3 AND price <= $4"
        );
        assert_eq!(filter.binds.len(), 4);
    }

    #[test]
    fn test_search_filter_defaults() {
        let filter = SearchFilter::from_criteria(&QueryCriteria::new());

        assert_eq!(filter.where_clause, "published = TRUE");
        assert_eq!(filter.order_by, "updated_at DESC");
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, 20);
    }

    #[test]
    fn test_search_filter_clamps_pagination() {
        let criteria = QueryCriteria::new().page(0).per_page(5000);
        let filter = SearchFilter::from_criteria(&criteria);

        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, 100);
    }

    #[test]
    fn test_search_filter_sort_variants() {
        let newest = SearchFilter::from_criteria(&QueryCriteria::new().sort("newest"));
        assert_eq!(newest.order_by, "created_at DESC");

        let cheap = SearchFilter::from_criteria(&QueryCriteria::new().sort("price_asc"));
        assert_eq!(cheap.order_by, "price ASC, id");

        let unknown = SearchFilter::from_criteria(&QueryCriteria::new().sort("bogus"));
        assert_eq!(unknown.order_by, "updated_at DESC");
    }
}
