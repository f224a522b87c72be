use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::UserDirectory;
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{
    query::{DiscoverQuery, DiscoverResult},
    user::{DiscoveredUser, UserRole, UserSummary},
};

/// Row shape of the discovery query
#[derive(sqlx::FromRow)]
struct DiscoveryRow {
    uid: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    role: String,
    favorite_event_type_ids: Vec<String>,
    distance_km: Option<f64>,
    total: i64,
}

/// Directory backed by a `users` table.
///
/// Expects the `haversine_distance(lat1, lng1, lat2, lng2)` SQL function and
/// coarsened `latitude`/`longitude` columns.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_role(role: &str) -> UserRole {
    match role {
        "sender" => UserRole::Sender,
        "receiver" => UserRole::Receiver,
        _ => UserRole::Both,
    }
}

/// Ages are `int4` in the table; bounds past `i32::MAX` saturate.
fn age_bound(age: u32) -> i32 {
    i32::try_from(age).unwrap_or(i32::MAX)
}

#[async_trait]
impl UserDirectory for PgDirectory {
    #[instrument(skip(self, query), fields(offset = query.offset, radius_km = ?query.radius_km()))]
    async fn discover(&self, query: &DiscoverQuery) -> DirectoryResult<DiscoverResult> {
        let (lat, lng) = match &query.home_location {
            Some(home) => (Some(home.coordinates.lat), Some(home.coordinates.lng)),
            None => (None, None),
        };
        let radius_km = query.filters.max_distance_km.map(f64::from);

        let rows = sqlx::query_as::<_, DiscoveryRow>(
            "WITH candidates AS (
                SELECT
                    u.uid,
                    u.display_name,
                    u.photo_url,
                    u.role,
                    u.favorite_event_type_ids,
                    CASE WHEN $1::float8 IS NULL THEN NULL
                         ELSE haversine_distance($1, $2, u.latitude, u.longitude)
                    END AS distance_km
                FROM users u
                WHERE u.discoverable = true
                  AND ($4::int4 IS NULL OR u.age >= $4)
                  AND ($5::int4 IS NULL OR u.age <= $5)
                  AND ($6::text IS NULL OR $6 = ANY(u.favorite_event_type_ids))
                  AND ($1::float8 IS NULL OR (
                        u.latitude IS NOT NULL
                    AND u.longitude IS NOT NULL
                    AND ($3::float8 IS NULL OR haversine_distance($1, $2, u.latitude, u.longitude) <= $3)
                  ))
             )
             SELECT c.*, COUNT(*) OVER () AS total
             FROM candidates c
             ORDER BY c.distance_km ASC NULLS LAST, c.uid ASC
             LIMIT $7 OFFSET $8",
        )
        .bind(lat)
        .bind(lng)
        .bind(radius_km)
        .bind(query.filters.min_age.map(age_bound))
        .bind(query.filters.max_age.map(age_bound))
        .bind(query.filters.event_type_id.as_deref())
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DirectoryError::Storage(Box::new(e)))?;

        let total = rows.first().map(|r| r.total as usize).unwrap_or(0);
        let users: Vec<DiscoveredUser> = rows
            .into_iter()
            .map(|row| DiscoveredUser {
                user: UserSummary {
                    uid: row.uid,
                    display_name: row.display_name,
                    photo_url: row.photo_url,
                    role: parse_role(&row.role),
                },
                distance_km: row.distance_km,
                favorite_event_type_ids: (!row.favorite_event_type_ids.is_empty())
                    .then_some(row.favorite_event_type_ids),
            })
            .collect();
        let has_more = query.offset + users.len() < total;

        debug!(returned = users.len(), total, "Postgres directory query");

        Ok(DiscoverResult {
            users,
            total,
            has_more,
        })
    }
}
