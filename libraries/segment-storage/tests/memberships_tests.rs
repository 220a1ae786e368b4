//! Integration tests for the membership ledger slice
//!
//! Tests ledger operations including:
//! - Bulk insertion with and without a scheduled expiry
//! - Idempotent closing of active memberships
//! - Lazy expiry evaluated against the query instant
//! - Month/year history reconstruction


use chrono::{Duration, TimeZone, Utc};
use segment_core::{HistoryPeriod, SegmentId};
use segment_storage::{memberships, segments, users};
use test_helpers::*;

async fn segment(conn: &mut sqlx::SqliteConnection, slug: &str) -> SegmentId {
    segments::create(conn, slug, Utc::now()).await.unwrap().id
}

#[tokio::test]
async fn test_count_and_sample_users() {
    let test_db = TestDb::new().await;
    seed_users(test_db.pool(), 25).await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    assert_eq!(memberships::count_users(&mut conn).await.unwrap(), 25);

    let sample = memberships::sample_user_ids(&mut conn, 10).await.unwrap();
    let distinct: std::collections::HashSet<_> = sample.iter().copied().collect();
    assert_eq!(sample.len(), 10);
    assert_eq!(distinct.len(), 10);
    assert!(sample.iter().all(|id| (1..=25).contains(&id.get())));

    assert!(memberships::sample_user_ids(&mut conn, 0).await.unwrap().is_empty());
    assert_eq!(memberships::sample_user_ids(&mut conn, 100).await.unwrap().len(), 25);
}

#[tokio::test]
async fn test_insert_with_scheduled_expiry() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    let expiry = now + Duration::days(3);
    users::ensure(&mut conn, user(7), now).await.unwrap();
    let beta = segment(&mut conn, "beta").await;

    let inserted = memberships::insert(&mut conn, &[(user(7), beta)], now, Some(expiry))
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = memberships::list_for_user(&mut conn, user(7)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].segment_id, beta);
    assert_eq!(rows[0].created_at, millis(now));
    assert_eq!(rows[0].deleted_at, Some(millis(expiry)));
    assert!(rows[0].is_active_at(now));
}

#[tokio::test]
async fn test_insert_many_rows_across_chunks() {
    let test_db = TestDb::new().await;
    seed_users(test_db.pool(), 450).await;
    let mut conn = test_db.pool().acquire().await.unwrap();
    let beta = segment(&mut conn, "beta").await;

    let pairs: Vec<_> = (1..=450).map(|id| (user(id), beta)).collect();
    let inserted = memberships::insert(&mut conn, &pairs, Utc::now(), None)
        .await
        .unwrap();

    assert_eq!(inserted, 450);
    assert_eq!(count_memberships(test_db.pool()).await, 450);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let start = Utc::now() - Duration::hours(2);
    users::ensure(&mut conn, user(1), start).await.unwrap();
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(&mut conn, &[(user(1), beta)], start, None)
        .await
        .unwrap();

    let first_close = start + Duration::minutes(30);
    let closed = memberships::close(&mut conn, user(1), &[beta], first_close)
        .await
        .unwrap();
    assert_eq!(closed, 1);

    let second_close = start + Duration::minutes(90);
    let closed = memberships::close(&mut conn, user(1), &[beta], second_close)
        .await
        .unwrap();
    assert_eq!(closed, 0);

    let rows = memberships::list_for_user(&mut conn, user(1)).await.unwrap();
    assert_eq!(rows[0].deleted_at, Some(millis(first_close)));
}

#[tokio::test]
async fn test_close_within_a_second_is_not_backdated() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let noon = Utc.with_ymd_and_hms(2023, 8, 25, 12, 0, 0).unwrap();
    users::ensure(&mut conn, user(1), noon).await.unwrap();
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(&mut conn, &[(user(1), beta)], noon, None)
        .await
        .unwrap();

    memberships::close(&mut conn, user(1), &[beta], noon + Duration::milliseconds(700))
        .await
        .unwrap();

    assert_eq!(
        memberships::active_slugs_for_user(&mut conn, user(1), noon + Duration::milliseconds(300))
            .await
            .unwrap(),
        vec!["beta".to_string()]
    );
    assert!(
        memberships::active_slugs_for_user(&mut conn, user(1), noon + Duration::milliseconds(700))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_close_brings_scheduled_expiry_forward() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    users::ensure(&mut conn, user(1), now).await.unwrap();
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(&mut conn, &[(user(1), beta)], now, Some(now + Duration::days(10)))
        .await
        .unwrap();

    memberships::close(&mut conn, user(1), &[beta], now).await.unwrap();

    let rows = memberships::list_for_user(&mut conn, user(1)).await.unwrap();
    assert_eq!(rows[0].deleted_at, Some(millis(now)));
}

#[tokio::test]
async fn test_close_only_touches_requested_segments() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    users::ensure(&mut conn, user(1), now).await.unwrap();
    users::ensure(&mut conn, user(2), now).await.unwrap();
    let alpha = segment(&mut conn, "alpha").await;
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(
        &mut conn,
        &[(user(1), alpha), (user(1), beta), (user(2), beta)],
        now,
        None,
    )
    .await
    .unwrap();

    memberships::close(&mut conn, user(1), &[beta], now).await.unwrap();

    let later = now + Duration::seconds(1);
    assert_eq!(
        memberships::active_slugs_for_user(&mut conn, user(1), later).await.unwrap(),
        vec!["alpha".to_string()]
    );
    assert_eq!(
        memberships::active_slugs_for_user(&mut conn, user(2), later).await.unwrap(),
        vec!["beta".to_string()]
    );
}

#[tokio::test]
async fn test_active_slugs_follow_the_clock() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    let expiry = now + Duration::hours(1);
    users::ensure(&mut conn, user(3), now).await.unwrap();
    let zeta = segment(&mut conn, "zeta").await;
    let alpha = segment(&mut conn, "alpha").await;
    memberships::insert(&mut conn, &[(user(3), zeta)], now, None).await.unwrap();
    memberships::insert(&mut conn, &[(user(3), alpha)], now, Some(expiry))
        .await
        .unwrap();

    let before = memberships::active_slugs_for_user(&mut conn, user(3), now)
        .await
        .unwrap();
    assert_eq!(before, vec!["alpha".to_string(), "zeta".to_string()]);

    let after = memberships::active_slugs_for_user(&mut conn, user(3), expiry)
        .await
        .unwrap();
    assert_eq!(after, vec!["zeta".to_string()]);
}

#[tokio::test]
async fn test_active_slugs_deduplicate_reenrollment() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    users::ensure(&mut conn, user(4), now).await.unwrap();
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(&mut conn, &[(user(4), beta)], now, None).await.unwrap();
    memberships::insert(&mut conn, &[(user(4), beta)], now, None).await.unwrap();

    let slugs = memberships::active_slugs_for_user(&mut conn, user(4), now)
        .await
        .unwrap();
    assert_eq!(slugs, vec!["beta".to_string()]);
    assert_eq!(memberships::list_for_user(&mut conn, user(4)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_retired_segment_leaves_active_set_but_stays_in_history() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let now = Utc::now();
    users::ensure(&mut conn, user(5), now).await.unwrap();
    let beta = segment(&mut conn, "beta").await;
    memberships::insert(&mut conn, &[(user(5), beta)], now, None).await.unwrap();

    segments::retire(&mut conn, "beta", now).await.unwrap();

    let active = memberships::active_slugs_for_user(&mut conn, user(5), now)
        .await
        .unwrap();
    assert!(active.is_empty());

    let period = HistoryPeriod::containing(now).unwrap();
    let history = memberships::history_for_user(&mut conn, user(5), &period)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].slug, "beta");
    assert!(history[0].deleted_at.is_none());
}

#[tokio::test]
async fn test_history_filters_by_month_and_orders_by_creation() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let july_end = Utc.with_ymd_and_hms(2023, 7, 31, 23, 59, 59).unwrap();
    let aug_start = Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap();
    let aug_mid = Utc.with_ymd_and_hms(2023, 8, 15, 12, 0, 0).unwrap();
    let aug_end = Utc.with_ymd_and_hms(2023, 8, 31, 23, 59, 59).unwrap();
    let sept_start = Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap();

    users::ensure(&mut conn, user(9), july_end).await.unwrap();
    users::ensure(&mut conn, user(10), july_end).await.unwrap();
    let alpha = segment(&mut conn, "alpha").await;
    let beta = segment(&mut conn, "beta").await;

    // Inserted out of chronological order on purpose
    memberships::insert(&mut conn, &[(user(9), alpha)], aug_end, None).await.unwrap();
    memberships::insert(&mut conn, &[(user(9), beta)], aug_start, Some(aug_mid))
        .await
        .unwrap();
    memberships::insert(&mut conn, &[(user(9), alpha)], july_end, None).await.unwrap();
    memberships::insert(&mut conn, &[(user(9), beta)], sept_start, None).await.unwrap();
    memberships::insert(&mut conn, &[(user(10), alpha)], aug_mid, None).await.unwrap();

    let august = HistoryPeriod::new(8, 2023).unwrap();
    let history = memberships::history_for_user(&mut conn, user(9), &august)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].slug, "beta");
    assert_eq!(history[0].created_at, aug_start);
    assert_eq!(history[0].deleted_at, Some(aug_mid));
    assert_eq!(history[1].slug, "alpha");
    assert_eq!(history[1].created_at, aug_end);
    assert!(history[1].deleted_at.is_none());

    let july = HistoryPeriod::new(7, 2022).unwrap();
    assert!(memberships::history_for_user(&mut conn, user(9), &july)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_row_activity_matches_active_slug_query() {
    let test_db = TestDb::new().await;
    let mut conn = test_db.pool().acquire().await.unwrap();

    let start = Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap();
    users::ensure(&mut conn, user(4), start).await.unwrap();
    let open = segment(&mut conn, "open").await;
    let expiring = segment(&mut conn, "expiring").await;
    let closed = segment(&mut conn, "closed").await;
    memberships::insert(&mut conn, &[(user(4), open), (user(4), closed)], start, None)
        .await
        .unwrap();
    memberships::insert(
        &mut conn,
        &[(user(4), expiring)],
        start,
        Some(start + Duration::milliseconds(1_500)),
    )
    .await
    .unwrap();
    memberships::close(&mut conn, user(4), &[closed], start + Duration::milliseconds(250))
        .await
        .unwrap();

    let rows = memberships::list_for_user(&mut conn, user(4)).await.unwrap();
    for offset_ms in [0, 249, 250, 1_000, 1_499, 1_500, 5_000] {
        let at = start + Duration::milliseconds(offset_ms);
        let active_rows = rows.iter().filter(|row| row.is_active_at(at)).count();
        let active_slugs = memberships::active_slugs_for_user(&mut conn, user(4), at)
            .await
            .unwrap();
        assert_eq!(active_rows, active_slugs.len(), "disagreement at +{offset_ms}ms");
    }
}
