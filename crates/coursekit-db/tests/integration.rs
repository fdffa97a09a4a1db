//! Offline tests for coursekit-db pool configuration, row types and error
//! mapping. These tests do not require a live database connection.

use chrono::Utc;
use coursekit_core::{AppConfig, Environment, Location, Position, RepositoryError};
use coursekit_db::{connect_pool_from_config, CourseLocationRow, CourseRow, DbError, PoolConfig};
use std::path::PathBuf;
use uuid::Uuid;

fn app_config(database_url: Option<&str>) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        draft_dir: PathBuf::from("./.coursekit/drafts"),
        draft_debounce_ms: 500,
        database_url: database_url.map(str::to_string),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        image_max_size_mb: 1.0,
        image_max_dimension: 1920,
        title_max_chars: 100,
        description_max_chars: 2000,
        max_locations: 30,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config(Some("postgres://example")));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connecting_without_database_url_is_a_typed_error() {
    let err = connect_pool_from_config(&app_config(None)).await.unwrap_err();
    assert!(matches!(err, DbError::MissingDatabaseUrl));
    assert!(matches!(
        RepositoryError::from(err),
        RepositoryError::Unavailable(_)
    ));
}

#[test]
fn out_of_range_maps_to_rejected() {
    let err = RepositoryError::from(DbError::OutOfRange {
        column: "course_locations.position",
        value: usize::MAX,
    });
    assert!(matches!(err, RepositoryError::Rejected(_)));
}

#[test]
fn course_row_into_persisted_keeps_location_order() {
    let public_id = Uuid::new_v4();
    let row = CourseRow {
        id: 1,
        public_id,
        author_id: "author-7".to_string(),
        title: "Seoul Night Walk".to_string(),
        description: "A short stroll".to_string(),
        tags: vec!["night".to_string()],
        duration: "2h".to_string(),
        budget: String::new(),
        season: String::new(),
        hero_image_ref: None,
        content: String::new(),
        created_at: Utc::now(),
    };
    let locations = vec![
        CourseLocationRow {
            position: 0,
            location_key: "1".to_string(),
            name: "Bridge".to_string(),
            address: String::new(),
            latitude: Some(37.5),
            longitude: Some(127.0),
            image_ref: None,
        },
        CourseLocationRow {
            position: 1,
            location_key: "2".to_string(),
            name: "Park".to_string(),
            address: "Yeouido".to_string(),
            latitude: None,
            longitude: None,
            image_ref: Some("https://cdn.example.com/park.jpg".to_string()),
        },
    ];

    let course = row.into_persisted(locations);

    assert_eq!(course.id, public_id);
    assert_eq!(course.tags, vec!["night".to_string()]);
    assert_eq!(
        course.locations,
        vec![
            Location::new("1", "Bridge").with_position(Position::new(37.5, 127.0)),
            Location::new("2", "Park")
                .with_address("Yeouido")
                .with_image("https://cdn.example.com/park.jpg"),
        ]
    );
}
