use std::path::PathBuf;
use std::sync::Arc;

use coursekit_core::{AppConfig, CourseDraft, Environment, Location, PersistedCourse, Position};
use coursekit_draft::{DraftSession, DraftStore, FileStorage, KeyValueStorage, MemoryStorage};

use super::*;
use crate::draft::{
    parse_draft_yaml, render_geometry, run_draft_command, LocationCommands, TagCommands,
};

fn test_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        draft_dir: PathBuf::from("./.coursekit/drafts"),
        draft_debounce_ms: 500,
        database_url: None,
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        image_max_size_mb: 1.0,
        image_max_dimension: 1920,
        title_max_chars: 100,
        description_max_chars: 2000,
        max_locations: 30,
    }
}

fn memory_session() -> DraftSession {
    let store = DraftStore::new(Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStorage>);
    DraftSession::resume(store, COURSE_DRAFT_KEY)
}

fn run(session: &mut DraftSession, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["coursekit", "draft"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("expected valid cli args");
    let Some(Commands::Draft { command }) = cli.command else {
        panic!("expected a draft command");
    };
    run_draft_command(session, command, &test_config())
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["coursekit"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert_eq!(cli.key, COURSE_DRAFT_KEY);
}

#[test]
fn parses_global_key() {
    let cli = Cli::try_parse_from(["coursekit", "geometry", "--key", "draft:busan", "--json"])
        .expect("expected valid cli args");
    assert_eq!(cli.key, "draft:busan");
    assert!(matches!(cli.command, Some(Commands::Geometry { json: true })));
}

#[test]
fn parses_publish_with_author() {
    let cli = Cli::try_parse_from(["coursekit", "publish", "--author", "author-7"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Publish { ref author }) if author == "author-7"
    ));
}

#[test]
fn parses_db_commands() {
    let cli = Cli::try_parse_from(["coursekit", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_show_course_id() {
    let id = "7f1c9a52-3d0e-4b8a-9c61-2f4e5d6a7b8c";
    let cli = Cli::try_parse_from(["coursekit", "show-course", id]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::ShowCourse { id: parsed }) if parsed.to_string() == id
    ));
    assert!(Cli::try_parse_from(["coursekit", "show-course", "not-a-uuid"]).is_err());
}

#[test]
fn location_add_accepts_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "coursekit", "draft", "location", "add", "--name", "Opera House", "--lat", "-33.8568",
        "--lng", "151.2153",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Draft {
            command: DraftCommands::Location {
                command: LocationCommands::Add {
                    lat: Some(lat),
                    lng: Some(_),
                    ..
                }
            }
        }) if (lat + 33.8568).abs() < f64::EPSILON
    ));
}

#[test]
fn location_add_requires_both_coordinates() {
    let result = Cli::try_parse_from([
        "coursekit", "draft", "location", "add", "--name", "Bridge", "--lat", "37.5",
    ]);
    assert!(result.is_err());
}

#[test]
fn tag_commands_parse() {
    let cli = Cli::try_parse_from(["coursekit", "draft", "tag", "add", "night"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Draft {
            command: DraftCommands::Tag {
                command: TagCommands::Add { ref tag }
            }
        }) if tag == "night"
    ));
}

#[test]
fn editing_commands_build_up_a_publishable_draft() {
    let mut session = memory_session();

    run(&mut session, &["new"]).unwrap();
    run(
        &mut session,
        &["set", "--title", "Seoul Night Walk", "--description", "A short stroll"],
    )
    .unwrap();
    run(&mut session, &["tag", "add", "night"]).unwrap();
    run(
        &mut session,
        &["location", "add", "--id", "2", "--name", "Park", "--lat", "37.51", "--lng", "127.01"],
    )
    .unwrap();
    run(
        &mut session,
        &[
            "location", "add", "--id", "1", "--name", "Bridge", "--lat", "37.5", "--lng", "127.0",
            "--at", "1",
        ],
    )
    .unwrap();

    let ids: Vec<&str> = session.draft().locations.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(session.draft().tags, vec!["night".to_string()]);
    assert_eq!(
        run(&mut session, &["check"]).unwrap(),
        "draft is ready to publish"
    );

    let saved: Option<CourseDraft> = session.store().get(COURSE_DRAFT_KEY);
    assert_eq!(saved.as_ref(), Some(session.draft()));
}

#[test]
fn new_refuses_to_overwrite_without_force() {
    let store = DraftStore::new(Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStorage>);
    let mut draft = CourseDraft::new();
    draft.title = "Keep me".to_string();
    store.save(COURSE_DRAFT_KEY, &draft);

    let mut session = DraftSession::resume(store, COURSE_DRAFT_KEY);
    assert!(run(&mut session, &["new"]).is_err());
    assert_eq!(session.draft().title, "Keep me");

    run(&mut session, &["new", "--force"]).unwrap();
    assert_eq!(session.draft().title, "");
}

#[test]
fn check_reports_the_failing_field() {
    let mut session = memory_session();
    let err = run(&mut session, &["check"]).unwrap_err();
    assert!(err.to_string().contains("title"));
}

#[test]
fn move_and_position_use_one_based_indexes() {
    let mut session = memory_session();
    run(&mut session, &["location", "add", "--id", "a", "--name", "A"]).unwrap();
    run(&mut session, &["location", "add", "--id", "b", "--name", "B"]).unwrap();

    run(&mut session, &["location", "move", "2", "1"]).unwrap();
    assert_eq!(session.draft().locations[0].id, "b");
    assert!(run(&mut session, &["location", "move", "0", "1"]).is_err());

    run(&mut session, &["location", "position", "a", "--lat", "1.5", "--lng", "2.5"]).unwrap();
    assert_eq!(
        session.draft().location("a").and_then(|l| l.position),
        Some(Position::new(1.5, 2.5))
    );
    run(&mut session, &["location", "position", "a", "--clear"]).unwrap();
    assert_eq!(session.draft().location("a").and_then(|l| l.position), None);

    assert!(run(&mut session, &["location", "remove", "missing"]).is_err());
}

#[test]
fn set_with_empty_hero_clears_it() {
    let mut session = memory_session();
    run(&mut session, &["set", "--hero", "/photos/cover.jpg"]).unwrap();
    assert_eq!(session.draft().hero_image_ref.as_deref(), Some("/photos/cover.jpg"));
    run(&mut session, &["set", "--hero", ""]).unwrap();
    assert_eq!(session.draft().hero_image_ref, None);
    assert!(run(&mut session, &["set"]).is_err());
}

#[test]
fn yaml_drafts_fill_missing_fields_with_defaults() {
    let draft = parse_draft_yaml(
        "title: Seoul Night Walk\n\
         description: A short stroll\n\
         locations:\n\
         \x20 - id: \"1\"\n\
         \x20   name: Bridge\n\
         \x20   position: { lat: 37.5, lng: 127.0 }\n",
    )
    .unwrap();

    assert_eq!(draft.title, "Seoul Night Walk");
    assert!(draft.tags.is_empty());
    assert_eq!(draft.locations.len(), 1);
    assert_eq!(draft.locations[0].position, Some(Position::new(37.5, 127.0)));
}

#[test]
fn import_replaces_the_draft_and_warns_when_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("course.yaml");
    std::fs::write(&path, "title: Only a title\n").unwrap();

    let mut session = memory_session();
    let out = run(&mut session, &["import", path.to_str().unwrap()]).unwrap();

    assert_eq!(session.draft().title, "Only a title");
    assert!(out.contains("not publishable yet: description"));
}

#[test]
fn import_with_repeated_tags_and_stop_ids_is_normalised_and_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("course.yaml");
    std::fs::write(
        &path,
        "title: Walk\n\
         description: Loop\n\
         tags: [night, night]\n\
         locations:\n\
         \x20 - { id: \"1\", name: A }\n\
         \x20 - { id: \"1\", name: B }\n",
    )
    .unwrap();

    let mut session = memory_session();
    let out = run(&mut session, &["import", path.to_str().unwrap()]).unwrap();

    assert_eq!(session.draft().tags, vec!["night".to_string()]);
    assert!(out.contains("locations: duplicate id '1'"), "got {out}");
    assert!(run(&mut session, &["check"]).is_err());
}

#[test]
fn drafts_survive_a_new_process_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let open = || {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(dir.path()));
        DraftSession::resume(DraftStore::new(storage), COURSE_DRAFT_KEY)
    };

    let mut first = open();
    run(&mut first, &["set", "--title", "Persisted"]).unwrap();
    assert!(first.store().flush());

    let second = open();
    assert!(second.was_restored());
    assert_eq!(second.draft().title, "Persisted");
}

#[test]
fn geometry_renders_text_and_json() {
    let mut session = memory_session();
    assert_eq!(
        render_geometry(&session.geometry(), false).unwrap(),
        "no positioned stops"
    );

    run(&mut session, &["location", "add", "--id", "1", "--name", "Bridge", "--lat", "37.5", "--lng", "127.0"]).unwrap();
    run(&mut session, &["location", "add", "--id", "2", "--name", "Park", "--lat", "37.51", "--lng", "127.01"]).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&render_geometry(&session.geometry(), true).unwrap()).unwrap();
    assert_eq!(json["has_route_line"], serde_json::Value::Bool(true));
    assert_eq!(json["path"].as_array().map(Vec::len), Some(2));
    assert!((json["centroid"]["lat"].as_f64().unwrap() - 37.505).abs() < 1e-9);
}

#[test]
fn published_course_renders_stops_in_order() {
    use chrono::TimeZone;

    let mut draft = CourseDraft::new();
    draft.title = "Seoul Night Walk".to_string();
    draft.tags = vec!["night".to_string(), "river".to_string()];
    draft
        .push_location(Location::new("1", "Bridge").with_image("https://cdn.example.com/bridge.jpg"))
        .unwrap();
    draft.push_location(Location::new("2", "Park")).unwrap();
    let created_at = chrono::Utc.with_ymd_and_hms(2026, 10, 1, 9, 30, 0).unwrap();
    let course = PersistedCourse::from_draft(uuid::Uuid::nil(), "author-7", created_at, &draft);

    assert_eq!(
        crate::publish::render_course(&course),
        "Seoul Night Walk (00000000-0000-0000-0000-000000000000)\n\
         by author-7 on 2026-10-01 09:30 UTC\n\
         tags: night, river\n\
         \x20 1. Bridge [1] (https://cdn.example.com/bridge.jpg)\n\
         \x20 2. Park [2] (no image)"
    );
}

#[test]
fn compression_options_follow_config() {
    let options = crate::publish::compression_options(&test_config());
    assert_eq!(options.max_dimension, Some(1920));
    assert_eq!(options.max_size_mb, Some(1.0));
}
