mod common;

use chrono::{Duration, TimeZone, Utc};

use browsetrail::config::load_config;
use browsetrail::timestamp::{self, EpochKind};
use browsetrail::{BrowserRegistry, CleanupError, ExtractError, HistoryError};

use common::{Fixture, HeldLock, write_chrome_history, write_firefox_places};

fn webkit_minutes_after_noon(minutes: i64) -> i64 {
    let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    timestamp::from_datetime(noon + Duration::minutes(minutes), EpochKind::Webkit)
}

fn seed_chrome(fixture: &Fixture, count: i64) {
    let urls: Vec<String> = (0..count).map(|i| format!("https://site{i}.test/")).collect();
    let titles: Vec<String> = (0..count).map(|i| format!("Site {i}")).collect();
    // Insertion order differs from visit order.
    let visits: Vec<_> = (0..count as usize)
        .map(|i| {
            let minute = (i as i64 * 7) % count;
            (urls[i].as_str(), Some(titles[i].as_str()), webkit_minutes_after_noon(minute))
        })
        .collect();
    write_chrome_history(&fixture.chrome_path(), &visits);
}

#[test]
fn chrome_limit_returns_most_recent_first() {
    let fixture = Fixture::new();
    seed_chrome(&fixture, 20);

    let extractor = fixture.registry().get("chrome").expect("chrome");
    let extraction = extractor.get_history(5);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
    assert_eq!(extraction.records.len(), 5);

    let times: Vec<_> = extraction.records.iter().map(|r| r.visited_at).collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]));

    let newest = Utc.with_ymd_and_hms(2024, 5, 1, 12, 19, 0).unwrap();
    assert_eq!(extraction.records[0].visited_at.with_timezone(&Utc), newest);
    assert!(extraction.records.iter().all(|r| r.origin == "chrome"));
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn limit_above_row_count_returns_everything() {
    let fixture = Fixture::new();
    seed_chrome(&fixture, 3);

    let extraction = fixture.registry().get("chrome").expect("chrome").get_history(10_000);
    assert!(extraction.errors.is_empty());
    assert_eq!(extraction.records.len(), 3);
}

#[test]
fn blank_chrome_titles_show_the_url() {
    let fixture = Fixture::new();
    write_chrome_history(
        &fixture.chrome_path(),
        &[
            ("https://untitled.test/", None, webkit_minutes_after_noon(2)),
            ("https://blank.test/", Some("   "), webkit_minutes_after_noon(1)),
            ("https://titled.test/", Some("Titled"), webkit_minutes_after_noon(0)),
        ],
    );

    let extraction = fixture.registry().get("chrome").expect("chrome").get_history(10);
    let titles: Vec<_> = extraction.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["https://untitled.test/", "https://blank.test/", "Titled"]);
}

#[test]
fn firefox_reads_every_visit_from_the_release_profile() {
    let fixture = Fixture::new();
    fixture.firefox_profile("x1y2.default");
    let places = fixture.firefox_profile("a1b2c3.default-release");
    write_firefox_places(
        &places,
        &[
            ("https://mozilla.org/", Some("Mozilla"), 1_700_000_000_000_000),
            ("https://example.com/", None, 1_700_000_100_000_000),
            ("https://mozilla.org/", Some("Mozilla"), 1_700_000_200_000_000),
        ],
    );

    let extraction = fixture.registry().get("Firefox").expect("firefox").get_history(10);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);

    let urls: Vec<_> = extraction.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        ["https://mozilla.org/", "https://example.com/", "https://mozilla.org/"]
    );
    assert_eq!(extraction.records[1].title, "https://example.com/");

    let oldest = extraction.records[2].visited_at.with_timezone(&Utc);
    assert_eq!(oldest, Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap());
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn null_visit_rows_are_skipped_not_fatal() {
    let fixture = Fixture::new();
    let places = fixture.firefox_profile("a1b2c3.default-release");
    write_firefox_places(
        &places,
        &[
            ("https://kept.test/", Some("Kept"), 1_700_000_000_000_000),
            ("https://also-kept.test/", None, 1_700_000_100_000_000),
        ],
    );
    let conn = rusqlite::Connection::open(&places).expect("open places");
    conn.execute_batch(
        "INSERT INTO moz_historyvisits (place_id, visit_date, visit_type)
             SELECT id, NULL, 1 FROM moz_places WHERE url = 'https://kept.test/';
         INSERT INTO moz_places (url, title) VALUES (NULL, 'No url');
         INSERT INTO moz_historyvisits (place_id, visit_date, visit_type)
             SELECT id, 1700000200000000, 1 FROM moz_places WHERE url IS NULL;",
    )
    .expect("insert null rows");
    drop(conn);

    let extraction = fixture.registry().get("firefox").expect("firefox").get_history(10);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
    let urls: Vec<_> = extraction.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, ["https://also-kept.test/", "https://kept.test/"]);
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn firefox_without_release_profile_reports_profile_not_found() {
    let fixture = Fixture::new();
    fixture.firefox_profile("x1y2.default");

    let extraction = fixture.registry().get("firefox").expect("firefox").get_history(10);
    assert!(extraction.records.is_empty());
    assert!(extraction.is_no_data());
    assert!(matches!(
        extraction.extract_error(),
        Some(ExtractError::ProfileNotFound { .. })
    ));
}

#[test]
fn missing_database_is_no_data() {
    let fixture = Fixture::new();

    let extraction = fixture.registry().get("edge").expect("edge").get_history(10);
    assert!(extraction.records.is_empty());
    assert!(extraction.is_no_data());
    assert!(matches!(
        extraction.extract_error(),
        Some(ExtractError::SourceNotFound(_))
    ));
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn schema_mismatch_is_a_query_error_and_clone_is_removed() {
    let fixture = Fixture::new();
    // A Mozilla database where the Chromium profile expects its own schema.
    let chrome = fixture.chrome_path();
    std::fs::create_dir_all(chrome.parent().expect("parent")).expect("mkdir");
    write_firefox_places(&chrome, &[("https://a.test/", None, 1)]);

    let extraction = fixture.registry().get("chrome").expect("chrome").get_history(10);
    assert!(extraction.records.is_empty());
    assert!(!extraction.is_no_data());
    assert!(matches!(extraction.extract_error(), Some(ExtractError::Query(_))));
    assert!(extraction.cleanup_error().is_none());
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn failed_cleanup_keeps_the_records() {
    let fixture = Fixture::new();
    seed_chrome(&fixture, 4);

    let extractor = fixture
        .registry_with(HeldLock::forever())
        .get("chrome")
        .expect("chrome");
    let extraction = extractor.get_history(10);

    assert_eq!(extraction.records.len(), 4);
    assert!(extraction.extract_error().is_none());
    match extraction.cleanup_error() {
        Some(CleanupError::FailedCleanup { path, attempts, .. }) => {
            assert_eq!(*attempts, 11);
            assert!(path.exists());
        }
        None => panic!("expected a cleanup failure"),
    }
    assert!(
        extraction
            .errors
            .iter()
            .all(|err| matches!(err, HistoryError::Cleanup(_)))
    );

    for entry in std::fs::read_dir(&fixture.clones).expect("read clones") {
        std::fs::remove_file(entry.expect("entry").path()).expect("remove leaked clone");
    }
}

#[test]
fn transient_lock_on_clone_is_retried() {
    let fixture = Fixture::new();
    seed_chrome(&fixture, 2);

    let extraction = fixture
        .registry_with(HeldLock::new(4))
        .get("chrome")
        .expect("chrome")
        .get_history(10);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
    assert_eq!(extraction.records.len(), 2);
    assert_eq!(fixture.clone_count(), 0);
}

#[test]
fn configured_browser_is_queried_like_a_builtin() {
    let fixture = Fixture::new();
    let yaml = format!(
        "default_browser: librewolf\n\
         temp_dir: {clones}\n\
         cleanup:\n  backoff_ms: 0\n\
         browsers:\n\
         \x20 - id: librewolf\n\
         \x20   family: mozilla\n\
         \x20   root: roaming\n\
         \x20   profiles_dir: librewolf/Profiles\n\
         \x20   pattern: \"*.default-default\"\n",
        clones = fixture.clones.display()
    );
    let config_path = fixture.dir.path().join("config.yml");
    std::fs::write(&config_path, yaml).expect("write config");
    let cfg = load_config(Some(&config_path)).expect("config");

    let profile = fixture
        .dir
        .path()
        .join("roaming")
        .join("librewolf")
        .join("Profiles")
        .join("q9.default-default");
    std::fs::create_dir_all(&profile).expect("profile dir");
    write_firefox_places(
        &profile.join("places.sqlite"),
        &[("https://librewolf.net/", Some("LibreWolf"), 1_700_000_000_000_000)],
    );

    let registry = BrowserRegistry::from_config(&cfg, fixture.roots()).expect("registry");
    let extraction = registry.get(&cfg.default_browser).expect("librewolf").get_history(5);
    assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
    assert_eq!(extraction.records.len(), 1);
    assert_eq!(extraction.records[0].origin, "librewolf");
    assert_eq!(fixture.clone_count(), 0);
}
