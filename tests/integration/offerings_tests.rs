//! Offering aggregation over a published catalog

use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uspy_harvest::harvest::{merge_course, FanOutLimits};
use uspy_harvest::offerings::SubjectKey;
use uspy_harvest::storage::{publish_catalog, DocumentStore, SqliteStorage};
use uspy_harvest::{aggregate_offerings, HarvestError, Subject};

fn seed_offering(storage: &mut SqliteStorage, key: &SubjectKey, id: &str, years: &[&str], ratings: &[i64]) {
    let offerings = key.offerings_collection();
    storage
        .write(
            &offerings,
            id,
            &json!({ "professor": format!("Professor {}", id), "years": years }),
        )
        .unwrap();

    for (i, rating) in ratings.iter().enumerate() {
        storage
            .write(
                &format!("{}/{}/comments", offerings, id),
                &format!("comment-{}", i),
                &json!({ "rating": rating, "body": "ok" }),
            )
            .unwrap();
    }
}

#[tokio::test]
async fn test_offerings_of_published_subject() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&temp_dir.path().join("harvest.db")).unwrap();

    let course = merge_course(
        "Bacharelado em Ciências de Computação",
        "55041",
        Some("0".to_string()),
        vec![Subject {
            code: "SMA0356".to_string(),
            name: "Cálculo IV".to_string(),
            ..Subject::default()
        }],
    );
    publish_catalog(&[course], &mut storage);

    let key = SubjectKey::new("SMA0356", "55041", Some("0".to_string()));
    // Same favorable share and disapproval: the tie goes to the latest year
    seed_offering(&mut storage, &key, "p1", &["2018", "2019"], &[5, 1]);
    seed_offering(&mut storage, &key, "p2", &["2021"], &[4, 2]);
    // Best ratings overall
    seed_offering(&mut storage, &key, "p3", &["2017"], &[5, 5, 3]);
    // No comments: all rates are zero
    seed_offering(&mut storage, &key, "p4", &["2022"], &[]);

    let store = Arc::new(Mutex::new(storage));
    let report = aggregate_offerings(
        Arc::clone(&store),
        &key,
        None,
        FanOutLimits::new(2),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let codes: Vec<_> = report.offerings.iter().map(|o| o.code.as_str()).collect();
    assert_eq!(codes, vec!["p3", "p2", "p1", "p4"]);
    assert_eq!(report.total, 4);
    assert!(report.dropped.is_empty());

    let p4 = &report.offerings[3];
    assert_eq!((p4.approval, p4.neutral, p4.disapproval), (0.0, 0.0, 0.0));

    let limited = aggregate_offerings(
        store,
        &key,
        Some(2),
        FanOutLimits::new(2),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let codes: Vec<_> = limited.offerings.iter().map(|o| o.code.as_str()).collect();
    assert_eq!(codes, vec!["p3", "p2"]);
}

#[tokio::test]
async fn test_unknown_subject_has_no_offerings() {
    let storage = SqliteStorage::in_memory().unwrap();
    let key = SubjectKey::new("SCC0230", "55041", None);

    let result = aggregate_offerings(
        Arc::new(Mutex::new(storage)),
        &key,
        None,
        FanOutLimits::new(1),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(HarvestError::NotFound(_))));
}
