//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::repository::Repository;
use crate::session::*;
use tour_core::core::feature::PropertyValue;
use tour_core::core::matcher::MatchKey;
use tour_core::core::options::MarkerDefaults;
use tour_core::core::reconcile::StandardOps;
use tour_core::core::tour::TourHeader;
use tour_core::core::Issue;
use tour_core::store::{FileStore, Storage};

const POINTS_JSON: &[u8] = include_bytes!("test/points.json");
const UPDATE_JSON: &[u8] = include_bytes!("test/cities_update.json");
const LAKES_JS: &[u8] = include_bytes!("test/swiss_lakes.js");

fn repo() -> Repository {
    let mut repo = Repository::new(Storage::memory(), MarkerDefaults::default());
    repo.import_upload("points.json", POINTS_JSON, None).unwrap();
    repo
}

/// Add, modify and remove matched by city name
fn settings(repo: &Repository) -> UpdateSettings {
    UpdateSettings {
        file: Some(repo.store_upload("cities_update.json", UPDATE_JSON).unwrap()),
        dataset: Some("swiss-cities".to_string()),
        match_key: MatchKey::Property,
        match_property: Some("City Name".to_string()),
        standard: StandardOps {
            add: true,
            modify: true,
            remove: true,
        },
        ..Default::default()
    }
}

fn confirmed(settings: &UpdateSettings) -> UpdateSettings {
    UpdateSettings {
        confirm: true,
        ..settings.clone()
    }
}

fn feature_ids(repo: &Repository) -> Vec<String> {
    repo.datasets()["swiss-cities"]
        .features()
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_start() {
    let mut repo = repo();
    let mut session = UpdateSession::load(&repo).unwrap();
    assert_eq!(session.state(), SessionState::Start);
    let status = session.step(&mut repo, UpdateSettings::default()).unwrap();
    assert_eq!(status.state, SessionState::Start);
    assert!(!status.confirm_ready);
    assert_eq!(
        status.issues,
        vec![Issue::NoFile, Issue::NoDataset, Issue::NoStandardOperation]
    );
    assert!(status.message.starts_with("- Please upload a file."));
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        json!({"message": status.message, "confirmReady": false, "state": "start"})
    );
}

#[test]
fn test_corrections() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let mut request = settings(&repo);
    request.match_property = None;
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert_eq!(status.state, SessionState::Corrections);
    assert_eq!(status.issues, vec![Issue::NoMatchProperty]);

    request.match_property = Some("City Name".to_string());
    request.upload_property = Some("name".to_string());
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert_eq!(
        status.issues,
        vec![Issue::UnknownProperty {
            property: "name".to_string(),
            upload: true
        }]
    );

    request.upload_property = None;
    request.match_key = MatchKey::None;
    request.file = Some(repo.store_upload("swiss_lakes.js", LAKES_JS).unwrap());
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert_eq!(status.issues.len(), 2);
    assert_eq!(status.issues[0], Issue::NoMatchKey);
    match &status.issues[1] {
        Issue::FeatureTypeMismatch { .. } => (),
        issue => panic!("unexpected {:?}", issue),
    }
    assert!(!repo.storage().files.exists(STAGED_FILE));
    assert_eq!(
        UpdateSession::load(&repo).unwrap().state(),
        SessionState::Corrections
    );
}

#[test]
fn test_confirm() {
    let mut repo = repo();
    repo.save_tour_page(
        &serde_yaml::from_str::<TourHeader>(
            "title: Cities\ndatasets:\n  - id: swiss-cities\nfeatures:\n  - id: swiss-cities--0\n  - id: swiss-cities--2\n",
        )
        .unwrap(),
    )
    .unwrap();
    let mut session = UpdateSession::load(&repo).unwrap();
    let request = settings(&repo);

    let status = session.step(&mut repo, request.clone()).unwrap();
    assert_eq!(status.state, SessionState::Confirm);
    assert!(status.confirm_ready);
    assert!(status.issues.is_empty());
    assert!(status
        .message
        .contains("1 features added, 2 modified, 1 removed"));
    assert!(status.message.contains("Matched features: Zurich, Bern"));
    assert_eq!(status.staged.as_ref().map(|s| s.features.len()), Some(3));
    assert!(repo.storage().files.exists(STAGED_FILE));
    // live dataset untouched until confirmation
    assert_eq!(
        feature_ids(&repo),
        vec!["swiss-cities--0", "swiss-cities--1", "swiss-cities--2"]
    );

    // the session survives a reload
    let mut session = UpdateSession::load(&repo).unwrap();
    assert_eq!(session.state(), SessionState::Confirm);
    assert_eq!(session.settings(), &request);

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.state, SessionState::None);
    assert_eq!(
        feature_ids(&repo),
        vec!["swiss-cities--0", "swiss-cities--1", "swiss-cities--3"]
    );
    let zurich = repo.datasets()["swiss-cities"]
        .feature("swiss-cities--0")
        .unwrap();
    assert_eq!(
        zurich.properties.get("population"),
        Some(&PropertyValue::Int(421878))
    );
    assert!(!repo.storage().files.exists(STAGED_FILE));
    assert!(!repo.storage().files.exists(ORIGINAL_FILE));
    // removed feature left the tour
    assert_eq!(
        repo.tour("cities")
            .unwrap()
            .features()
            .keys()
            .collect::<Vec<_>>(),
        vec!["swiss-cities--0"]
    );
    assert_eq!(
        UpdateSession::load(&repo).unwrap().state(),
        SessionState::None
    );
}

#[test]
fn test_changed_settings() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let request = settings(&repo);
    session.step(&mut repo, request.clone()).unwrap();

    let mut changed = confirmed(&request);
    changed.standard.remove = false;
    let status = session.step(&mut repo, changed).unwrap();
    assert_eq!(status.state, SessionState::Confirm);
    assert!(status.confirm_ready);
    assert!(status.message.contains("0 removed"));
    assert_eq!(feature_ids(&repo).len(), 3);
    assert!(!session.settings().confirm);
}

#[test]
fn test_modified_dataset() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let request = settings(&repo);
    session.step(&mut repo, request.clone()).unwrap();

    let mut header = repo.datasets()["swiss-cities"].as_header();
    header.features[0].custom_name = Some("Zueri".to_string());
    repo.save_dataset_page(&header).unwrap();

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.issues, vec![Issue::DatasetModified]);
    assert!(status.issues[0].is_not_ready());
    assert_eq!(status.state, SessionState::Confirm);
    assert!(!status.confirm_ready);
    assert_eq!(feature_ids(&repo).len(), 3);

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.state, SessionState::None);
    let zurich = repo.datasets()["swiss-cities"]
        .feature("swiss-cities--0")
        .unwrap();
    assert_eq!(zurich.custom_name, Some("Zueri".to_string()));
}

#[test]
fn test_staged_file_missing() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let request = settings(&repo);
    session.step(&mut repo, request.clone()).unwrap();
    repo.storage().files.delete(STAGED_FILE).unwrap();

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.issues, vec![Issue::StagedFileMissing]);
    assert_eq!(status.state, SessionState::Confirm);
    assert!(repo.storage().files.exists(STAGED_FILE));
    assert_eq!(feature_ids(&repo).len(), 3);
}

#[test]
fn test_staged_file_unreadable() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let request = settings(&repo);
    session.step(&mut repo, request.clone()).unwrap();
    repo.storage()
        .files
        .write(STAGED_FILE, b"{\"features\": [")
        .unwrap();

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.issues, vec![Issue::StagedFileMissing]);
    assert_eq!(status.state, SessionState::Confirm);
    assert!(!status.confirm_ready);
    assert_eq!(feature_ids(&repo).len(), 3);

    let status = session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(status.state, SessionState::None);
}

#[test]
fn test_replace_and_remove() {
    let mut repo = repo();
    let mut session = UpdateSession::default();
    let mut request = settings(&repo);
    request.update_type = UpdateType::Remove;
    request.match_key = MatchKey::None;
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert_eq!(status.issues, vec![Issue::NoMatchKey]);

    request.match_key = MatchKey::Coordinates;
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert!(status.message.contains("0 features added, 0 modified, 2 removed"));

    request.update_type = UpdateType::Replace;
    let status = session.step(&mut repo, request.clone()).unwrap();
    assert!(status.message.contains("1 features added, 2 modified, 1 removed"));
    session.step(&mut repo, confirmed(&request)).unwrap();
    assert_eq!(
        feature_ids(&repo),
        vec!["swiss-cities--0", "swiss-cities--1", "swiss-cities--3"]
    );
}
