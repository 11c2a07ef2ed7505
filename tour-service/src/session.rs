//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::repository::{Repository, RepositoryError};
use crate::upload::parse_upload_file;
use tour_core::core::dataset::{Dataset, DatasetHeader, DatasetJson};
use tour_core::core::header;
use tour_core::core::issue::issue_list;
use tour_core::core::matcher::{match_features, matched_names, MatchKey};
use tour_core::core::reconcile::{reconcile, StandardOps, UpdateMode, UpdateOutcome};
use tour_core::core::tour::DatasetLookup;
use tour_core::core::Issue;
use tour_core::store::{FileStore, Page, PageStore};

/// Candidate dataset awaiting confirmation
pub const STAGED_FILE: &str = "update/staged.json";
/// Live dataset at staging time
pub const ORIGINAL_FILE: &str = "update/original.json";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No file uploaded
    Start,
    /// Upload or settings have issues
    Corrections,
    /// Candidate staged for review
    Confirm,
    /// Update committed
    None,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Start
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Standard,
    Replace,
    Remove,
}

impl Default for UpdateType {
    fn default() -> Self {
        UpdateType::Standard
    }
}

/// Settings of one update request
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct UpdateSettings {
    /// Path of the uploaded file in the data store
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    pub match_key: MatchKey,
    /// Property of the existing features compared by `MatchKey::Property`
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub match_property: Option<String>,
    /// Property of the uploaded features, defaults to `match_property`
    #[serde(deserialize_with = "header::opt_string", skip_serializing_if = "Option::is_none")]
    pub upload_property: Option<String>,
    pub standard: StandardOps,
    #[serde(deserialize_with = "header::flag")]
    pub confirm: bool,
}

impl UpdateSettings {
    /// Same request, ignoring the confirmation flag
    pub fn same_request(&self, other: &UpdateSettings) -> bool {
        UpdateSettings {
            confirm: false,
            ..self.clone()
        } == UpdateSettings {
            confirm: false,
            ..other.clone()
        }
    }
    fn mode(&self) -> UpdateMode {
        match self.update_type {
            UpdateType::Standard => UpdateMode::Standard(self.standard),
            UpdateType::Replace => UpdateMode::Replace,
            UpdateType::Remove => UpdateMode::Remove,
        }
    }
    fn needs_match_key(&self) -> bool {
        match self.update_type {
            UpdateType::Standard => self.standard.modify || self.standard.remove,
            UpdateType::Replace => false,
            UpdateType::Remove => true,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub message: String,
    pub confirm_ready: bool,
    pub state: SessionState,
    #[serde(skip)]
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged: Option<DatasetJson>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct SessionDocument {
    state: SessionState,
    settings: UpdateSettings,
}

#[derive(Serialize, Deserialize)]
struct StagedDataset {
    dataset: DatasetJson,
    header: DatasetHeader,
}

impl StagedDataset {
    fn of(dataset: &Dataset) -> StagedDataset {
        StagedDataset {
            dataset: dataset.as_json(),
            header: dataset.as_header(),
        }
    }
    fn to_vec(&self) -> Result<Vec<u8>, RepositoryError> {
        serde_json::to_vec(self).map_err(|e| RepositoryError::Format(e.to_string()))
    }
    fn into_dataset(self) -> Option<Dataset> {
        let id = self.header.id.clone()?;
        Some(Dataset::from_persisted(&id, &self.dataset, Some(&self.header)))
    }
}

/// Validated update, not yet staged
struct Prepared {
    outcome: UpdateOutcome,
    matched: Vec<String>,
}

fn read_upload(repo: &Repository, path: &str) -> Result<Dataset, Issue> {
    let files = &repo.storage().files;
    if !files.exists(path) {
        return Err(Issue::NoFile);
    }
    let content = files
        .read(path)
        .map_err(|e| Issue::UnreadableUpload(e.to_string()))?;
    let json = parse_upload_file(path, &content)?;
    Dataset::from_geojson(&json)
}

/// Validate the settings against the repository and compute the candidate.
/// All issues are collected.
fn prepare(repo: &Repository, settings: &UpdateSettings) -> Result<Prepared, Vec<Issue>> {
    let mut issues = Vec::new();
    let uploaded = match &settings.file {
        None => {
            issues.push(Issue::NoFile);
            None
        }
        Some(path) => match read_upload(repo, path) {
            Ok(dataset) => Some(dataset),
            Err(issue) => {
                issues.push(issue);
                None
            }
        },
    };
    let existing = match &settings.dataset {
        None => {
            issues.push(Issue::NoDataset);
            None
        }
        Some(id) => {
            let dataset = repo.dataset(id);
            if dataset.is_none() {
                issues.push(Issue::UnknownDataset(id.clone()));
            }
            dataset
        }
    };
    if settings.update_type == UpdateType::Standard && !settings.standard.any() {
        issues.push(Issue::NoStandardOperation);
    }
    if settings.needs_match_key() && settings.match_key == MatchKey::None {
        issues.push(Issue::NoMatchKey);
    }
    if settings.match_key == MatchKey::Property {
        match &settings.match_property {
            None => issues.push(Issue::NoMatchProperty),
            Some(property) => {
                if let Some(existing) = existing {
                    if !existing.has_property(property) {
                        issues.push(Issue::UnknownProperty {
                            property: property.clone(),
                            upload: false,
                        });
                    }
                }
                let upload_property = settings.upload_property.as_ref().unwrap_or(property);
                if let Some(uploaded) = &uploaded {
                    if !uploaded.has_property(upload_property) {
                        issues.push(Issue::UnknownProperty {
                            property: upload_property.clone(),
                            upload: true,
                        });
                    }
                }
            }
        }
    }
    if let (Some(existing), Some(uploaded)) = (existing, &uploaded) {
        if settings.update_type != UpdateType::Remove
            && existing.feature_type() != uploaded.feature_type()
        {
            issues.push(Issue::FeatureTypeMismatch {
                expected: existing.feature_type(),
                found: uploaded.feature_type(),
            });
        }
    }
    let (existing, uploaded) = match (existing, uploaded) {
        (Some(existing), Some(uploaded)) if issues.is_empty() => (existing, uploaded),
        _ => return Err(issues),
    };
    let matches = match_features(
        settings.match_key,
        settings.match_property.as_deref(),
        settings.upload_property.as_deref(),
        existing.features(),
        uploaded.features(),
    );
    let outcome = reconcile(settings.mode(), &matches, existing, &uploaded)
        .map_err(|issue| vec![issue])?;
    Ok(Prepared {
        outcome,
        matched: matched_names(&matches, existing),
    })
}

fn summary(prepared: &Prepared) -> String {
    let outcome = &prepared.outcome;
    let mut message = format!(
        "Update of dataset {} ready: {} features added, {} modified, {} removed.",
        outcome.candidate.id(),
        outcome.added.len(),
        outcome.modified.len(),
        outcome.removed.len()
    );
    if !prepared.matched.is_empty() {
        message.push_str(&format!(
            "\nMatched features: {}",
            prepared.matched.join(", ")
        ));
    }
    message
}

/// Update workflow of one dataset.
///
/// Each step validates the submitted settings and stages a candidate dataset. The live dataset
/// is only replaced by a confirming step with unchanged settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateSession {
    state: SessionState,
    settings: UpdateSettings,
}

impl UpdateSession {
    /// Session stored in the update page. A missing or unreadable page starts a new session.
    pub fn load(repo: &Repository) -> Result<UpdateSession, RepositoryError> {
        let page = match repo.storage().pages.load(repo.update_page())? {
            Some(page) => page,
            None => return Ok(UpdateSession::default()),
        };
        match page.header_as::<SessionDocument>() {
            Ok(doc) => Ok(UpdateSession {
                state: doc.state,
                settings: doc.settings,
            }),
            Err(e) => {
                warn!("Update session page unreadable, starting over: {}", e);
                Ok(UpdateSession::default())
            }
        }
    }

    fn save(&self, repo: &Repository) -> Result<(), RepositoryError> {
        let doc = SessionDocument {
            state: self.state,
            settings: self.settings.clone(),
        };
        let page = Page::from_header(&doc, "").map_err(RepositoryError::Format)?;
        repo.storage().pages.save(repo.update_page(), &page)?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }

    /// Process submitted settings
    pub fn step(
        &mut self,
        repo: &mut Repository,
        settings: UpdateSettings,
    ) -> Result<UpdateStatus, RepositoryError> {
        let mut issues = Vec::new();
        if settings.confirm
            && self.state == SessionState::Confirm
            && settings.same_request(&self.settings)
        {
            match self.staged_if_current(repo, &settings)? {
                Ok(candidate) => return self.commit(repo, candidate),
                Err(issue) => issues.push(issue),
            }
        }
        self.settings = UpdateSettings {
            confirm: false,
            ..settings
        };
        let status = match prepare(repo, &self.settings) {
            Err(prepare_issues) => {
                issues.extend(prepare_issues);
                discard_staging(repo)?;
                self.state = if self.settings.file.is_none() {
                    SessionState::Start
                } else {
                    SessionState::Corrections
                };
                debug!("Update session: {} issues", issues.len());
                UpdateStatus {
                    message: issue_list(&issues),
                    confirm_ready: false,
                    state: self.state,
                    issues,
                    staged: None,
                }
            }
            Ok(prepared) => {
                stage(repo, &prepared.outcome.candidate)?;
                self.state = SessionState::Confirm;
                let message = if issues.is_empty() {
                    summary(&prepared)
                } else {
                    format!("{}\n{}", issue_list(&issues), summary(&prepared))
                };
                UpdateStatus {
                    message,
                    confirm_ready: issues.is_empty(),
                    state: self.state,
                    issues,
                    staged: Some(prepared.outcome.candidate.as_json()),
                }
            }
        };
        self.save(repo)?;
        Ok(status)
    }

    /// Staged candidate, or the reason why it must be recomputed
    fn staged_if_current(
        &self,
        repo: &Repository,
        settings: &UpdateSettings,
    ) -> Result<Result<Dataset, Issue>, RepositoryError> {
        let files = &repo.storage().files;
        if !files.exists(STAGED_FILE) || !files.exists(ORIGINAL_FILE) {
            return Ok(Err(Issue::StagedFileMissing));
        }
        let live = match settings.dataset.as_ref().and_then(|id| repo.dataset(id)) {
            Some(live) => live,
            None => return Ok(Err(Issue::DatasetModified)),
        };
        if files.read(ORIGINAL_FILE)? != StagedDataset::of(live).to_vec()? {
            return Ok(Err(Issue::DatasetModified));
        }
        let staged: StagedDataset = match serde_json::from_slice(&files.read(STAGED_FILE)?) {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Unreadable staged update: {}", e);
                return Ok(Err(Issue::StagedFileMissing));
            }
        };
        Ok(staged.into_dataset().ok_or(Issue::StagedFileMissing))
    }

    fn commit(
        &mut self,
        repo: &mut Repository,
        candidate: Dataset,
    ) -> Result<UpdateStatus, RepositoryError> {
        let id = candidate.id().to_string();
        repo.replace_dataset(candidate)?;
        discard_staging(repo)?;
        self.state = SessionState::None;
        self.settings = UpdateSettings::default();
        self.save(repo)?;
        info!("Update of dataset {} confirmed", id);
        Ok(UpdateStatus {
            message: format!("Dataset {} has been updated.", id),
            confirm_ready: false,
            state: self.state,
            issues: Vec::new(),
            staged: None,
        })
    }

    /// Drop staged files and start over
    pub fn cancel(&mut self, repo: &Repository) -> Result<(), RepositoryError> {
        discard_staging(repo)?;
        *self = UpdateSession::default();
        self.save(repo)
    }
}

fn stage(repo: &Repository, candidate: &Dataset) -> Result<(), RepositoryError> {
    let live = repo
        .dataset(candidate.id())
        .ok_or_else(|| Issue::UnknownDataset(candidate.id().to_string()))?;
    let original = StagedDataset::of(live).to_vec()?;
    let staged = StagedDataset::of(candidate).to_vec()?;
    let files = &repo.storage().files;
    files.write(ORIGINAL_FILE, &original)?;
    files.write(STAGED_FILE, &staged)?;
    debug!("Staged update of dataset {}", candidate.id());
    Ok(())
}

fn discard_staging(repo: &Repository) -> Result<(), RepositoryError> {
    let files = &repo.storage().files;
    files.delete(STAGED_FILE)?;
    files.delete(ORIGINAL_FILE)?;
    Ok(())
}
