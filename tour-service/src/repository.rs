//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::upload::parse_upload_file;
use indexmap::IndexMap;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;
use tour_core::core::dataset::{generate_id, Dataset, DatasetHeader, DatasetJson};
use tour_core::core::options::MarkerDefaults;
use tour_core::core::tiles::TileServers;
use tour_core::core::tour::{DatasetLookup, Tour, TourHeader};
use tour_core::core::{ApplicationCfg, Config, Issue};
use tour_core::store::pagestore::format_page;
use tour_core::store::{FileStore, Page, PageStore, Storage};

/// Page directory of datasets, also the data directory of dataset files
pub const DATASET_DIR: &str = "datasets";
pub const TOUR_DIR: &str = "tours";
/// Original uploads of imported datasets, one subdirectory per dataset id
pub const UPLOAD_DIR: &str = "uploads";
/// Files uploaded for the running update session
pub const UPDATE_UPLOAD_DIR: &str = "update/uploads";

/// Page header keys written from a `DatasetHeader`
const DATASET_KEYS: &[&str] = &[
    "id",
    "title",
    "name_prop",
    "features",
    "legend_text",
    "legend_alt",
    "icon_alt",
    "icon",
    "svg",
    "svg_active",
    "attribution",
    "auto_popup_properties",
    "upload_file_path",
];
/// Page header keys written from a `TourHeader`
const TOUR_KEYS: &[&str] = &[
    "id",
    "title",
    "tile_server",
    "datasets",
    "dataset_overrides",
    "features",
];

#[derive(Debug)]
pub enum RepositoryError {
    Invalid(Issue),
    Storage(io::Error),
    /// Unknown tour id
    NotFound(String),
    /// Document could not be serialized or parsed
    Format(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepositoryError::Invalid(issue) => write!(f, "{}", issue),
            RepositoryError::Storage(e) => write!(f, "Storage error: {}", e),
            RepositoryError::NotFound(what) => write!(f, "{} not found", what),
            RepositoryError::Format(e) => write!(f, "Format error: {}", e),
        }
    }
}

impl Error for RepositoryError {}

impl From<Issue> for RepositoryError {
    fn from(issue: Issue) -> RepositoryError {
        RepositoryError::Invalid(issue)
    }
}

impl From<io::Error> for RepositoryError {
    fn from(e: io::Error) -> RepositoryError {
        RepositoryError::Storage(e)
    }
}

/// Path of a dataset file in the data store
pub fn dataset_file(id: &str) -> String {
    format!("{}/{}.json", DATASET_DIR, id)
}

/// File name of an upload without any directory part
fn upload_name(file_name: &str) -> Result<&str, RepositoryError> {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Issue::UnreadableUpload(format!("invalid file name {}", file_name)).into())
}

/// Loaded datasets and tours with their storage
#[derive(Clone, Debug)]
pub struct Repository {
    storage: Storage,
    markers: MarkerDefaults,
    tiles: TileServers,
    datasets: IndexMap<String, Dataset>,
    tours: IndexMap<String, Tour>,
    /// id -> page key
    dataset_pages: IndexMap<String, String>,
    tour_pages: IndexMap<String, String>,
    update_page: String,
}

impl DatasetLookup for Repository {
    fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id)
    }
}

impl Repository {
    pub fn new(storage: Storage, markers: MarkerDefaults) -> Repository {
        Repository {
            storage,
            markers,
            tiles: TileServers::default(),
            datasets: IndexMap::new(),
            tours: IndexMap::new(),
            dataset_pages: IndexMap::new(),
            tour_pages: IndexMap::new(),
            update_page: "update".to_string(),
        }
    }
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
    pub fn markers(&self) -> &MarkerDefaults {
        &self.markers
    }
    pub fn tiles(&self) -> &TileServers {
        &self.tiles
    }
    pub fn datasets(&self) -> &IndexMap<String, Dataset> {
        &self.datasets
    }
    pub fn tours(&self) -> &IndexMap<String, Tour> {
        &self.tours
    }
    pub fn tour(&self, id: &str) -> Option<&Tour> {
        self.tours.get(id)
    }
    /// Page key of the update session
    pub fn update_page(&self) -> &str {
        &self.update_page
    }

    /// Reload all dataset and tour pages. Unreadable documents are skipped.
    pub fn load(&mut self) -> Result<(), RepositoryError> {
        self.datasets.clear();
        self.dataset_pages.clear();
        self.tours.clear();
        self.tour_pages.clear();
        for (id, key, page) in self.load_pages(DATASET_DIR, "dataset")? {
            let header: DatasetHeader = match page.header_as() {
                Ok(header) => header,
                Err(e) => {
                    warn!("Skipping dataset page {}: {}", key, e);
                    continue;
                }
            };
            let blob = match self.read_dataset_file(&id) {
                Ok(blob) => blob,
                Err(e) => {
                    warn!("Skipping dataset {}: {}", id, e);
                    continue;
                }
            };
            let dataset = Dataset::from_persisted(&id, &blob, Some(&header));
            self.dataset_pages.insert(id.clone(), key);
            self.datasets.insert(id, dataset);
        }
        for (id, key, page) in self.load_pages(TOUR_DIR, "tour")? {
            let header: TourHeader = match page.header_as() {
                Ok(header) => header,
                Err(e) => {
                    warn!("Skipping tour page {}: {}", key, e);
                    continue;
                }
            };
            let mut tour = Tour::from_header(&header);
            tour.revalidate(&self.datasets);
            self.tour_pages.insert(id.clone(), key);
            self.tours.insert(id, tour);
        }
        info!(
            "Loaded {} datasets and {} tours",
            self.datasets.len(),
            self.tours.len()
        );
        Ok(())
    }

    /// Pages below `dir` with their id. Pages without id get one generated from their title,
    /// which is saved back to the page.
    fn load_pages(
        &self,
        dir: &str,
        fallback_title: &str,
    ) -> Result<Vec<(String, String, Page)>, RepositoryError> {
        let mut pages = Vec::new();
        let mut new_pages = Vec::new();
        for key in self.storage.pages.keys(dir)? {
            match self.storage.pages.load(&key) {
                Ok(Some(page)) => {
                    let id = page
                        .get_str("id")
                        .filter(|id| !id.is_empty())
                        .map(|id| id.to_string());
                    match id {
                        Some(id) => pages.push((id, key, page)),
                        None => new_pages.push((key, page)),
                    }
                }
                Ok(None) => (),
                Err(e) => warn!("Skipping page {}: {}", key, e),
            }
        }
        let mut ids: Vec<String> = pages.iter().map(|(id, _, _)| id.clone()).collect();
        for (key, mut page) in new_pages {
            let title = page
                .get_str("title")
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(fallback_title)
                .to_string();
            let id = generate_id(&title, &ids);
            page.set_str("id", &id);
            self.storage.pages.save(&key, &page)?;
            info!("Page {}: generated id {}", key, id);
            ids.push(id.clone());
            pages.push((id, key, page));
        }
        Ok(pages)
    }

    fn read_dataset_file(&self, id: &str) -> Result<DatasetJson, RepositoryError> {
        let text = self.storage.files.read_string(&dataset_file(id))?;
        serde_json::from_str(&text).map_err(|e| RepositoryError::Format(e.to_string()))
    }

    /// Page key of a dataset
    pub fn dataset_page(&self, id: &str) -> String {
        self.dataset_pages
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("{}/{}", DATASET_DIR, id))
    }

    pub fn tour_page(&self, id: &str) -> String {
        self.tour_pages
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("{}/{}", TOUR_DIR, id))
    }

    /// Keep a file uploaded for a dataset update. Returns its store path.
    ///
    /// A later upload with the same name replaces it. Dataset originals are never touched.
    pub fn store_upload(&self, file_name: &str, content: &[u8]) -> Result<String, RepositoryError> {
        let path = format!("{}/{}", UPDATE_UPLOAD_DIR, upload_name(file_name)?);
        self.storage.files.write(&path, content)?;
        Ok(path)
    }

    /// Keep the original upload of a new dataset below its own directory
    fn store_original(
        &self,
        id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, RepositoryError> {
        let path = format!("{}/{}/{}", UPLOAD_DIR, id, upload_name(file_name)?);
        self.storage.files.write(&path, content)?;
        Ok(path)
    }

    /// Create a new dataset from an uploaded file. Returns the new dataset id.
    pub fn import_upload(
        &mut self,
        file_name: &str,
        content: &[u8],
        name: Option<&str>,
    ) -> Result<String, RepositoryError> {
        let json = parse_upload_file(file_name, content)?;
        let mut dataset = Dataset::from_geojson(&json)?;
        let existing: Vec<String> = self.datasets.keys().cloned().collect();
        dataset.initialize(name, &existing);
        let upload_path = self.store_original(dataset.id(), file_name, content)?;
        dataset.upload_file_path = Some(upload_path.clone());
        if let Err(e) = self.write_dataset(&dataset) {
            if let Err(e) = self.storage.files.delete(&upload_path) {
                warn!("Removing upload {} failed: {}", upload_path, e);
            }
            return Err(e);
        }
        let id = dataset.id().to_string();
        self.dataset_pages
            .insert(id.clone(), format!("{}/{}", DATASET_DIR, id));
        self.datasets.insert(id.clone(), dataset);
        info!("Imported dataset {} from {}", id, file_name);
        Ok(id)
    }

    /// Write the dataset file and page. Unknown page header keys and the body are kept.
    /// The previous dataset file is restored when the page can't be saved.
    fn write_dataset(&self, dataset: &Dataset) -> Result<(), RepositoryError> {
        let id = dataset.id();
        let path = dataset_file(id);
        let blob = serde_json::to_vec_pretty(&dataset.as_json())
            .map_err(|e| RepositoryError::Format(e.to_string()))?;
        let key = self.dataset_page(id);
        let mut page = self.storage.pages.load(&key)?.unwrap_or_default();
        page.update_header(&dataset.as_header(), DATASET_KEYS)
            .map_err(RepositoryError::Format)?;
        format_page(&page).map_err(RepositoryError::Format)?;

        let files = &self.storage.files;
        let previous = if files.exists(&path) {
            Some(files.read(&path)?)
        } else {
            None
        };
        if let Err(e) = files.write(&path, &blob) {
            error!("Writing dataset {} failed: {}", id, e);
            return Err(e.into());
        }
        if let Err(e) = self.storage.pages.save(&key, &page) {
            error!("Writing dataset page {} failed: {}", key, e);
            let restored = match previous {
                Some(old) => files.write(&path, &old),
                None => files.delete(&path),
            };
            if let Err(e) = restored {
                error!("Restoring {} failed: {}", path, e);
            }
            return Err(e.into());
        }
        debug!("Dataset {} written", id);
        Ok(())
    }

    /// Apply a saved dataset page. Returns the corrected header, which is also written to the
    /// page. Tours using the dataset are revalidated and saved.
    pub fn save_dataset_page(
        &mut self,
        header: &DatasetHeader,
    ) -> Result<DatasetHeader, RepositoryError> {
        let id = header.id.clone().ok_or(Issue::NoDataset)?;
        let mut dataset = self
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| Issue::UnknownDataset(id.clone()))?;
        let corrected = dataset.update_from_header(header);
        self.write_dataset(&dataset)?;
        self.datasets.insert(id.clone(), dataset);
        self.refresh_tours(&id, false)?;
        Ok(corrected)
    }

    /// Replace a dataset by an updated version with the same id
    pub fn replace_dataset(&mut self, dataset: Dataset) -> Result<(), RepositoryError> {
        let id = dataset.id().to_string();
        if !self.datasets.contains_key(&id) {
            return Err(Issue::UnknownDataset(id).into());
        }
        self.write_dataset(&dataset)?;
        self.datasets.insert(id.clone(), dataset);
        self.refresh_tours(&id, false)?;
        info!("Dataset {} replaced", id);
        Ok(())
    }

    /// Delete a dataset with its file, page and original upload, and remove it from all tours
    pub fn delete_dataset(&mut self, id: &str) -> Result<(), RepositoryError> {
        let dataset = self
            .datasets
            .shift_remove(id)
            .ok_or_else(|| Issue::UnknownDataset(id.to_string()))?;
        if let Some(path) = &dataset.upload_file_path {
            self.storage.files.delete(path)?;
        }
        self.storage.files.delete(&dataset_file(id))?;
        let key = self.dataset_page(id);
        self.storage.pages.delete(&key)?;
        self.dataset_pages.shift_remove(id);
        self.refresh_tours(id, true)?;
        info!("Dataset {} deleted", id);
        Ok(())
    }

    /// Revalidate and save every tour using a changed dataset
    fn refresh_tours(&mut self, dataset_id: &str, removed: bool) -> Result<(), RepositoryError> {
        let ids: Vec<String> = self
            .tours
            .iter()
            .filter(|(_, tour)| tour.references_dataset(dataset_id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(tour) = self.tours.get_mut(&id) {
                if removed {
                    tour.remove_dataset(dataset_id);
                }
                tour.revalidate(&self.datasets);
            }
            self.write_tour(&id)?;
            debug!("Tour {} updated for dataset {}", id, dataset_id);
        }
        Ok(())
    }

    fn write_tour(&self, id: &str) -> Result<(), RepositoryError> {
        let tour = self
            .tours
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Tour {}", id)))?;
        let key = self.tour_page(id);
        let mut page = self.storage.pages.load(&key)?.unwrap_or_default();
        page.update_header(&tour.as_header(), TOUR_KEYS)
            .map_err(RepositoryError::Format)?;
        self.storage.pages.save(&key, &page)?;
        Ok(())
    }

    /// Apply a saved tour page. A tour with missing or unknown id is created with an id
    /// generated from its title. Returns the corrected header.
    pub fn save_tour_page(&mut self, header: &TourHeader) -> Result<TourHeader, RepositoryError> {
        let known = header
            .id
            .as_ref()
            .filter(|id| self.tours.contains_key(id.as_str()))
            .cloned();
        let id = match known {
            Some(id) => id,
            None => {
                let existing: Vec<String> = self.tours.keys().cloned().collect();
                let id = generate_id(header.title.as_deref().unwrap_or("tour"), &existing);
                info!("New tour {}", id);
                id
            }
        };
        let mut header = header.clone();
        header.id = Some(id.clone());
        let mut tour = Tour::from_header(&header);
        tour.revalidate(&self.datasets);
        let corrected = tour.as_header();
        let key = self.tour_page(&id);
        self.tour_pages.insert(id.clone(), key);
        self.tours.insert(id.clone(), tour);
        self.write_tour(&id)?;
        Ok(corrected)
    }

    pub fn delete_tour(&mut self, id: &str) -> Result<(), RepositoryError> {
        if self.tours.shift_remove(id).is_none() {
            return Err(RepositoryError::NotFound(format!("Tour {}", id)));
        }
        let key = self.tour_page(id);
        self.storage.pages.delete(&key)?;
        self.tour_pages.shift_remove(id);
        info!("Tour {} deleted", id);
        Ok(())
    }

    /// Render document of a tour
    pub fn render_tour(&mut self, id: &str) -> Option<Value> {
        let markers = &self.markers;
        let tiles = &self.tiles;
        let datasets = &self.datasets;
        match self.tours.get_mut(id) {
            Some(tour) => Some(tour.render_data(markers, tiles, datasets)),
            None => None,
        }
    }
}

const UPDATE_CONFIG: &str = r#"
#[update]
# Page key of the update session
#page = "update"
"#;

impl<'a> Config<'a, ApplicationCfg> for Repository {
    fn from_config(config: &ApplicationCfg) -> Result<Self, String> {
        let storage = Storage::from_config(config)?;
        let markers = MarkerDefaults::from_config(config)?;
        let mut repository = Repository::new(storage, markers);
        repository.tiles = TileServers::from_config(config)?;
        if let Some(page) = config.update.as_ref().and_then(|cfg| cfg.page.clone()) {
            repository.update_page = page;
        }
        Ok(repository)
    }
    fn gen_config() -> String {
        format!(
            "{}{}{}{}",
            Storage::gen_config(),
            MarkerDefaults::gen_config(),
            TileServers::gen_config(),
            UPDATE_CONFIG
        )
    }
    fn gen_runtime_config(&self) -> String {
        format!(
            "# {} datasets, {} tours\n{}{}{}{}",
            self.datasets.len(),
            self.tours.len(),
            self.storage.gen_runtime_config(),
            MarkerDefaults::gen_config(),
            TileServers::gen_config(),
            UPDATE_CONFIG
        )
    }
}
