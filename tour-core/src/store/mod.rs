//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

pub mod filestore;
pub mod pagestore;


pub use self::filestore::{DirStore, FileStore, MemoryStore};
pub use self::pagestore::{MarkdownPages, Page, PageStore};
use crate::core::ApplicationCfg;
use crate::core::Config;
use std::io;

#[derive(Clone, Debug)]
pub enum Filestore {
    Dir(DirStore),
    Memory(MemoryStore),
}

impl FileStore for Filestore {
    fn info(&self) -> String {
        match self {
            &Filestore::Dir(ref store) => store.info(),
            &Filestore::Memory(ref store) => store.info(),
        }
    }
    fn exists(&self, path: &str) -> bool {
        match self {
            &Filestore::Dir(ref store) => store.exists(path),
            &Filestore::Memory(ref store) => store.exists(path),
        }
    }
    fn read(&self, path: &str) -> Result<Vec<u8>, io::Error> {
        match self {
            &Filestore::Dir(ref store) => store.read(path),
            &Filestore::Memory(ref store) => store.read(path),
        }
    }
    fn write(&self, path: &str, obj: &[u8]) -> Result<(), io::Error> {
        match self {
            &Filestore::Dir(ref store) => store.write(path, obj),
            &Filestore::Memory(ref store) => store.write(path, obj),
        }
    }
    fn delete(&self, path: &str) -> Result<(), io::Error> {
        match self {
            &Filestore::Dir(ref store) => store.delete(path),
            &Filestore::Memory(ref store) => store.delete(path),
        }
    }
    fn list(&self, dir: &str) -> Result<Vec<String>, io::Error> {
        match self {
            &Filestore::Dir(ref store) => store.list(dir),
            &Filestore::Memory(ref store) => store.list(dir),
        }
    }
}

/// Page store and data file store of one installation
#[derive(Clone, Debug)]
pub struct Storage {
    pub pages: MarkdownPages<Filestore>,
    pub files: Filestore,
}

impl Storage {
    /// Empty in-memory storage
    pub fn memory() -> Storage {
        Storage {
            pages: MarkdownPages::new(Filestore::Memory(MemoryStore::new())),
            files: Filestore::Memory(MemoryStore::new()),
        }
    }
}

impl<'a> Config<'a, ApplicationCfg> for Storage {
    fn from_config(config: &ApplicationCfg) -> Result<Self, String> {
        let cfg = &config.store;
        match cfg.backend.as_str() {
            "dir" => Ok(Storage {
                pages: MarkdownPages::new(Filestore::Dir(DirStore::new(&cfg.pages))),
                files: Filestore::Dir(DirStore::new(&cfg.data)),
            }),
            "memory" => Ok(Storage::memory()),
            backend => Err(format!("Unknown store backend '{}'", backend)),
        }
    }
    fn gen_config() -> String {
        let toml = r#"
[store]
# Storage backend: dir or memory
backend = "dir"
# Directory of dataset and tour pages
pages = "user/pages"
# Directory of dataset files, uploads and update staging files
data = "user/data/leaflet-tour"
"#;
        toml.to_string()
    }
    fn gen_runtime_config(&self) -> String {
        format!(
            "# {}\n# {}\n{}",
            self.pages.info(),
            self.files.info(),
            Self::gen_config()
        )
    }
}
