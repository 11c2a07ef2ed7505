//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;

/// Blob storage addressed by relative paths like `datasets/cities.json`
pub trait FileStore {
    fn info(&self) -> String;
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<Vec<u8>, io::Error>;
    fn write(&self, path: &str, obj: &[u8]) -> Result<(), io::Error>;
    /// Deleting a missing file is not an error
    fn delete(&self, path: &str) -> Result<(), io::Error>;
    /// Paths of the files directly below `dir`, sorted
    fn list(&self, dir: &str) -> Result<Vec<String>, io::Error>;

    fn read_string(&self, path: &str) -> Result<String, io::Error> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

#[derive(Clone, Debug)]
pub struct DirStore {
    pub basepath: String,
}

impl DirStore {
    pub fn new(basepath: &str) -> DirStore {
        DirStore {
            basepath: basepath.trim_end_matches('/').to_string(),
        }
    }
    fn fullpath(&self, path: &str) -> String {
        format!("{}/{}", self.basepath, path)
    }
}

impl FileStore for DirStore {
    fn info(&self) -> String {
        format!("Directory: {}", self.basepath)
    }
    fn exists(&self, path: &str) -> bool {
        Path::new(&self.fullpath(path)).is_file()
    }
    fn read(&self, path: &str) -> Result<Vec<u8>, io::Error> {
        let fullpath = self.fullpath(path);
        debug!("DirStore.read {}", fullpath);
        let mut f = File::open(&fullpath)?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        Ok(buf)
    }
    fn write(&self, path: &str, obj: &[u8]) -> Result<(), io::Error> {
        let fullpath = self.fullpath(path);
        debug!("DirStore.write {}", fullpath);
        if let Some(parent) = Path::new(&fullpath).parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = File::create(&fullpath)?;
        f.write_all(obj)
    }
    fn delete(&self, path: &str) -> Result<(), io::Error> {
        let fullpath = self.fullpath(path);
        debug!("DirStore.delete {}", fullpath);
        match fs::remove_file(&fullpath) {
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
    fn list(&self, dir: &str) -> Result<Vec<String>, io::Error> {
        let fullpath = self.fullpath(dir);
        let entries = match fs::read_dir(&fullpath) {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    paths.push(join(dir, name));
                }
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// In-memory store. Clones share their content.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl FileStore for MemoryStore {
    fn info(&self) -> String {
        format!("Memory store ({} files)", self.files.borrow().len())
    }
    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
    fn read(&self, path: &str) -> Result<Vec<u8>, io::Error> {
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path))
        })
    }
    fn write(&self, path: &str, obj: &[u8]) -> Result<(), io::Error> {
        debug!("MemoryStore.write {}", path);
        self.files
            .borrow_mut()
            .insert(path.to_string(), obj.to_vec());
        Ok(())
    }
    fn delete(&self, path: &str) -> Result<(), io::Error> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }
    fn list(&self, dir: &str) -> Result<Vec<String>, io::Error> {
        let prefix = join(dir, "");
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| path.starts_with(&prefix) && !path[prefix.len()..].contains('/'))
            .cloned()
            .collect())
    }
}
