//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::store::filestore::FileStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::io;

const FRONT_MATTER: &str = "---";

/// Named document with a structured header and a raw body
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub header: Mapping,
    pub body: String,
}

impl Page {
    pub fn new(header: Mapping, body: &str) -> Page {
        Page {
            header,
            body: body.to_string(),
        }
    }
    /// Page with a typed header
    pub fn from_header<T: Serialize>(header: &T, body: &str) -> Result<Page, String> {
        Ok(Page::new(to_mapping(header)?, body))
    }
    pub fn header_as<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_yaml::from_value(Value::Mapping(self.header.clone())).map_err(|e| e.to_string())
    }
    /// Replace the keys owned by a typed header. Other header keys are kept.
    pub fn update_header<T: Serialize>(&mut self, header: &T, owned: &[&str]) -> Result<(), String> {
        for key in owned {
            self.header.remove(&Value::String(key.to_string()));
        }
        for (key, value) in to_mapping(header)? {
            self.header.insert(key, value);
        }
        Ok(())
    }
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.header
            .get(&Value::String(key.to_string()))
            .and_then(|v| v.as_str())
    }
    pub fn set_str(&mut self, key: &str, value: &str) {
        self.header
            .insert(Value::String(key.to_string()), Value::String(value.to_string()));
    }
}

fn to_mapping<T: Serialize>(header: &T) -> Result<Mapping, String> {
    match serde_yaml::to_value(header).map_err(|e| e.to_string())? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err("Page header must be a mapping".to_string()),
    }
}

/// Markdown text with a YAML front matter block
pub fn parse_page(text: &str) -> Result<Page, String> {
    if !text.starts_with(FRONT_MATTER) {
        return Ok(Page::new(Mapping::new(), text));
    }
    let rest = &text[FRONT_MATTER.len()..];
    let end = rest
        .find("\n---")
        .ok_or_else(|| "Unterminated front matter".to_string())?;
    let yaml = &rest[..end];
    let body = &rest[end + 4..];
    let body = if body.starts_with("\r\n") {
        &body[2..]
    } else if body.starts_with('\n') {
        &body[1..]
    } else {
        body
    };
    let header = if yaml.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml).map_err(|e| format!("Invalid front matter: {}", e))? {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err("Front matter is not a mapping".to_string()),
        }
    };
    Ok(Page::new(header, body))
}

pub fn format_page(page: &Page) -> Result<String, String> {
    let yaml = if page.header.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(&page.header).map_err(|e| e.to_string())?
    };
    let yaml = yaml.trim_start_matches(FRONT_MATTER).trim();
    Ok(format!(
        "{}\n{}\n{}\n{}",
        FRONT_MATTER, yaml, FRONT_MATTER, page.body
    ))
}

pub trait PageStore {
    fn info(&self) -> String;
    /// `None` if the page does not exist
    fn load(&self, key: &str) -> Result<Option<Page>, io::Error>;
    fn save(&self, key: &str, page: &Page) -> Result<(), io::Error>;
    fn exists(&self, key: &str) -> bool;
    fn delete(&self, key: &str) -> Result<(), io::Error>;
    /// Keys of the pages directly below `prefix`, sorted
    fn keys(&self, prefix: &str) -> Result<Vec<String>, io::Error>;
}

/// Pages stored as `<key>.md` files
#[derive(Clone, Debug)]
pub struct MarkdownPages<S: FileStore> {
    store: S,
}

impl<S: FileStore> MarkdownPages<S> {
    pub fn new(store: S) -> MarkdownPages<S> {
        MarkdownPages { store }
    }
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn page_path(key: &str) -> String {
    format!("{}.md", key)
}

impl<S: FileStore> PageStore for MarkdownPages<S> {
    fn info(&self) -> String {
        format!("Markdown pages in {}", self.store.info())
    }
    fn load(&self, key: &str) -> Result<Option<Page>, io::Error> {
        let path = page_path(key);
        if !self.store.exists(&path) {
            return Ok(None);
        }
        let text = self.store.read_string(&path)?;
        parse_page(&text)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", key, e)))
    }
    fn save(&self, key: &str, page: &Page) -> Result<(), io::Error> {
        let text = format_page(page).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.store.write(&page_path(key), text.as_bytes())
    }
    fn exists(&self, key: &str) -> bool {
        self.store.exists(&page_path(key))
    }
    fn delete(&self, key: &str) -> Result<(), io::Error> {
        self.store.delete(&page_path(key))
    }
    fn keys(&self, prefix: &str) -> Result<Vec<String>, io::Error> {
        Ok(self
            .store
            .list(prefix)?
            .into_iter()
            .filter(|path| path.ends_with(".md"))
            .map(|path| path.trim_end_matches(".md").to_string())
            .collect())
    }
}
