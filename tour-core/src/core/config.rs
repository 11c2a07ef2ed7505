//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use regex::Regex;
use serde::Deserialize;
use std;
use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::prelude::*;
use tera::{Context, Tera};
use toml::Value;

pub trait Config<'a, C: Deserialize<'a>>
where
    Self: std::marker::Sized,
{
    /// Read configuration
    fn from_config(config: &C) -> Result<Self, String>;
    /// Generate configuration template
    fn gen_config() -> String;
    /// Generate configuration template with runtime information
    fn gen_runtime_config(&self) -> String {
        Self::gen_config()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationCfg {
    pub store: StoreCfg,
    pub markers: Option<MarkerCfg>,
    pub tiles: Option<TilesCfg>,
    pub update: Option<UpdateCfg>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreCfg {
    /// Storage backend: `dir` (default) or `memory`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Base directory of dataset and tour pages
    pub pages: String,
    /// Base directory of dataset files, uploads and update staging files
    pub data: String,
}

pub fn default_backend() -> String {
    "dir".to_string()
}

/// Built-in marker and custom icon defaults
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MarkerCfg {
    /// Route prefix of uploaded marker images
    pub image_route: Option<String>,
    pub icon_url: Option<String>,
    pub icon_retina_url: Option<String>,
    pub shadow_url: Option<String>,
    pub icon_size: Option<[i32; 2]>,
    pub icon_anchor: Option<[i32; 2]>,
    pub tooltip_anchor: Option<[i32; 2]>,
    pub shadow_size: Option<[i32; 2]>,
    /// Size of custom marker images without explicit width/height
    pub custom_icon_size: Option<[i32; 2]>,
    pub custom_tooltip_anchor: Option<[i32; 2]>,
}

/// Basemap tile servers
#[derive(Deserialize, Clone, Debug, Default)]
pub struct TilesCfg {
    /// Key of the server used by tours without their own choice
    pub default: Option<String>,
    /// Servers added to the built-in ones. A server with a built-in key replaces it.
    #[serde(default)]
    pub servers: Vec<TileServerCfg>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TileServerCfg {
    pub key: String,
    /// Provider type, e.g. `stamen` for named Stamen layers
    #[serde(rename = "type")]
    pub server_type: Option<String>,
    /// Label in tour selection lists
    pub select: Option<String>,
    /// Layer name of a provider type
    pub name: Option<String>,
    /// URL template with `{z}`, `{x}` and `{y}`
    pub url: Option<String>,
    pub attribution: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpdateCfg {
    /// Page key of the update session document
    pub page: Option<String>,
}

pub const DEFAULT_CONFIG: &'static str = r#"
[store]
backend = "dir"
pages = "user/pages"
data = "user/data/leaflet-tour"
"#;

/// Load and parse the config file into an config struct.
pub fn read_config<'a, T: Deserialize<'a>>(path: &str) -> Result<T, String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => {
            return Err("Could not find config file!".to_string());
        }
    };
    let mut config_toml = String::new();
    if let Err(err) = file.read_to_string(&mut config_toml) {
        return Err(format!("Error while reading config: [{}]", err));
    };

    parse_config(config_toml, path)
}

/// Parse the configuration into an config struct.
pub fn parse_config<'a, T: Deserialize<'a>>(config_toml: String, path: &str) -> Result<T, String> {
    // Check for old ${var} expressions
    let re = Regex::new(r"\$\{([[:alnum:]]+)\}").map_err(|e| e.to_string())?;
    if re.is_match(&config_toml) {
        return Err(
            "Replace old environment variable syntax ${VARNAME} with `{{env.VARNAME}}`".to_string(),
        );
    }

    // Parse template
    let mut tera = Tera::default();
    tera.add_raw_template(path, &config_toml)
        .map_err(|e| format!("Template error: {}", e))?;
    let mut context = Context::new();
    let mut env = HashMap::new();
    for (key, value) in env::vars() {
        env.insert(key, value);
    }
    context.insert("env", &env);
    let toml = tera.render(path, &context).map_err(|e| match e.source() {
        Some(source) => format!("Template error: {}", source),
        None => format!("Template error: {}", e),
    })?;

    toml.parse::<Value>()
        .and_then(|cfg| cfg.try_into::<T>())
        .map_err(|err| format!("{} - {}", path, err))
}
