//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::{TileServerCfg, TilesCfg};
use crate::core::{ApplicationCfg, Config};

/// Basemap tile server as passed to the map
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TileServer {
    #[serde(skip)]
    pub key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub server_type: Option<String>,
    pub select: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub attribution: String,
}

const OSM_ODBL: &str = "Data by <a href=\"http://openstreetmap.org\">OpenStreetMap</a>, under <a href=\"http://www.openstreetmap.org/copyright\">ODbL</a>.";

fn stamen(key: &str, select: &str, name: &str, data_license: &str) -> TileServer {
    TileServer {
        key: key.to_string(),
        server_type: Some("stamen".to_string()),
        select: select.to_string(),
        name: Some(name.to_string()),
        url: None,
        attribution: format!(
            "Map tiles by <a href=\"http://stamen.com\">Stamen Design</a>, under <a href=\"http://creativecommons.org/licenses/by/3.0\">CC BY 3.0</a>. {}",
            data_license
        ),
    }
}

/// Available tile servers, the default one first
#[derive(Clone, Debug, PartialEq)]
pub struct TileServers {
    servers: Vec<TileServer>,
}

impl Default for TileServers {
    fn default() -> Self {
        TileServers {
            servers: vec![
                stamen(
                    "stamenWatercolor",
                    "Stamen Watercolor",
                    "watercolor",
                    "Data by <a href=\"http://openstreetmap.org\">OpenStreetMap</a>, under <a href=\"http://creativecommons.org/licenses/by-sa/3.0\">CC BY SA</a>.",
                ),
                stamen("stamenToner", "Stamen Toner", "toner", OSM_ODBL),
                stamen("stamenTerrain", "Stamen Terrain", "terrain", OSM_ODBL),
            ],
        }
    }
}

impl TileServers {
    pub fn servers(&self) -> &[TileServer] {
        &self.servers
    }
    pub fn get(&self, key: &str) -> Option<&TileServer> {
        self.servers.iter().find(|s| s.key == key)
    }
    pub fn default_server(&self) -> &TileServer {
        &self.servers[0]
    }
    /// Server chosen by key, the default one for no or an unknown key
    pub fn select(&self, key: Option<&str>) -> &TileServer {
        match key {
            Some(key) => self.get(key).unwrap_or_else(|| {
                debug!("Unknown tile server '{}', using default", key);
                self.default_server()
            }),
            None => self.default_server(),
        }
    }
    fn insert(&mut self, server: TileServer) {
        match self.servers.iter().position(|s| s.key == server.key) {
            Some(pos) => self.servers[pos] = server,
            None => self.servers.push(server),
        }
    }
}

impl From<TileServerCfg> for TileServer {
    fn from(cfg: TileServerCfg) -> TileServer {
        let key = &cfg.key;
        TileServer {
            select: cfg.select.unwrap_or_else(|| key.clone()),
            key: cfg.key,
            server_type: cfg.server_type,
            name: cfg.name,
            url: cfg.url,
            attribution: cfg.attribution,
        }
    }
}

impl<'a> Config<'a, ApplicationCfg> for TileServers {
    fn from_config(config: &ApplicationCfg) -> Result<Self, String> {
        let mut tiles = TileServers::default();
        let TilesCfg { default, servers } = match &config.tiles {
            Some(cfg) => cfg.clone(),
            None => return Ok(tiles),
        };
        for cfg in servers {
            if cfg.url.is_none() && cfg.name.is_none() {
                return Err(format!(
                    "Tile server '{}' needs an url or a layer name",
                    cfg.key
                ));
            }
            tiles.insert(cfg.into());
        }
        if let Some(key) = default {
            let pos = tiles
                .servers
                .iter()
                .position(|s| s.key == key)
                .ok_or_else(|| format!("Unknown default tile server '{}'", key))?;
            let server = tiles.servers.remove(pos);
            tiles.servers.insert(0, server);
        }
        Ok(tiles)
    }
    fn gen_config() -> String {
        let toml = r#"
#[tiles]
# Tile server of tours without their own choice
# (built-in: stamenWatercolor, stamenToner, stamenTerrain)
#default = "stamenWatercolor"
#[[tiles.servers]]
#key = "osm"
#select = "OpenStreetMap"
#url = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"
#attribution = "&copy; OpenStreetMap contributors"
"#;
        toml.to_string()
    }
}
