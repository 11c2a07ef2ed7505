//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
mod enum_serializer;
pub mod config;
pub mod dataset;
pub mod feature;
pub mod geom;
pub mod header;
pub mod issue;
pub mod matcher;
pub mod options;
pub mod reconcile;
pub mod tiles;
pub mod tour;

pub use self::config::{parse_config, read_config, ApplicationCfg, Config};
pub use self::enum_serializer::EnumString;
pub use self::issue::Issue;

#[cfg(test)]
mod feature_test;
#[cfg(test)]
mod matcher_test;
#[cfg(test)]
mod options_test;
#[cfg(test)]
mod reconcile_test;
