//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[cfg(test)]
#[macro_use]
extern crate serde_json;

pub mod repository;
pub mod session;
pub mod upload;

#[cfg(test)]
mod session_test;

pub use repository::{Repository, RepositoryError};
pub use session::{SessionState, UpdateSession, UpdateSettings, UpdateStatus, UpdateType};
