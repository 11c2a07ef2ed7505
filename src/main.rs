//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use clap::{App, ArgMatches, SubCommand};
use dotenv::dotenv;
use env_logger::Builder;
use log::Record;
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process;
use time;
use tour_core::core::config::DEFAULT_CONFIG;
use tour_core::core::dataset::DatasetHeader;
use tour_core::core::matcher::MatchKey;
use tour_core::core::reconcile::StandardOps;
use tour_core::core::tour::TourHeader;
use tour_core::core::{parse_config, read_config, ApplicationCfg, Config, EnumString};
use tour_core::store::PageStore;
use tour_service::{Repository, UpdateSession, UpdateSettings, UpdateType};

fn init_logger(args: &ArgMatches<'_>) {
    let mut builder = Builder::new();
    builder.format(|buf, record: &Record<'_>| {
        let t = time::now();
        writeln!(
            buf,
            "{}.{:03} {} {}",
            time::strftime("%Y-%m-%d %H:%M:%S", &t).unwrap_or_default(),
            t.tm_nsec / 1000_000,
            record.level(),
            record.args()
        )
    });

    let rust_log_env = env::var("RUST_LOG");
    let rust_log = match (args.value_of("loglevel"), rust_log_env.as_ref()) {
        (None, Ok(env_filter)) => env_filter.as_str(),
        (loglevel, _) => loglevel.unwrap_or("info"),
    };
    builder.parse_filters(rust_log);

    builder.init();
}

fn config_from_args(args: &ArgMatches<'_>) -> Result<ApplicationCfg, String> {
    if let Some(cfgpath) = args.value_of("config") {
        info!("Reading configuration from '{}'", cfgpath);
        read_config(cfgpath)
    } else {
        parse_config(DEFAULT_CONFIG.to_string(), "")
    }
}

fn repository_from_args(args: &ArgMatches<'_>) -> Result<Repository, String> {
    let config = config_from_args(args)?;
    let mut repo = Repository::from_config(&config)?;
    repo.load().map_err(|e| e.to_string())?;
    Ok(repo)
}

/// File name and content of a local file
fn read_file(path: &str) -> Result<(String, Vec<u8>), String> {
    let content = fs::read(path).map_err(|e| format!("Reading {} failed: {}", path, e))?;
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Invalid file name '{}'", path))?;
    Ok((name.to_string(), content))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn import(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let path = args.value_of("file").ok_or("Missing 'file' argument")?;
    let (name, content) = read_file(path)?;
    let id = repo
        .import_upload(&name, &content, args.value_of("name"))
        .map_err(|e| e.to_string())?;
    println!("{}", id);
    Ok(())
}

fn update_settings(repo: &Repository, args: &ArgMatches<'_>) -> Result<UpdateSettings, String> {
    let file = match args.value_of("file") {
        Some(path) => {
            let (name, content) = read_file(path)?;
            Some(
                repo.store_upload(&name, &content)
                    .map_err(|e| e.to_string())?,
            )
        }
        None => None,
    };
    let update_type = match args.value_of("type") {
        Some(t) => serde_json::from_value::<UpdateType>(serde_json::Value::String(t.to_lowercase()))
            .map_err(|_| format!("Unknown update type '{}'", t))?,
        None => UpdateType::default(),
    };
    let match_key = match args.value_of("match-key") {
        Some(key) => <MatchKey as EnumString<MatchKey>>::from_str(key)?,
        None => MatchKey::default(),
    };
    Ok(UpdateSettings {
        file,
        dataset: args.value_of("dataset").map(String::from),
        update_type,
        match_key,
        match_property: args.value_of("match-property").map(String::from),
        upload_property: args.value_of("upload-property").map(String::from),
        standard: StandardOps {
            add: args.is_present("add"),
            modify: args.is_present("modify"),
            remove: args.is_present("remove"),
        },
        confirm: args.is_present("confirm"),
    })
}

fn update(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let mut session = UpdateSession::load(&repo).map_err(|e| e.to_string())?;
    if args.is_present("cancel") {
        session.cancel(&repo).map_err(|e| e.to_string())?;
        info!("Update cancelled");
        return Ok(());
    }
    let settings = update_settings(&repo, args)?;
    let status = session
        .step(&mut repo, settings)
        .map_err(|e| e.to_string())?;
    print_json(&status)
}

fn save_dataset(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let id = args.value_of("id").ok_or("Missing 'id' argument")?;
    let key = repo.dataset_page(id);
    let page = repo
        .storage()
        .pages
        .load(&key)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Dataset page {} not found", key))?;
    let mut header: DatasetHeader = page.header_as()?;
    header.id = Some(id.to_string());
    let corrected = repo
        .save_dataset_page(&header)
        .map_err(|e| e.to_string())?;
    print_json(&corrected)
}

fn save_tour(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let id = args.value_of("id").ok_or("Missing 'id' argument")?;
    let key = repo.tour_page(id);
    let page = repo
        .storage()
        .pages
        .load(&key)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Tour page {} not found", key))?;
    let header: TourHeader = page.header_as()?;
    let corrected = repo.save_tour_page(&header).map_err(|e| e.to_string())?;
    print_json(&corrected)
}

fn render_tour(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let id = args.value_of("id").ok_or("Missing 'id' argument")?;
    let render = repo
        .render_tour(id)
        .ok_or_else(|| format!("Tour {} not found", id))?;
    print_json(&render)
}

fn delete_dataset(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let id = args.value_of("id").ok_or("Missing 'id' argument")?;
    repo.delete_dataset(id).map_err(|e| e.to_string())
}

fn delete_tour(args: &ArgMatches<'_>) -> Result<(), String> {
    let mut repo = repository_from_args(args)?;
    let id = args.value_of("id").ok_or("Missing 'id' argument")?;
    repo.delete_tour(id).map_err(|e| e.to_string())
}

fn gen_config(args: &ArgMatches<'_>) -> Result<(), String> {
    let config = if args.value_of("config").is_some() {
        repository_from_args(args)?.gen_runtime_config()
    } else {
        Repository::gen_config()
    };
    println!("{}", config);
    Ok(())
}

fn main() {
    dotenv().ok();
    // http://kbknapp.github.io/clap-rs/clap/
    let mut app = App::new("leaflet_tour")
        .version(crate_version!())
        .author("Pirmin Kalberer <pka@sourcepole.ch>")
        .about("authoring tool for interactive map tours")
        .subcommand(SubCommand::with_name("import")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --file=<FILE> 'GeoJSON or JavaScript upload'
                                              --name=[NAME] 'Dataset name (Default: name in upload)'")
                        .about("Create a new dataset from an uploaded file"))
        .subcommand(SubCommand::with_name("update")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --file=[FILE] 'GeoJSON or JavaScript upload'
                                              --dataset=[ID] 'Dataset to update'
                                              --type=[standard|replace|remove] 'Update type (Default: standard)'
                                              --match-key=[none|coordinates|property] 'Feature matching (Default: none)'
                                              --match-property=[NAME] 'Property of the existing features'
                                              --upload-property=[NAME] 'Property of the uploaded features'
                                              --add 'Add unmatched uploaded features'
                                              --modify 'Modify matched features'
                                              --remove 'Remove unmatched existing features'
                                              --confirm 'Commit the staged update'
                                              --cancel 'Discard the update session'")
                        .about("Process one step of a dataset update"))
        .subcommand(SubCommand::with_name("save-dataset")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --id=<ID> 'Dataset id'")
                        .about("Apply an edited dataset page"))
        .subcommand(SubCommand::with_name("save-tour")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --id=<ID> 'Tour id'")
                        .about("Apply an edited tour page"))
        .subcommand(SubCommand::with_name("tour")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --id=<ID> 'Tour id'")
                        .about("Print tour render data"))
        .subcommand(SubCommand::with_name("delete-dataset")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --id=<ID> 'Dataset id'")
                        .about("Delete a dataset and remove it from all tours"))
        .subcommand(SubCommand::with_name("delete-tour")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --id=<ID> 'Tour id'")
                        .about("Delete a tour"))
        .subcommand(SubCommand::with_name("genconfig")
                        .args_from_usage("-c, --config=[FILE] 'Include runtime information of this configuration'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'")
                        .about("Generate configuration template"));

    match app.get_matches_from_safe_borrow(env::args()) {
        //app.get_matches() prohibits later call of app.print_help()
        Result::Err(e) => {
            println!("{}", e);
        }
        Result::Ok(matches) => {
            let command: fn(&ArgMatches<'_>) -> Result<(), String> = match matches.subcommand_name()
            {
                Some("import") => import,
                Some("update") => update,
                Some("save-dataset") => save_dataset,
                Some("save-tour") => save_tour,
                Some("tour") => render_tour,
                Some("delete-dataset") => delete_dataset,
                Some("delete-tour") => delete_tour,
                Some("genconfig") => gen_config,
                _ => {
                    let _ = app.print_help();
                    println!("");
                    return;
                }
            };
            if let (_, Some(sub_m)) = matches.subcommand() {
                init_logger(sub_m);
                if let Err(e) = command(sub_m) {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
