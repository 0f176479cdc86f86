use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::sync::Arc;
use std::{env, fs, path};

use depotr::audit::{AuditLog, FileAudit, NoopAudit};
use depotr::config::Config;
use depotr::logging;
use depotr::source::RestSource;
use depotr::store::LocalStore;

///////////////////////
// Utility functions //
///////////////////////

fn init_state_dir() -> Result<path::PathBuf, Box<dyn Error>> {
	match env::var("HOME") {
		Ok(home) => {
			let state_dir = path::PathBuf::from(home).join(".depotr");

			match fs::metadata(&state_dir) {
				Ok(meta) => {
					if meta.is_dir() {
						Ok(state_dir)
					} else {
						Err(format!("{} exists, but it is not a directory!", state_dir.display())
							.into())
					}
				}
				Err(_err) => {
					// Not exists
					fs::create_dir(&state_dir)
						.map_err(|err| format!("Cannot create directory: {}", err))?;
					Ok(state_dir)
				}
			}
		}
		Err(_e) => Err("Could not determine HOME directory!".into()),
	}
}

fn apply_flags(config: &mut Config, matches: &clap::ArgMatches) {
	if matches.get_flag("verbose") {
		config.verbose = true;
	}
	if matches.get_flag("force") {
		config.force = true;
	}
	if matches.get_flag("no-audit") {
		config.skip_audit = true;
	}
	if let Some(bucket) = matches.get_one::<String>("bucket") {
		config.bucket = bucket.clone();
	}
	if let Some(endpoint) = matches.get_one::<String>("endpoint") {
		config.endpoint = endpoint.clone();
	}
	if let Some(dc) = matches.get_one::<String>("data-center") {
		config.data_center = Some(dc.clone());
	}
	if let Some(id) = matches.get_one::<String>("id") {
		config.client_id = id.clone();
	}
	if let Some(secret) = matches.get_one::<String>("secret") {
		config.client_secret = secret.clone();
	}
	if let Some(parallel) = matches.get_one::<String>("parallel") {
		if let Ok(parallel) = parallel.parse() {
			config.parallelism = parallel;
		}
	}
	if let Some(exclude) = matches.get_one::<String>("exclude") {
		config.exclude = exclude.clone();
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("Depotr")
		.version("0.2.0")
		.about("Performs iterative backups of a hosted document repository to an object depot")
		.subcommand_required(true)
		.subcommand(
			Command::new("backup")
				.about("Mirror the source tree into the backup depot")
				.arg(
					Arg::new("verbose")
						.short('v')
						.long("verbose")
						.action(ArgAction::SetTrue)
						.help("Enables verbose logging of events and operations"),
				)
				.arg(
					Arg::new("data-center")
						.short('d')
						.long("data-center")
						.value_name("DC")
						.help("The source data center for the account to use"),
				)
				.arg(
					Arg::new("endpoint")
						.short('e')
						.long("endpoint")
						.value_name("URL")
						.help("Base URL of the source system API"),
				)
				.arg(
					Arg::new("id")
						.short('i')
						.long("id")
						.value_name("ID")
						.help("The client ID of the API user to authenticate with"),
				)
				.arg(
					Arg::new("secret")
						.short('s')
						.long("secret")
						.value_name("SECRET")
						.help("The client secret of the API user to authenticate with"),
				)
				.arg(
					Arg::new("bucket")
						.short('b')
						.long("bucket")
						.value_name("BUCKET")
						.help("The backup depot to mirror into"),
				)
				.arg(
					Arg::new("parallel")
						.short('p')
						.long("parallel")
						.value_name("N")
						.help("Worker-pool size per queue"),
				)
				.arg(
					Arg::new("force")
						.short('f')
						.long("force")
						.action(ArgAction::SetTrue)
						.help("Re-transfer every node regardless of stored timestamps"),
				)
				.arg(
					Arg::new("no-audit")
						.long("no-audit")
						.action(ArgAction::SetTrue)
						.help("Do not record the run in the audit log"),
				)
				.arg(
					Arg::new("exclude")
						.long("exclude")
						.value_name("SUBTREE")
						.help("Subtree to leave out of the mirror (name or path)"),
				),
		)
		.subcommand(
			Command::new("restore")
				.about("Restore documents from a backup depot")
				.arg(Arg::new("bucket").short('b').long("bucket").value_name("BUCKET")),
		)
		.get_matches();

	if let Some(matches) = matches.subcommand_matches("backup") {
		let state_dir = init_state_dir()?;
		let mut config = Config::load_or_default(&state_dir.join("config.toml"))?;
		config.state_dir = state_dir.clone();
		apply_flags(&mut config, matches);

		logging::init_tracing(config.verbose);

		let source = Arc::new(RestSource::new(&config.endpoint, config.data_center.clone()));
		let store = Arc::new(LocalStore::new(&config.bucket));
		let audit: Arc<dyn AuditLog> = if config.skip_audit {
			Arc::new(NoopAudit)
		} else {
			Arc::new(FileAudit::new(state_dir.join("audit.log")))
		};

		match depotr::backup::run(source, store, audit, config).await {
			Ok(summary) => {
				println!(
					"{} folders and {} documents transferred, {} orphans removed",
					summary.folders_transferred,
					summary.documents_transferred,
					summary.orphans_removed
				);
			}
			Err(err) => {
				logging::error!("{}", err);
				std::process::exit(1);
			}
		}
	} else if matches.subcommand_matches("restore").is_some() {
		eprintln!("Restore not supported yet");
		std::process::exit(1);
	}

	Ok(())
}

// vim: ts=4
