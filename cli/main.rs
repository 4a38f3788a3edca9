//! This module contains the main entrypoint to the triage cli.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod serve;
mod train;

#[derive(Parser)]
#[command(
	about = "Train gradient boosted trees to predict diagnoses from clinical vignettes.",
	disable_help_subcommand = true
)]
enum Options {
	#[command(name = "train")]
	Train(Box<TrainArgs>),
	#[command(name = "serve")]
	Serve(Box<ServeArgs>),
}

#[derive(clap::Args, Debug)]
#[command(about = "train a model and predict a test set")]
#[command(
	long_about = "train a model on a csv file, report its accuracy on a held out validation set, and write predictions for a test csv file"
)]
pub struct TrainArgs {
	#[arg(long, help = "the path to the .csv file used for training")]
	pub train: PathBuf,
	#[arg(
		long,
		help = "the path to a .csv file whose rows replace training rows with the same id"
	)]
	pub train_extra: Option<PathBuf>,
	#[arg(long, help = "the path to the .csv file to predict")]
	pub test: Option<PathBuf>,
	#[arg(
		long,
		requires = "test",
		help = "the path to a .csv file whose rows replace test rows with the same id"
	)]
	pub test_extra: Option<PathBuf>,
	#[arg(
		short,
		long,
		default_value = "predictions.csv",
		help = "the path to write the predictions to"
	)]
	pub output: PathBuf,
	#[arg(short, long, help = "the path to a .json config file")]
	pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
#[command(about = "train a model and serve predictions over http")]
pub struct ServeArgs {
	#[arg(long, help = "the path to the .csv file used for training")]
	pub train: PathBuf,
	#[arg(
		long,
		help = "the path to a .csv file whose rows replace training rows with the same id"
	)]
	pub train_extra: Option<PathBuf>,
	#[arg(long, default_value = "0.0.0.0")]
	pub host: std::net::IpAddr,
	#[arg(long, env = "PORT", default_value = "8080")]
	pub port: u16,
	#[arg(short, long, help = "the path to a .json config file")]
	pub config: Option<PathBuf>,
}

fn main() {
	let options = Options::parse();
	init_logging();
	let result = match options {
		Options::Train(args) => train::train(*args),
		Options::Serve(args) => serve::serve(*args),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

/// Log to stderr at the info level unless `RUST_LOG` says otherwise.
fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[test]
fn test_parse_options() {
	let options = Options::try_parse_from([
		"triage",
		"train",
		"--train",
		"data/train.csv",
		"--train-extra",
		"data/train_raw.csv",
		"--test",
		"data/test.csv",
	])
	.unwrap();
	match options {
		Options::Train(args) => {
			assert_eq!(args.train, PathBuf::from("data/train.csv"));
			assert_eq!(args.train_extra, Some(PathBuf::from("data/train_raw.csv")));
			assert_eq!(args.test_extra, None);
			assert_eq!(args.output, PathBuf::from("predictions.csv"));
		}
		Options::Serve(_) => panic!("expected the train command"),
	}
	assert!(Options::try_parse_from(["triage", "train"]).is_err());
	assert!(Options::try_parse_from([
		"triage",
		"train",
		"--train",
		"a.csv",
		"--test-extra",
		"b.csv"
	])
	.is_err());
}
