use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use regression_maker::config::AppConfig;
use regression_maker::data::Dataset;
use regression_maker::model::{self, Arity, FittedModel, StoredModel};
use regression_maker::pipeline::{ActionError, ModelOrigin, Pipeline, run_to_trained};
use regression_maker::preprocess::{self, FillValue, PreprocessingChoice};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "regression-maker",
    version,
    about = "Build linear regression models from tabular data"
)]
pub struct Cli {
    /// Configuration file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a dataset and report its columns and missing values
    Inspect {
        /// Dataset file (CSV, spreadsheet or SQLite)
        file: PathBuf,
    },
    /// Load, preprocess, configure and train in one step
    Train {
        /// Dataset file (CSV, spreadsheet or SQLite)
        file: PathBuf,

        /// Column to predict
        #[arg(short, long)]
        target: String,

        /// Feature column. Repeat for multiple regression.
        #[arg(short, long = "feature", required = true)]
        features: Vec<String>,

        /// Defaults to simple for one feature and multiple otherwise
        #[arg(long, value_enum)]
        arity: Option<ArityArg>,

        /// How missing values are handled
        #[arg(long, value_enum, default_value_t = Strategy::Drop)]
        strategy: Strategy,

        /// Constant used by `--strategy constant`
        #[arg(long, required_if_eq("strategy", "constant"))]
        fill: Option<String>,

        /// Save the trained model to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Description stored with the model
        #[arg(short, long, requires = "output")]
        description: Option<String>,
    },
    /// Predict with a saved model
    Predict {
        /// Model file written by `train --output` or `save`
        model: PathBuf,

        /// Feature value as NAME=NUMBER. Repeat for every feature.
        #[arg(short = 'v', long = "value", value_parser = parse_assignment, required = true)]
        values: Vec<(String, f64)>,
    },
    /// Show what a saved model contains
    Describe {
        /// Model file
        model: PathBuf,
    },
    /// Interactive session driving the pipeline step by step
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArityArg {
    Simple,
    Multiple,
}

impl From<ArityArg> for Arity {
    fn from(value: ArityArg) -> Self {
        match value {
            ArityArg::Simple => Self::Simple,
            ArityArg::Multiple => Self::Multiple,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Drop,
    Mean,
    Median,
    Constant,
}

pub fn run_command(command: Commands, config: AppConfig) -> Result<()> {
    let mut out = std::io::stdout().lock();
    let mut pipeline = Pipeline::new(config);

    match command {
        Commands::Inspect { file } => {
            let dataset = pipeline.load_dataset(&file, None)?;
            write_dataset(&mut out, dataset)?;
        }
        Commands::Train {
            file,
            target,
            features,
            arity,
            strategy,
            fill,
            output,
            description,
        } => {
            let arity = arity.map_or_else(|| default_arity(&features), Arity::from);
            let choice = preprocessing_choice(strategy, fill.as_deref())?;
            let model = run_to_trained(&mut pipeline, &file, &choice, arity, &features, &target)?;
            write_model(&mut out, &model)?;

            if let Some(path) = output {
                pipeline.save_model(&path, description.as_deref())?;
                writeln!(out, "Model saved to {}", path.display())?;
            }
        }
        Commands::Predict { model, values } => {
            let stored = pipeline.load_model(&model)?;
            let inputs: HashMap<String, f64> = values.into_iter().collect();
            let prediction = pipeline.predict(&inputs)?;
            writeln!(out, "{} = {prediction:.4}", stored.model.spec().target())?;
        }
        Commands::Describe { model } => {
            let stored = model::load_model(&model)
                .with_context(|| format!("Failed to describe {}", model.display()))?;
            write_stored(&mut out, &stored)?;
        }
        Commands::Session => {
            let stdin = std::io::stdin().lock();
            run_session(&mut pipeline, stdin, &mut out)?;
        }
    }
    Ok(())
}

fn default_arity(features: &[String]) -> Arity {
    if features.len() == 1 {
        Arity::Simple
    } else {
        Arity::Multiple
    }
}

fn preprocessing_choice(strategy: Strategy, fill: Option<&str>) -> Result<PreprocessingChoice> {
    Ok(match strategy {
        Strategy::Drop => PreprocessingChoice::DropRows,
        Strategy::Mean => PreprocessingChoice::FillMean,
        Strategy::Median => PreprocessingChoice::FillMedian,
        Strategy::Constant => {
            let raw = fill.context("--strategy constant needs --fill VALUE")?;
            PreprocessingChoice::FillConstant(FillValue::Text(raw.to_owned()))
        }
    })
}

/// Parses `NAME=NUMBER`.
pub fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=NUMBER, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{name}' must be a finite number"));
    }
    Ok((name.to_owned(), value))
}

fn write_dataset<W: Write>(out: &mut W, dataset: &Dataset) -> Result<()> {
    writeln!(
        out,
        "{} ({} rows x {} columns)",
        dataset.source().display(),
        dataset.height(),
        dataset.width()
    )?;
    let report = preprocess::missing_report(dataset);
    for column in &report.columns {
        writeln!(
            out,
            "  {:<24} {:<12} {:>8} missing",
            column.name,
            column.kind.as_str(),
            column.missing
        )?;
    }
    write!(out, "{report}")?;
    if report.is_complete() {
        writeln!(out)?;
    }
    Ok(())
}

fn write_model<W: Write>(out: &mut W, model: &FittedModel) -> Result<()> {
    let metrics = model.metrics();
    writeln!(out, "Formula: {}", model.formula())?;
    match metrics.r2 {
        Some(r2) => writeln!(out, "R²: {r2:.4}")?,
        None => writeln!(out, "R²: undefined")?,
    }
    writeln!(out, "MSE: {:.4} ({} rows)", metrics.mse, metrics.rows)?;
    for line in model.interpretation() {
        writeln!(out, "  - {line}")?;
    }
    Ok(())
}

fn write_stored<W: Write>(out: &mut W, stored: &StoredModel) -> Result<()> {
    let model = &stored.model;
    writeln!(out, "Description: {}", stored.description)?;
    writeln!(out, "Saved at: {}", stored.saved_at.to_rfc3339())?;
    writeln!(out, "Model id: {}", model.id())?;
    writeln!(
        out,
        "{} regression of '{}' on {}",
        model.spec().arity(),
        model.spec().target(),
        model.spec().features().join(", ")
    )?;
    write_model(out, model)
}

/// One line of an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Load(PathBuf),
    Missing,
    Preprocess(PreprocessingChoice),
    Configure {
        arity: Arity,
        target: String,
        features: Vec<String>,
    },
    Train,
    Save {
        path: PathBuf,
        description: Option<String>,
    },
    LoadModel(PathBuf),
    Predict(HashMap<String, f64>),
    State,
    Help,
    Quit,
}

const SESSION_HELP: &str = "\
Commands:
  load <FILE>                                   load a CSV, spreadsheet or SQLite file
  missing                                       show missing values per column
  preprocess drop|mean|median|constant [VALUE]  handle missing values
  configure simple|multiple <TARGET> <FEATURE>...
                                                choose target and features
  train                                         fit the model
  save <FILE> [DESCRIPTION]                     save the trained model
  load-model <FILE>                             load a saved model for predictions
  predict NAME=NUMBER...                        predict with the active model
  state                                         show where the pipeline stands
  help                                          show this text
  quit                                          leave the session";

/// Parses a session line. Blank lines and `#` comments yield `None`.
pub fn parse_session_line(line: &str) -> Result<Option<SessionCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    if verb.starts_with('#') {
        return Ok(None);
    }
    let args: Vec<&str> = words.collect();

    let command = match verb.to_lowercase().as_str() {
        "load" => SessionCommand::Load(path_arg(&args, "load <FILE>")?),
        "missing" => SessionCommand::Missing,
        "preprocess" => SessionCommand::Preprocess(parse_choice(&args)?),
        "configure" => parse_configure(&args)?,
        "train" => SessionCommand::Train,
        "save" => {
            let (path, description) = args
                .split_first()
                .ok_or_else(|| "usage: save <FILE> [DESCRIPTION]".to_owned())?;
            SessionCommand::Save {
                path: PathBuf::from(path),
                description: (!description.is_empty()).then(|| description.join(" ")),
            }
        }
        "load-model" => SessionCommand::LoadModel(path_arg(&args, "load-model <FILE>")?),
        "predict" => {
            if args.is_empty() {
                return Err("usage: predict NAME=NUMBER...".to_owned());
            }
            SessionCommand::Predict(
                args.iter()
                    .map(|a| parse_assignment(a))
                    .collect::<Result<_, _>>()?,
            )
        }
        "state" => SessionCommand::State,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}

fn path_arg(args: &[&str], usage: &str) -> Result<PathBuf, String> {
    if args.is_empty() {
        return Err(format!("usage: {usage}"));
    }
    Ok(PathBuf::from(args.join(" ")))
}

fn parse_choice(args: &[&str]) -> Result<PreprocessingChoice, String> {
    let usage = || "usage: preprocess drop|mean|median|constant [VALUE]".to_owned();
    let (strategy, rest) = args.split_first().ok_or_else(usage)?;
    match (strategy.to_lowercase().as_str(), rest) {
        ("drop", []) => Ok(PreprocessingChoice::DropRows),
        ("mean", []) => Ok(PreprocessingChoice::FillMean),
        ("median", []) => Ok(PreprocessingChoice::FillMedian),
        ("constant", value) if !value.is_empty() => Ok(PreprocessingChoice::FillConstant(
            FillValue::Text(value.join(" ")),
        )),
        _ => Err(usage()),
    }
}

fn parse_configure(args: &[&str]) -> Result<SessionCommand, String> {
    let usage = || "usage: configure simple|multiple <TARGET> <FEATURE>...".to_owned();
    let [arity, target, features @ ..] = args else {
        return Err(usage());
    };
    let arity = Arity::parse_arity(arity).ok_or_else(usage)?;
    Ok(SessionCommand::Configure {
        arity,
        target: (*target).to_owned(),
        features: features.iter().map(|f| (*f).to_owned()).collect(),
    })
}

/// Reads commands from `input` until `quit` or end of input.
///
/// Failed actions are reported on `out` and the session carries on.
pub fn run_session<R: BufRead, W: Write>(pipeline: &mut Pipeline, input: R, out: &mut W) -> Result<()> {
    writeln!(out, "Regression Maker session. Type 'help' for commands.")?;
    let mut lines = input.lines();
    loop {
        write!(out, "[{}]> ", pipeline.state())?;
        out.flush()?;
        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line.context("Failed to read session input")?;

        match parse_session_line(&line) {
            Ok(None) => {}
            Ok(Some(SessionCommand::Quit)) => break,
            Ok(Some(command)) => execute(pipeline, command, out)?,
            Err(message) => writeln!(out, "error: {message}")?,
        }
    }
    Ok(())
}

fn execute<W: Write>(pipeline: &mut Pipeline, command: SessionCommand, out: &mut W) -> Result<()> {
    let outcome: Result<(), ActionError> = match command {
        SessionCommand::Load(path) => match pipeline.load_dataset(&path, None) {
            Ok(dataset) => return write_dataset(out, dataset),
            Err(e) => Err(e),
        },
        SessionCommand::Missing => {
            match pipeline.missing_report() {
                Some(report) => write!(out, "{report}")?,
                None => write!(out, "No dataset loaded.")?,
            }
            writeln!(out)?;
            Ok(())
        }
        SessionCommand::Preprocess(choice) => match pipeline.preprocess(&choice) {
            Ok(left) => {
                writeln!(
                    out,
                    "Applied '{choice}': {} rows, {} missing values left",
                    left.rows,
                    left.total()
                )?;
                Ok(())
            }
            Err(e) => Err(e),
        },
        SessionCommand::Configure {
            arity,
            target,
            features,
        } => match pipeline.configure(arity, &features, &target) {
            Ok(spec) => {
                writeln!(
                    out,
                    "{} regression of '{}' on {}",
                    spec.arity(),
                    spec.target(),
                    spec.features().join(", ")
                )?;
                Ok(())
            }
            Err(e) => Err(e),
        },
        SessionCommand::Train => match pipeline.train() {
            Ok(model) => return write_model(out, &model),
            Err(e) => Err(e),
        },
        SessionCommand::Save { path, description } => {
            match pipeline.save_model(&path, description.as_deref()) {
                Ok(()) => {
                    writeln!(out, "Model saved to {}", path.display())?;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        SessionCommand::LoadModel(path) => match pipeline.load_model(&path) {
            Ok(stored) => return write_stored(out, &stored),
            Err(e) => Err(e),
        },
        SessionCommand::Predict(inputs) => match pipeline.predict(&inputs) {
            Ok(value) => {
                let target = pipeline
                    .active_model()
                    .map_or("prediction", |(model, _)| model.spec().target());
                writeln!(out, "{target} = {value:.4}")?;
                Ok(())
            }
            Err(e) => Err(e),
        },
        SessionCommand::State => {
            writeln!(out, "State: {}", pipeline.state())?;
            match pipeline.active_model() {
                Some((model, ModelOrigin::Trained)) => {
                    writeln!(out, "Active model: {} (trained)", model.formula())?;
                }
                Some((model, ModelOrigin::File { path, .. })) => writeln!(
                    out,
                    "Active model: {} (from {})",
                    model.formula(),
                    path.display()
                )?,
                None => writeln!(out, "Active model: none")?,
            }
            Ok(())
        }
        SessionCommand::Help => {
            writeln!(out, "{SESSION_HELP}")?;
            Ok(())
        }
        SessionCommand::Quit => Ok(()),
    };

    if let Err(e) = outcome {
        writeln!(out, "error: {e}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "tests panic on unexpected errors")]

    use super::*;
    use clap::CommandFactory as _;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_arguments() {
        let cli = Cli::try_parse_from([
            "regression-maker",
            "train",
            "houses.csv",
            "--target",
            "price",
            "-f",
            "size",
            "-f",
            "rooms",
            "--strategy",
            "constant",
            "--fill",
            "0",
        ])
        .unwrap();
        let Commands::Train {
            features,
            strategy,
            fill,
            arity,
            ..
        } = cli.command
        else {
            panic!("expected train");
        };
        assert_eq!(features, ["size", "rooms"]);
        assert_eq!(strategy, Strategy::Constant);
        assert_eq!(arity, None);
        assert_eq!(default_arity(&features), Arity::Multiple);
        assert_eq!(
            preprocessing_choice(strategy, fill.as_deref()).unwrap(),
            PreprocessingChoice::FillConstant(FillValue::Text("0".to_owned()))
        );

        // --strategy constant without --fill
        assert!(
            Cli::try_parse_from([
                "regression-maker",
                "train",
                "houses.csv",
                "-t",
                "price",
                "-f",
                "size",
                "--strategy",
                "constant",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_constant_fill_covers_mixed_table() -> Result<()> {
        let data = PathBuf::from("testdata/missing_values.csv");
        let choice = preprocessing_choice(Strategy::Constant, Some("0"))?;
        let mut pipeline = Pipeline::default();
        let features = ["size".to_owned(), "rooms".to_owned()];
        run_to_trained(&mut pipeline, &data, &choice, Arity::Multiple, &features, "price")?;
        let report = preprocess::missing_report(pipeline.dataset().unwrap());
        assert!(report.is_complete());
        assert_eq!(report.rows, 8);

        let script = format!("load {}\npreprocess constant 0\n", data.display());
        let mut out = Vec::new();
        run_session(&mut Pipeline::default(), Cursor::new(script), &mut out)?;
        let text = String::from_utf8(out)?;
        assert!(text.contains("8 rows, 0 missing values left"), "{text}");
        assert!(!text.contains("error:"), "{text}");
        Ok(())
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("size=80.5").unwrap(), ("size".to_owned(), 80.5));
        assert_eq!(parse_assignment(" rooms = -3 ").unwrap(), ("rooms".to_owned(), -3.0));
        assert!(parse_assignment("size").is_err());
        assert!(parse_assignment("=4").is_err());
        assert!(parse_assignment("size=big").is_err());
        assert!(parse_assignment("size=inf").is_err());
    }

    #[test]
    fn test_parse_session_lines() {
        assert_eq!(parse_session_line("   ").unwrap(), None);
        assert_eq!(parse_session_line("# comment").unwrap(), None);
        assert_eq!(
            parse_session_line("load my data.csv").unwrap(),
            Some(SessionCommand::Load(PathBuf::from("my data.csv")))
        );
        assert_eq!(
            parse_session_line("preprocess constant unknown").unwrap(),
            Some(SessionCommand::Preprocess(PreprocessingChoice::FillConstant(
                FillValue::Text("unknown".to_owned())
            )))
        );
        assert_eq!(
            parse_session_line("configure multiple price size rooms").unwrap(),
            Some(SessionCommand::Configure {
                arity: Arity::Multiple,
                target: "price".to_owned(),
                features: vec!["size".to_owned(), "rooms".to_owned()],
            })
        );
        assert_eq!(
            parse_session_line("save out.json House prices").unwrap(),
            Some(SessionCommand::Save {
                path: PathBuf::from("out.json"),
                description: Some("House prices".to_owned()),
            })
        );
        assert_eq!(
            parse_session_line("predict size=2 rooms=3").unwrap(),
            Some(SessionCommand::Predict(HashMap::from([
                ("size".to_owned(), 2.0),
                ("rooms".to_owned(), 3.0),
            ])))
        );

        assert!(parse_session_line("preprocess constant").is_err());
        assert!(parse_session_line("preprocess drop now").is_err());
        assert!(parse_session_line("configure triple y x").is_err());
        assert!(parse_session_line("configure simple").is_err());
        assert!(parse_session_line("predict").is_err());
        assert!(parse_session_line("fly").is_err());
    }

    #[test]
    fn test_scripted_session() -> Result<()> {
        let dir = tempdir()?;
        let data = dir.path().join("linear.csv");
        std::fs::write(&data, "x,y\n1,2\n2,4\n3,6\n4,8\n")?;
        let model_path = dir.path().join("linear.json");

        let script = format!(
            "load {}\ntrain\npreprocess drop\nconfigure simple y x\ntrain\n\
             predict x=10\nsave {} doubling\nstate\nquit\nload never-read.csv\n",
            data.display(),
            model_path.display()
        );
        let mut out = Vec::new();
        let mut pipeline = Pipeline::default();
        run_session(&mut pipeline, Cursor::new(script), &mut out)?;
        let text = String::from_utf8(out)?;

        assert!(
            text.contains("error: train failed: Cannot train while the pipeline is dataset loaded"),
            "{text}"
        );
        assert!(text.contains("(2.00) * x"), "{text}");
        assert!(text.contains("y = 20.0000"), "{text}");
        assert!(text.contains("State: trained"), "{text}");
        assert!(model_path.is_file());
        assert_eq!(model::load_model(&model_path)?.description, "doubling");
        assert_eq!(pipeline.state(), regression_maker::pipeline::PipelineState::Trained);
        Ok(())
    }

    #[test]
    fn test_session_predict_with_loaded_model() -> Result<()> {
        let dir = tempdir()?;
        let data = dir.path().join("linear.csv");
        std::fs::write(&data, "x,y\n1,3\n2,5\n3,7\n")?;
        let model_path = dir.path().join("model.json");

        let mut trainer = Pipeline::default();
        let choice = PreprocessingChoice::DropRows;
        run_to_trained(&mut trainer, &data, &choice, Arity::Simple, &["x".to_owned()], "y")?;
        trainer.save_model(&model_path, None)?;

        let script = format!("load-model {}\npredict x=5\npredict z=1\n", model_path.display());
        let mut out = Vec::new();
        run_session(&mut Pipeline::default(), Cursor::new(script), &mut out)?;
        let text = String::from_utf8(out)?;

        assert!(text.contains("Description: No description provided."), "{text}");
        assert!(text.contains("y = 11.0000"), "{text}");
        assert!(
            text.contains("error: predict failed: Missing value for feature(s): x"),
            "{text}"
        );
        Ok(())
    }
}
