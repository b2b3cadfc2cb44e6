// fixatdl/atdl_tool.rs
// Use it like this:
// atdl_tool --dir ./algos list
// atdl_tool --dir ./algos validate TWAP --set maxParticipation=150

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;
use fixatdl::{
  AtdlConfig,
  FixTagValueEncoder,
  StrategyForm,
  StrategyRepository,
  strategy_form::Widget,
};

/// Inspect FIX ATDL strategy documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// JSON config file. Flags below override its values.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Directory holding strategy documents.
  #[arg(long)]
  dir: Option<PathBuf>,

  /// Glob pattern for strategy documents inside the directory.
  #[arg(long)]
  pattern: Option<String>,

  #[clap(subcommand)]
  command: Command,
}

#[derive(Parser, Debug)]
enum Command {
  /// List the strategy names found in the documents.
  List,
  /// Print the model of a strategy as JSON.
  Dump(StrategyArgs),
  /// Describe the form controls of a strategy.
  Describe(StrategyArgs),
  /// Validate parameter values against a strategy's rules.
  Validate(FormArgs),
  /// Encode parameter values as FIX tag=value fields.
  Encode(EncodeArgs),
}

#[derive(Parser, Debug)]
struct StrategyArgs {
  /// Strategy name.
  #[arg()]
  strategy: String,
}

#[derive(Parser, Debug)]
struct FormArgs {
  /// Strategy name.
  #[arg()]
  strategy: String,

  /// Parameter value as name=value. Repeatable.
  #[arg(long = "set", value_parser = parse_assignment)]
  values: Vec<(String, String)>,

  /// Apply control initial values before the --set values.
  #[arg(long)]
  with_defaults: bool,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
  #[clap(flatten)]
  form: FormArgs,

  /// Field delimiter; defaults to the config value (SOH).
  #[arg(long)]
  delimiter: Option<String>,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.trim().to_string(), v.to_string()))
    .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

fn load_config(args: &Args) -> Result<AtdlConfig> {
  let mut config = match &args.config {
    Some(path) => AtdlConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
    None => AtdlConfig::default(),
  };
  if let Some(dir) = &args.dir {
    config.strategy_dir = dir.clone();
  }
  if let Some(pattern) = &args.pattern {
    config.file_pattern = pattern.clone();
  }
  config.validate()?;
  Ok(config)
}

fn build_form(repo: &StrategyRepository, args: &FormArgs) -> Result<StrategyForm> {
  let mut form = repo.form(&args.strategy)
    .with_context(|| format!("loading strategy '{}'", args.strategy))?;
  if args.with_defaults {
    form.reset();
  }
  for (name, value) in &args.values {
    if form.model().parameter(name).is_none() {
      return Err(anyhow!("Strategy '{}' has no parameter '{}'", args.strategy, name));
    }
    form.set_value(name, value.as_str());
  }
  Ok(form)
}

fn describe_widget(widget: &Widget) -> String {
  match widget {
    Widget::Toggle => "toggle".to_string(),
    Widget::SingleSelect { options } => {
      let labels: Vec<String> = options.iter().map(|o| format!("{}={}", o.label, o.value)).collect();
      format!("select [{}]", labels.join(", "))
    }
    Widget::TimePicker => "time".to_string(),
    Widget::IntegerStepper { min, step } => format!("stepper (min {}, step {})", min, step),
    Widget::FreeText { max_length } => format!("text (max {})", max_length),
  }
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
  let args = Args::parse();
  let config = load_config(&args)?;
  debug!("Using config {:?}", config);

  let repo = StrategyRepository::from_config(&config)?;
  if repo.is_empty() {
    info!("No strategy documents matched {}", config.document_glob());
  }

  match &args.command {
    Command::List => {
      for name in repo.strategy_names() {
        println!("{}", name);
      }
    }
    Command::Dump(a) => {
      let model = repo.model(&a.strategy)?;
      println!("{}", serde_json::to_string_pretty(model.as_ref())?);
    }
    Command::Describe(a) => {
      let form = repo.form(&a.strategy)?;
      for d in form.describe_controls() {
        let parameter = d.parameter.map_or("<unbound>", |p| p.name.as_str());
        let marker = if d.required { "*" } else { "" };
        println!("{}{}\t{}\t{}\t{}", d.control.id, marker, d.control.label, parameter, describe_widget(&d.widget));
      }
    }
    Command::Validate(a) => {
      let form = build_form(&repo, a)?;
      let errors = form.validate();
      if errors.is_empty() {
        println!("OK");
      } else {
        for e in &errors {
          println!("{}", e);
        }
        return Err(anyhow!("{} validation failure(s)", errors.len()));
      }
    }
    Command::Encode(a) => {
      let form = build_form(&repo, &a.form)?;
      let encoder = match &a.delimiter {
        Some(d) => FixTagValueEncoder::new(d),
        None => FixTagValueEncoder::from_config(&config),
      };
      println!("{}", encoder.encode_form(&form)?);
    }
  }
  Ok(())
}
