use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lexo",
    about = "Lexo object cache: inspect fixtures, materialize objects, evaluate virtual properties",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the classes, fields, objects and virtual properties of a fixture
    Inspect(InspectArgs),
    /// Materialize objects through the batch loader
    Materialize(MaterializeArgs),
    /// Compute a virtual property for one object
    Virtual(VirtualArgs),
    /// Resolve dependency paths against a fixture's catalog
    Deps(DepsArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    /// Fixture file (TOML)
    pub fixture: PathBuf,
}

#[derive(Args)]
pub struct MaterializeArgs {
    pub fixture: PathBuf,
    /// Fixture keys of the objects to load
    #[arg(required = true)]
    pub keys: Vec<i64>,
}

#[derive(Args)]
pub struct VirtualArgs {
    pub fixture: PathBuf,
    pub class: String,
    pub field: String,
    /// Fixture key of the object
    pub key: i64,
    /// Read inside a bulk-load session
    #[arg(long)]
    pub bulk: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    pub fixture: PathBuf,
    /// Class the paths start from
    pub class: String,
    /// Comma-separated dotted paths, e.g. "Senses.Order, OwnerHVO.HeadWord"
    pub spec: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inspect() {
        let cli = Cli::try_parse_from(["lexo", "inspect", "fixtures/lexicon.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Inspect(_)));
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_materialize_keys() {
        let cli = Cli::try_parse_from(["lexo", "materialize", "lex.toml", "1", "10", "12"]).unwrap();
        if let Command::Materialize(args) = cli.command {
            assert_eq!(args.keys, vec![1, 10, 12]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn materialize_needs_keys() {
        assert!(Cli::try_parse_from(["lexo", "materialize", "lex.toml"]).is_err());
    }

    #[test]
    fn parse_virtual_bulk() {
        let cli = Cli::try_parse_from([
            "lexo", "--format", "json", "virtual", "lex.toml", "LexEntry", "GoodSenses", "1", "--bulk",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        if let Command::Virtual(args) = cli.command {
            assert_eq!(args.class, "LexEntry");
            assert_eq!(args.field, "GoodSenses");
            assert_eq!(args.key, 1);
            assert!(args.bulk);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_deps_verbose() {
        let cli = Cli::try_parse_from(["lexo", "deps", "lex.toml", "LexSense", "OwnerHVO.HeadWord", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        if let Command::Deps(args) = cli.command {
            assert_eq!(args.spec, "OwnerHVO.HeadWord");
        } else { panic!("wrong command"); }
    }
}
