use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use gempipe::VERSION_INFO;
use gempipe::commands::config::{self, ConfigArgs};
use gempipe::commands::generate::{self as generation, GenerateArgs};
use gempipe::commands::tool::{
    self, AskArgs, BrainstormArgs, CodeArgs, ExplainArgs, ResearchArgs, TrendsArgs,
};
use gempipe::commands::{ConnectionArgs, report_error};
use gempipe::logging::{self, Verbosity};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  GEMMA_URL=https://gemma-xyz.a.run.app gempipe ask \"What is a CRDT?\"\n  gempipe code --language rust \"parse a CSV file\"\n  echo \"2+2?\" | gempipe generate --url http://localhost:11434 --auth none\n  gempipe config check --profile cloud\n  gempipe completion bash > ~/.local/share/bash-completion/completions/gempipe";

const GENERATE_HELP_EXAMPLES: &str = "Examples:\n  gempipe generate --url http://localhost:11434 --auth none \"2+2?\"\n  echo \"Explain retries\" | gempipe generate --temperature 0.2\n  gempipe generate --dry-run --json \"Explain retries\"";

#[derive(Debug, Parser)]
#[command(
    name = "gempipe",
    about = "Agent tools backed by a Gemma generation endpoint",
    version = VERSION_INFO,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Send a raw prompt to the model", after_help = GENERATE_HELP_EXAMPLES)]
    Generate(GenerateArgs),
    #[command(about = "Ask a question, optionally with context")]
    Ask(AskArgs),
    #[command(about = "Generate code from a description")]
    Code(CodeArgs),
    #[command(about = "Brainstorm ideas for a topic")]
    Brainstorm(BrainstormArgs),
    #[command(about = "Explain a concept at a chosen level")]
    Explain(ExplainArgs),
    #[command(about = "Write a structured research analysis of a topic")]
    Research(ResearchArgs),
    #[command(about = "Analyze trends in a domain")]
    Trends(TrendsArgs),
    #[command(about = "Print the tool declarations as JSON")]
    Tools,
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

impl Commands {
    fn connection(&self) -> Option<&ConnectionArgs> {
        match self {
            Self::Generate(args) => Some(&args.connection),
            Self::Ask(args) => Some(&args.connection),
            Self::Code(args) => Some(&args.connection),
            Self::Brainstorm(args) => Some(&args.connection),
            Self::Explain(args) => Some(&args.connection),
            Self::Research(args) => Some(&args.connection),
            Self::Trends(args) => Some(&args.connection),
            Self::Tools | Self::Config(_) | Self::Completion { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "gempipe", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "gempipe", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "gempipe", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbosity = cli
        .command
        .connection()
        .map_or(Verbosity::default(), ConnectionArgs::verbosity);
    logging::init(verbosity);

    let result = match cli.command {
        Commands::Generate(args) => generation::run(args).await,
        Commands::Ask(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Code(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Brainstorm(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Explain(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Research(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Trends(args) => {
            let (connection, request) = args.into();
            tool::run(connection, request).await
        }
        Commands::Tools => tool::list(),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        report_error(&err);
        process::exit(1);
    }
}
