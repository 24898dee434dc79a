pub mod run;
pub mod seal_token;

use crate::utils::AppError;

const USAGE: &str = "usage: markup-wallet [run] | markup-wallet seal-token <token>";

/// The subcommand named by the first argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    SealToken(String),
    Help,
}

pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let parts: Vec<&str> = args.iter().map(String::as_str).collect();

    match parts.as_slice() {
        [] | ["run"] => Ok(Command::Run),
        ["seal-token", token] => Ok(Command::SealToken(token.to_string())),
        ["seal-token"] => Err("seal-token needs the token to seal".to_string()),
        ["help" | "--help" | "-h"] => Ok(Command::Help),
        [other, ..] => Err(format!("unknown command '{}'", other)),
    }
}

pub async fn execute(args: &[String]) -> Result<(), AppError> {
    let command = parse_args(args).map_err(|e| AppError::Usage(format!("{}\n{}", e, USAGE)))?;

    match command {
        Command::Run => run::execute().await,
        Command::SealToken(token) => seal_token::execute(&token),
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}
