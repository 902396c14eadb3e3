use async_trait::async_trait;
use challenges_client::prelude::*;
use clap::{value_parser, Arg, Command};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

/// Navigator for a terminal: the user does the browser part by hand
struct ConsoleNavigator;

#[async_trait]
impl Navigator for ConsoleNavigator {
    async fn login(&self, authorization_url: Url) -> Result<Url, Error> {
        println!("Open this URL in a browser and log in:\n\n  {}\n", authorization_url);
        println!("Then paste the address the browser was redirected to:");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let line = lines
            .next_line()
            .await
            .map_err(Error::general)?
            .ok_or_else(|| Error::auth("No callback URL entered"))?;

        Ok(Url::parse(line.trim())?)
    }

    fn redirect(&self, url: Url) {
        println!("Finish logging out at:\n\n  {}\n", url);
    }
}

fn cli() -> Command<'static> {
    Command::new("challenges-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Solve multiplication challenges from the terminal")
        .subcommand_required(true)
        .subcommand(Command::new("challenge").about("Fetch a random challenge"))
        .subcommand(
            Command::new("guess")
                .about("Submit a guess for a challenge")
                .arg(Arg::new("factor-a").required(true).value_parser(value_parser!(i64)))
                .arg(Arg::new("factor-b").required(true).value_parser(value_parser!(i64)))
                .arg(Arg::new("guess").required(true).value_parser(value_parser!(i64))),
        )
        .subcommand(Command::new("attempts").about("List your latest attempts"))
        .subcommand(
            Command::new("users")
                .about("Look up users by id")
                .arg(
                    Arg::new("ids")
                        .required(true)
                        .multiple_values(true)
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(Command::new("leaders").about("Show the leaderboard"))
        .subcommand(Command::new("whoami").about("Show the logged in user"))
        .subcommand(Command::new("logout").about("End the session"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let matches = cli().get_matches();

    let app = ChallengesApp::new(ClientOptions::from_env(), Arc::new(ConsoleNavigator))?;

    // random challenges are public
    if let Some(("challenge", _)) = matches.subcommand() {
        let output = app.challenges().challenge().await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let session = app.session();
    session
        .initialize(|| log::info!("Session ready"))
        .await?;

    let username = session
        .get_username()
        .ok_or("the access token carries no username")?;

    let output = match matches.subcommand() {
        Some(("guess", args)) => {
            let factor_a = *args.get_one::<i64>("factor-a").ok_or("missing factor-a")?;
            let factor_b = *args.get_one::<i64>("factor-b").ok_or("missing factor-b")?;
            let guess = *args.get_one::<i64>("guess").ok_or("missing guess")?;
            app.challenges()
                .send_guess(&username, factor_a, factor_b, guess)
                .await?
        }
        Some(("attempts", _)) => app.challenges().get_attempts(&username).await?,
        Some(("users", args)) => {
            let ids: Vec<u64> = args
                .get_many::<u64>("ids")
                .map(|ids| ids.copied().collect())
                .unwrap_or_default();
            app.challenges().get_users(&ids).await?
        }
        Some(("leaders", _)) => app.gamification().leader_board().await?,
        Some(("whoami", _)) => json!({ "username": username }),
        Some(("logout", _)) => {
            session.logout()?;
            return Ok(());
        }
        Some((other, _)) => return Err(format!("unknown command {}", other).into()),
        None => return Err("no command given".into()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    session.shutdown();
    Ok(())
}
