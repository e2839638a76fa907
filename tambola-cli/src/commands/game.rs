use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Input;
use tambola_core::lobby::GAMES_COLLECTION;
use tambola_core::{
    Game, GameCode, LobbyCoordinator, LobbyView, Result, Session, SvgSurface, TambolaError,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Subcommand)]
pub enum GameCommands {
    /// Host a new game and wait in its lobby
    Host,
    /// Join a game by its code
    Join {
        /// Join code (will prompt if not provided)
        code: Option<String>,
    },
    /// Show a game record
    Show {
        /// Join code
        code: String,
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
}

enum LobbyEvent {
    Update(Option<LobbyView>),
    Input(Option<String>),
    Interrupt,
}

pub async fn handle_game_command(
    cmd: GameCommands,
    session: &mut Session<SvgSurface>,
) -> Result<()> {
    match cmd {
        GameCommands::Host => {
            let lobby = session.lobby_mut();
            let code = lobby.host().await?;

            println!("Hosting as {}", lobby.identity());
            println!("{}", lobby.view().title);
            println!("Share the code with other players. Type 'start' to begin, 'quit' to leave.");
            run_lobby(lobby).await?;
            println!("Left game {}.", code);
        }

        GameCommands::Join { code } => {
            let lobby = session.lobby_mut();
            lobby.begin_join()?;

            let mut provided = code;
            loop {
                let prompted = provided.is_none();
                let input = match provided.take() {
                    Some(code) => code,
                    None => Input::<String>::new()
                        .with_prompt("Join code")
                        .allow_empty(true)
                        .interact_text()
                        .map_err(|e| TambolaError::dialog(e.to_string()))?,
                };

                match lobby.submit_join(&input).await {
                    Ok(Some(_)) => break,
                    Ok(None) => {
                        println!("No code entered.");
                        return Ok(());
                    }
                    // stay in code entry and ask again
                    Err(TambolaError::GameNotFound { .. }) if prompted => {
                        println!("Game not found!");
                    }
                    Err(e) => return Err(e),
                }
            }

            println!("Joined as {}", lobby.identity());
            println!("{}", lobby.view().title);
            println!("Type 'quit' to leave.");
            run_lobby(lobby).await?;
        }

        GameCommands::Show { code, json } => {
            let code = GameCode::normalize(&code)
                .ok_or_else(|| TambolaError::game_not_found(code.trim()))?;
            let store = session.store().get()?;

            let document = store
                .get(GAMES_COLLECTION, code.as_str())
                .await?
                .ok_or_else(|| TambolaError::game_not_found(code.as_str()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&document)?);
                return Ok(());
            }

            let game = Game::from_document(code, document)?;
            println!("Game {}", game.code);
            println!("  Host: {}", game.host);
            println!("  Started: {}", if game.started { "yes" } else { "no" });
            print_players(&game.players);
        }
    }

    Ok(())
}

/// Prints roster changes until the user quits, stdin closes, or Ctrl-C.
async fn run_lobby(lobby: &mut LobbyCoordinator) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        let event = tokio::select! {
            update = lobby.next_update() => LobbyEvent::Update(update?.cloned()),
            line = stdin.next_line(), if stdin_open => LobbyEvent::Input(line?),
            _ = tokio::signal::ctrl_c() => LobbyEvent::Interrupt,
        };

        match event {
            LobbyEvent::Update(Some(view)) => {
                print_players(&view.players);
                if let Some(message) = &view.waiting_message {
                    println!("{}", message);
                }
            }
            LobbyEvent::Update(None) => {
                println!("Lobby closed.");
                break;
            }
            LobbyEvent::Input(Some(line)) => match line.trim() {
                "start" => match lobby.start().await {
                    Ok(()) => println!("Game started!"),
                    Err(TambolaError::NotHost) => println!("Only the host can start the game."),
                    Err(e) => return Err(e),
                },
                "quit" | "leave" => break,
                "" => {}
                other => println!("Unknown command '{}'. Type 'start' or 'quit'.", other),
            },
            LobbyEvent::Input(None) => stdin_open = false,
            LobbyEvent::Interrupt => break,
        }
    }

    lobby.teardown();
    Ok(())
}

fn print_players(players: &[String]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player"]);

    for (index, player) in players.iter().enumerate() {
        table.add_row(vec![(index + 1).to_string(), player.clone()]);
    }

    println!("{}", table);
}
