use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use tambola_core::marks::MARKS_STORAGE_KEY;
use tambola_core::{Result, Session, SvgSurface, TambolaError, Toggle};

/// Remembers which image the saved marks belong to between invocations.
pub const TICKET_PATH_KEY: &str = "tambola_ticket";

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Load a new ticket image (clears saved marks)
    Load {
        /// Path to the ticket image (PNG or JPEG)
        image: PathBuf,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Toggle marks at pixel positions and save them
    Mark {
        /// Positions as X,Y in image pixels
        #[arg(required = true, allow_hyphen_values = true, value_parser = parse_point)]
        points: Vec<(f64, f64)>,
    },
    /// List saved marks
    List,
    /// Write the ticket with its marks as an SVG file
    Render {
        /// Output file
        #[arg(short, long, default_value = "ticket.svg")]
        out: PathBuf,
    },
}

pub async fn handle_ticket_command(
    cmd: TicketCommands,
    session: &mut Session<SvgSurface>,
) -> Result<()> {
    match cmd {
        TicketCommands::Load { image, force } => {
            if !force && has_saved_marks(session).await? {
                let confirm = Confirm::new()
                    .with_prompt("Loading a new ticket clears your saved marks. Continue?")
                    .default(false)
                    .interact()
                    .map_err(|e| TambolaError::dialog(e.to_string()))?;

                if !confirm {
                    println!("Load cancelled.");
                    return Ok(());
                }
            }

            let bytes = tokio::fs::read(&image).await?;
            let ticket = session.marks_mut().load_image(bytes).await?;
            let (width, height) = (ticket.width(), ticket.height());

            let path = tokio::fs::canonicalize(&image).await?;
            session
                .local_storage()
                .set_item(TICKET_PATH_KEY, &path.to_string_lossy())
                .await?;

            println!("Ticket loaded: {} ({}x{})", path.display(), width, height);
            println!("Mark numbers with: tambola ticket mark X,Y");
        }

        TicketCommands::Mark { points } => {
            open_current_ticket(session).await?;

            for (x, y) in points {
                match session.marks_mut().click(x, y) {
                    Some(Toggle::Added(mark)) => println!("Marked ({}, {})", mark.x, mark.y),
                    Some(Toggle::Removed(mark)) => {
                        println!("Unmarked ({}, {})", mark.x, mark.y)
                    }
                    None => println!("Ticket is not ready; ignored ({}, {})", x, y),
                }
            }

            let saved = session.marks().persist().await?;
            println!("Marks saved! ({} on ticket)", saved);
        }

        TicketCommands::List => {
            session.marks_mut().restore().await?;
            let marks = session.marks().marks();

            if marks.is_empty() {
                println!("No marks saved.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["#", "X", "Y"]);

            for (index, mark) in marks.iter().enumerate() {
                table.add_row(vec![
                    (index + 1).to_string(),
                    mark.x.to_string(),
                    mark.y.to_string(),
                ]);
            }

            println!("{}", table);
        }

        TicketCommands::Render { out } => {
            open_current_ticket(session).await?;

            tokio::fs::write(&out, session.marks().surface().to_svg()).await?;
            println!(
                "Wrote {} marks to {}",
                session.marks().marks().len(),
                out.display()
            );
        }
    }

    Ok(())
}

async fn has_saved_marks(session: &Session<SvgSurface>) -> Result<bool> {
    let saved = session.local_storage().get_item(MARKS_STORAGE_KEY).await?;
    Ok(saved.is_some_and(|raw| raw.trim() != "[]"))
}

async fn open_current_ticket(session: &mut Session<SvgSurface>) -> Result<()> {
    let path = session
        .local_storage()
        .get_item(TICKET_PATH_KEY)
        .await?
        .ok_or(TambolaError::TicketNotLoaded)?;

    let bytes = tokio::fs::read(Path::new(&path)).await?;
    session.marks_mut().open_image(bytes).await?;
    Ok(())
}

fn parse_point(raw: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", raw))?;

    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid X '{}': {}", x, e))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid Y '{}': {}", y, e))?;

    if !x.is_finite() || !y.is_finite() {
        return Err(format!("position must be finite but got '{}'", raw));
    }

    Ok((x, y))
}
