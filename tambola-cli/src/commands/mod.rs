pub mod game;
pub mod ticket;

pub use game::{handle_game_command, GameCommands};
pub use ticket::{handle_ticket_command, TicketCommands};
