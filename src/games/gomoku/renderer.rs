/// Console renderer for five-in-a-row
use std::io::{self, Write};

use super::board::{Cell, Player, BOARD_SIZE};
use super::game::{GameSnapshot, Outcome};
use crate::core::renderer::GameRenderer;
use crate::core::terminal::{TerminalColor, TerminalContext};

/// Everything one frame shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub game: GameSnapshot,
    /// One-line feedback for the last local command or peer notification.
    pub notice: Option<String>,
}

pub struct ConsoleRenderer<W: Write = io::Stdout> {
    ctx: TerminalContext<W>,
    clear: bool,
}

impl ConsoleRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            ctx: TerminalContext::stdout(),
            clear: true,
        }
    }
}

impl<W: Write> ConsoleRenderer<W> {
    /// Renders into any writer without clearing the screen between frames.
    pub fn plain(out: W) -> Self {
        Self {
            ctx: TerminalContext::new(out),
            clear: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.ctx.into_inner()
    }

    fn border(&mut self) -> io::Result<()> {
        self.ctx.print_line(&format!("   +{}", "---".repeat(BOARD_SIZE)))
    }

    fn column_labels(&mut self) -> io::Result<()> {
        let labels: String = (0..BOARD_SIZE).map(|c| format!("{c:>2} ")).collect();
        self.ctx.print_line(&format!("    {labels}"))
    }

    fn draw_board(&mut self, game: &GameSnapshot) -> io::Result<()> {
        self.column_labels()?;
        self.border()?;
        for (i, row) in game.board.rows().enumerate() {
            self.ctx.print(&format!("{i:>2} |"))?;
            for cell in row {
                match cell {
                    Cell::Empty => self.ctx.print(" . ")?,
                    Cell::Stone(player) => {
                        let color = player_color(*player);
                        self.ctx.print_colored(&format!(" {} ", player.mark()), color)?;
                    }
                }
            }
            self.ctx.print_line(&format!("| {i}"))?;
        }
        self.border()?;
        self.column_labels()?;
        self.ctx.empty_line()
    }

    fn draw_chat(&mut self, chat: &[String]) -> io::Result<()> {
        self.ctx.print_line("--- Chat ---")?;
        if chat.is_empty() {
            self.ctx.print_line("(No messages yet)")?;
        }
        for line in chat {
            self.ctx.print_line(line)?;
        }
        self.ctx.print_line("------------")
    }

    fn draw_status(&mut self, game: &GameSnapshot) -> io::Result<()> {
        if let Some(outcome) = game.outcome {
            self.ctx.print_colored_line("--- GAME OVER ---", TerminalColor::Yellow)?;
            let banner = match outcome {
                Outcome::Won(player) => format!("Player {player} ({}) wins!", player.mark()),
                Outcome::Draw => "It's a draw!".to_string(),
            };
            return self.ctx.print_colored_line(&banner, TerminalColor::Green);
        }
        match (game.local, game.turn) {
            (None, _) => self.ctx.print_line("Connected. Waiting for player assignment..."),
            (Some(me), _) if game.is_local_turn() => self.ctx.print(&format!(
                "Your turn (Player {me}, {}). Enter move (x,y) or chat (/c message): ",
                me.mark()
            )),
            (Some(_), Some(other)) => self.ctx.print_line(&format!("Waiting for Player {other}'s move...")),
            (Some(_), None) => self.ctx.print_line("Waiting for the game to start..."),
        }
    }
}

fn player_color(player: Player) -> TerminalColor {
    match player {
        Player::One => TerminalColor::Red,
        Player::Two => TerminalColor::Cyan,
    }
}

impl<W: Write + Send> GameRenderer<View> for ConsoleRenderer<W> {
    fn render(&mut self, view: &View) -> io::Result<()> {
        if self.clear {
            self.ctx.clear_screen()?;
        }
        self.draw_board(&view.game)?;
        self.draw_chat(&view.game.chat)?;
        if let Some(notice) = &view.notice {
            self.ctx.print_colored_line(notice, TerminalColor::Blue)?;
        }
        self.draw_status(&view.game)?;
        self.ctx.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gomoku::board::Board;

    fn view(local: Option<Player>, turn: Option<Player>, outcome: Option<Outcome>) -> View {
        View {
            game: GameSnapshot {
                board: Board::new(),
                chat: Vec::new(),
                local,
                turn,
                outcome,
            },
            notice: None,
        }
    }

    fn render_to_string(view: &View) -> String {
        let mut renderer = ConsoleRenderer::plain(Vec::new());
        renderer.render(view).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn draws_grid_chat_and_prompt() {
        let mut v = view(Some(Player::One), Some(Player::One), None);
        v.game.chat.push("[Player 2]: hello".into());
        v.notice = Some("Invalid move. Try again.".into());
        let out = render_to_string(&v);

        assert!(out.contains(" 0 | .  .  ."));
        assert!(out.contains("| 14"));
        assert!(out.contains("[Player 2]: hello"));
        assert!(out.contains("Invalid move. Try again."));
        assert!(out.contains("Your turn (Player 1, X)"));
    }

    #[test]
    fn status_lines_follow_the_game() {
        let out = render_to_string(&view(None, None, None));
        assert!(out.contains("Waiting for player assignment"));
        assert!(out.contains("(No messages yet)"));

        let out = render_to_string(&view(Some(Player::Two), Some(Player::One), None));
        assert!(out.contains("Waiting for Player 1's move..."));

        let out = render_to_string(&view(Some(Player::Two), None, Some(Outcome::Won(Player::Two))));
        assert!(out.contains("GAME OVER"));
        assert!(out.contains("Player 2 (O) wins!"));

        let out = render_to_string(&view(Some(Player::Two), None, Some(Outcome::Draw)));
        assert!(out.contains("It's a draw!"));
    }
}
