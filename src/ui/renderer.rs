/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer (a grid of Cell)
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Emit terminal commands only for cells that changed
///   4. Batch everything with `queue!`, flush once at the end
///   5. Swap front/back
///
/// The renderer only ever sees a `Snapshot`; it cannot reach the session.
///
/// Board glyphs (each board cell is two terminal columns):
///
///   ┌──────────┬───────┬──────────────────────────────┐
///   │ Tile     │ Glyph │ Notes                        │
///   ├──────────┼───────┼──────────────────────────────┤
///   │ Brick    │ ▓▓    │ diggable                     │
///   │ Stone    │ ██    │                              │
///   │ Ladder   │ ╟╢    │                              │
///   │ Bar      │ ──    │                              │
///   │ Hole     │ ░░    │ ▒▒ in the warning window     │
///   │ Pickup   │ $$    │ overlay                      │
///   │ Exit     │ ▐▌    │ only once revealed           │
///   │ Avatar   │ <@ @> │ xx dead, @* digging          │
///   │ Agent    │ && &$ │ &! trapped, &$ carrying      │
///   └──────────┴───────┴──────────────────────────────┘

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use digger::domain::agent::AgentState;
use digger::domain::avatar::AvatarMode;
use digger::domain::entity::{Facing, GridPos};
use digger::domain::tile::Tile;
use digger::sim::snapshot::Snapshot;
use digger::sim::world::Phase;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every "empty" cell, so the gaps between
    /// terminal rows match the cells around them.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer. Differs from any real
    /// cell, so every position is diffed on the next flush.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Renderer ──

/// Terminal columns per board cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const BAD: Color = Color::Rgb { r: 255, g: 80, b: 80 };

/// Driver-side facts the snapshot cannot know.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frame {
    pub has_next_level: bool,
    pub level_count: usize,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, snap: &Snapshot, frame: Frame) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: clean slate for the transition.
        if self.last_phase != Some(snap.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(snap.phase);
        }

        self.compose(snap, frame);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal's
        // own default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, snap: &Snapshot, frame: Frame) {
        self.front.clear();
        match snap.phase {
            Phase::Title => self.compose_title(frame),
            Phase::Playing => self.compose_game(snap),
            Phase::Paused => {
                self.compose_game(snap);
                self.compose_banner(snap, "PAUSED", "P: resume   R: restart", ACCENT);
            }
            Phase::Win => {
                self.compose_game(snap);
                let detail = if frame.has_next_level {
                    format!("time {:.1}s   ENTER: next level", snap.elapsed)
                } else {
                    format!("time {:.1}s   all levels cleared   ENTER: play again", snap.elapsed)
                };
                self.compose_banner(snap, "LEVEL CLEAR", &detail, GOOD);
            }
            Phase::Lose => {
                self.compose_game(snap);
                self.compose_banner(snap, "GAME OVER", "R: retry   ESC: quit", BAD);
            }
        }
    }

    fn compose_title(&mut self, frame: Frame) {
        let title = [
            r"  ___  _                      ",
            r" |   \(_) __ _  __ _  ___  _ _ ",
            r" | |) | |/ _` |/ _` |/ -_)| '_|",
            r" |___/|_|\__, |\__, |\___||_|  ",
            r"         |___/ |___/           ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, ACCENT, Color::Reset);
        }

        let info = format!("{} levels", frame.level_count);
        self.front.put_str(4, 8, &info, Color::DarkGrey, Color::Reset);

        let menu = [
            ("ENTER", "Start"),
            ("ARROWS / WASD", "Run, climb, drop"),
            ("Q Z / E X", "Dig left / right"),
            ("P", "Pause"),
            ("R", "Restart level"),
            ("ESC", "Quit"),
        ];
        for (i, (key, what)) in menu.iter().enumerate() {
            let row = 10 + i;
            self.front.put_str(4, row, key, GOOD, Color::Reset);
            self.front.put_str(22, row, what, Color::White, Color::Reset);
        }
    }

    fn compose_game(&mut self, snap: &Snapshot) {
        // ── HUD row ──
        let exit_status = if snap.exit_revealed { "EXIT OPEN" } else { "" };
        let hud = format!(
            " L{:<2} {:<12} Lives:{}  ${}/{}  {:>5.1}s / {:.0}s  {} ",
            snap.level_id,
            snap.level_name,
            snap.lives,
            snap.collected,
            snap.total_pickups,
            snap.elapsed,
            snap.par,
            exit_status,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Board ──
        for gy in 0..snap.height {
            let row = MAP_ROW + gy;
            if row >= self.front.height {
                break;
            }
            for gx in 0..snap.width {
                let col = gx * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                let (glyph, fg, bg) = cell_glyph(snap, GridPos::new(gx as i32, gy as i32));
                let mut chars = glyph.chars();
                let c0 = chars.next().unwrap_or(' ');
                let c1 = chars.next().unwrap_or(' ');
                self.front.set(col, row, Cell::new(c0, fg, bg));
                self.front.set(col + 1, row, Cell::new(c1, fg, bg));
            }
        }

        // ── Help bar ──
        let help_row = MAP_ROW + snap.height + 1;
        if help_row < self.front.height {
            let help = " Move:arrows/WASD  Dig:Q Z/E X  P:pause  R:restart  ESC:pause  Shift+Q:quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Centered two-line box over the board.
    fn compose_banner(&mut self, snap: &Snapshot, headline: &str, detail: &str, color: Color) {
        let board_cols = (snap.width * CELL_W).min(self.front.width);
        let box_w = (detail.chars().count().max(headline.chars().count()) + 4).min(board_cols.max(1));
        let box_x = board_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + snap.height.saturating_sub(4) / 2;
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };

        for y in box_y..box_y + 4 {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }
        let center = |s: &str| box_x + box_w.saturating_sub(s.chars().count()) / 2;
        self.front.put_str(center(headline), box_y + 1, headline, color, bg);
        self.front.put_str(center(detail), box_y + 2, detail, Color::White, bg);
    }
}

/// Glyph and colors for one board cell. Actors draw over overlays, which
/// draw over tiles.
fn cell_glyph(snap: &Snapshot, pos: GridPos) -> (&'static str, Color, Color) {
    let avatar = &snap.avatar;
    if avatar.grid() == pos {
        return match avatar.mode {
            AvatarMode::Dead => ("xx", BAD, Color::Reset),
            AvatarMode::Digging => ("@*", Color::Cyan, Color::Reset),
            _ => match avatar.facing {
                Facing::Left => ("<@", Color::Cyan, Color::Reset),
                Facing::Right => ("@>", Color::Cyan, Color::Reset),
            },
        };
    }

    if let Some(agent) = visible_agent(snap, pos) {
        return if agent.is_trapped() {
            ("&!", Color::Magenta, Color::Reset)
        } else if agent.carrying {
            ("&$", BAD, Color::Reset)
        } else {
            ("&&", BAD, Color::Reset)
        };
    }

    if snap.exit_revealed && snap.exit == pos {
        return ("▐▌", GOOD, Color::Reset);
    }
    if snap.pickups.contains(&pos) {
        return ("$$", ACCENT, Color::Reset);
    }
    if let Some(hole) = snap.hole_at(pos) {
        return if hole.warning {
            ("▒▒", Color::DarkYellow, Color::Reset)
        } else {
            ("░░", Color::DarkGrey, Color::Reset)
        };
    }

    match snap.tile_at(pos) {
        Tile::Empty => ("  ", Color::White, Color::Reset),
        Tile::Brick => ("▓▓", Color::Rgb { r: 180, g: 90, b: 40 }, Color::Reset),
        Tile::Stone => ("██", Color::Grey, Color::Reset),
        Tile::Ladder => ("╟╢", Color::Yellow, Color::Reset),
        Tile::Bar => ("──", Color::White, Color::Reset),
        Tile::Hole => ("░░", Color::DarkGrey, Color::Reset),
    }
}

fn visible_agent(snap: &Snapshot, pos: GridPos) -> Option<&AgentState> {
    snap.agents.iter().find(|a| !a.is_dead() && a.grid() == pos)
}
