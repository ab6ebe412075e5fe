/// Events emitted during a simulation tick.
/// The presentation layer consumes these for animation/sound; the core
/// never calls into either.

use crate::domain::entity::GridPos;

#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    HoleDug { pos: GridPos },
    HoleFilled { pos: GridPos },
    PickupCollected { pos: GridPos },
    ExitRevealed,
    LevelWon { elapsed: f32 },
    AvatarDied { lives_left: u32 },
    GameOver,
    AgentTrapped { id: usize, pos: GridPos },
    AgentEscaped { id: usize, pos: GridPos },
    AgentKilled { id: usize, pos: GridPos },
    AgentRespawned { id: usize },
    PickupDropped { pos: GridPos },
    PickupTaken { id: usize, pos: GridPos },
}
