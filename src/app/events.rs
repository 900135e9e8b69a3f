use crossterm::event::Event;

use crate::audio::PlayerNotice;

pub enum AppEvent {
    Input(Event),
    Player(PlayerNotice),
    Tick,
}
