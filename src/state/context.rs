use rand::Rng;

use super::room::Seat;

/// Display name used for the first seat when none was provided.
pub const DEFAULT_FIRST_NAME: &str = "player1";
/// Display name used for the second seat when none was provided.
pub const DEFAULT_SECOND_NAME: &str = "player2";
/// Display name used for a bot seat when none was provided.
pub const DEFAULT_BOT_NAME: &str = "bot";

/// Skill tier of the bot seat, rolled once per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotDifficulty {
    /// Mixes the strategic move with a weighted positional move.
    Normal,
    /// Always plays the strategic move.
    Difficult,
}

impl BotDifficulty {
    /// Pick a tier: `Difficult` with probability `difficult_probability`.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R, difficult_probability: f64) -> Self {
        if rng.random_bool(difficult_probability.clamp(0.0, 1.0)) {
            BotDifficulty::Difficult
        } else {
            BotDifficulty::Normal
        }
    }
}

/// Immutable facts about one match, fixed when its room is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    /// External match identifier the room was created for.
    pub match_id: String,
    /// Token forwarded to the match lifecycle webhook.
    pub token: String,
    /// Display names, indexed by seat.
    pub seat_names: [String; 2],
    /// Tier of the bot occupying the second seat, if the room is bot-enabled.
    pub bot: Option<BotDifficulty>,
}

impl MatchContext {
    /// Build the context, filling missing display names with defaults.
    pub fn new(
        match_id: impl Into<String>,
        token: impl Into<String>,
        first_name: Option<String>,
        second_name: Option<String>,
        bot: Option<BotDifficulty>,
    ) -> Self {
        let second_default = if bot.is_some() {
            DEFAULT_BOT_NAME
        } else {
            DEFAULT_SECOND_NAME
        };
        Self {
            match_id: match_id.into(),
            token: token.into(),
            seat_names: [
                non_blank(first_name).unwrap_or_else(|| DEFAULT_FIRST_NAME.to_string()),
                non_blank(second_name).unwrap_or_else(|| second_default.to_string()),
            ],
            bot,
        }
    }

    /// True when the second seat is bot-controlled.
    pub fn bot_enabled(&self) -> bool {
        self.bot.is_some()
    }

    /// Seat taken by the bot in bot-enabled rooms.
    pub fn bot_seat(&self) -> Option<Seat> {
        self.bot.map(|_| Seat::Second)
    }

    /// Display name of `seat`.
    pub fn name_of(&self, seat: Seat) -> &str {
        &self.seat_names[seat.index()]
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
