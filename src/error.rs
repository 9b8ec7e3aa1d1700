use thiserror::Error;

/// Failures surfaced at the room-management boundary. The `Display` text is
/// the reason string sent back to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("nickname must be 1-12 letters or digits")]
    InvalidNickname,
    #[error("invalid room code")]
    InvalidRoomCode,
    #[error("room not found")]
    RoomNotFound,
    #[error("room full")]
    RoomFull,
    #[error("room unavailable")]
    RoomUnavailable,
    #[error("too many rooms, try again later")]
    TooManyRooms,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("grid cell size {cell} is smaller than twice the max size {max_size}")]
    CellTooSmall { cell: f32, max_size: f32 },
    #[error("spawn margin {margin} leaves no room in a world of size {world}")]
    MarginTooLarge { margin: f32, world: f32 },
    #[error("max size {max_size} is below base size {base_size}")]
    SizeRange { base_size: f32, max_size: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_reasons() {
        assert_eq!(LobbyError::RoomFull.to_string(), "room full");
        assert_eq!(LobbyError::RoomNotFound.to_string(), "room not found");
    }
}
