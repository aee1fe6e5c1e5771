use futures::future::join_all;
use tracing::{info, warn};

use crate::{
    dto::{
        room::{CreateRoomRequest, CreateRoomResponse, RoomDetails, RoomSummary},
        validation::validate_match_id,
    },
    error::ServiceError,
    services::{room_controller, sse_events},
    state::{
        SharedState,
        context::{BotDifficulty, MatchContext},
    },
};

/// Create the room serving `match_id`, or return the one already serving it.
///
/// An existing room with both seats taken is refused.
pub async fn create_room(
    state: &SharedState,
    match_id: &str,
    request: CreateRoomRequest,
) -> Result<CreateRoomResponse, ServiceError> {
    validate_match_id(match_id).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let config = state.config();
    let (handle, created) = state.rooms().get_or_insert_with(match_id, || {
        let bot = request
            .is_bot
            .then(|| BotDifficulty::roll(&mut rand::rng(), config.bot.difficult_probability));
        let token = request
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| config.webhook.token.clone());
        let context = MatchContext::new(
            match_id,
            token,
            request.player1_id.clone(),
            request.player2_id.clone(),
            bot,
        );
        room_controller::spawn_room(state.clone(), context)
    });

    let details = handle.describe().await?;
    if created {
        info!(
            match_id,
            room_id = %handle.room_id(),
            is_bot = handle.is_bot(),
            "room created"
        );
        sse_events::broadcast_room_created(state, details.summary);
    } else if details.summary.clients >= 2 {
        warn!(match_id, "room is full");
        return Err(ServiceError::RoomFull(match_id.to_string()));
    } else {
        info!(match_id, room_id = %handle.room_id(), "room already exists");
    }

    Ok(CreateRoomResponse {
        room_id: handle.room_id(),
    })
}

/// Listing entries of every live room, ordered by match id.
pub async fn list_rooms(state: &SharedState) -> Vec<RoomSummary> {
    let handles = state.rooms().handles();
    let mut rooms: Vec<RoomSummary> = join_all(handles.iter().map(|handle| handle.describe()))
        .await
        .into_iter()
        .filter_map(Result::ok)
        .map(|details| details.summary)
        .collect();
    rooms.sort_by(|a, b| a.match_id.cmp(&b.match_id));
    rooms
}

/// Listing entry and current state of the room serving `match_id`.
pub async fn room_details(state: &SharedState, match_id: &str) -> Result<RoomDetails, ServiceError> {
    let handle = state
        .rooms()
        .get(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room for match `{match_id}`")))?;
    Ok(handle.describe().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::room::VisibleRoomPhase,
        services::sse_events::EVENT_ROOM_CREATED,
        state::AppState,
    };

    #[tokio::test]
    async fn create_is_idempotent_until_the_room_fills() {
        let state = AppState::new(AppConfig::default());
        let mut lobby = state.lobby().subscribe();

        let created = create_room(&state, "m-1", CreateRoomRequest::default())
            .await
            .unwrap();
        let again = create_room(&state, "m-1", CreateRoomRequest::default())
            .await
            .unwrap();
        assert_eq!(created.room_id, again.room_id);
        assert_eq!(
            lobby.try_recv().unwrap().event.as_deref(),
            Some(EVENT_ROOM_CREATED)
        );

        let handle = state.rooms().get("m-1").unwrap();
        let _first = handle.join().await.unwrap();
        let _second = handle.join().await.unwrap();

        let refused = create_room(&state, "m-1", CreateRoomRequest::default()).await;
        assert!(matches!(refused, Err(ServiceError::RoomFull(_))));
    }

    #[tokio::test]
    async fn invalid_match_ids_are_refused() {
        let state = AppState::new(AppConfig::default());
        let result = create_room(&state, "bad/id", CreateRoomRequest::default()).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert!(state.rooms().is_empty());
    }

    #[tokio::test]
    async fn listing_and_details_reflect_live_rooms() {
        let state = AppState::new(AppConfig::default());
        create_room(&state, "b", CreateRoomRequest::default())
            .await
            .unwrap();
        create_room(
            &state,
            "a",
            CreateRoomRequest {
                is_bot: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let rooms = list_rooms(&state).await;
        let ids: Vec<_> = rooms.iter().map(|room| room.match_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(rooms[0].is_bot);
        assert_eq!(rooms[1].phase, VisibleRoomPhase::WaitingForPlayers);

        let details = room_details(&state, "b").await.unwrap();
        assert_eq!(details.summary.clients, 0);
        assert!(matches!(
            room_details(&state, "missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
