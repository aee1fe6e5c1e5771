use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the tic-tac-toe room server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::room_details,
        crate::routes::sse::rooms_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomSummary,
            crate::dto::room::RoomDetails,
            crate::dto::room::VisibleRoomPhase,
            crate::dto::sse::RoomListedEvent,
            crate::dto::sse::RoomDisposedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room creation, listing and client connections"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_room_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/create-room/{match_id}", "/rooms", "/rooms/{match_id}/ws", "/sse/rooms"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
