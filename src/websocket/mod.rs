// WebSocket module - the connection adapter and HTTP surface
//
// - connection: per-socket adapter (decode frames, drain outbound queue,
//   heartbeat)
// - routes: HTTP route setup (room creation, ws upgrade, health)

mod connection;
mod routes;

pub use routes::{create_router, CreateRoomRequest, CreateRoomResponse, WsParams};
