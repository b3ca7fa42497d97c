#[path = "integration/authorization.rs"]
mod authorization;
#[path = "integration/helpers.rs"]
mod helpers;
#[path = "integration/listing.rs"]
mod listing;
#[path = "integration/rooms.rs"]
mod rooms;
