pub mod eventsub;
