pub mod audit;
pub mod aws;
pub mod config;
pub mod counters;
pub mod db;
pub mod dynamo;
pub mod events;
pub mod fairings;
pub mod images;
pub mod models;
pub mod queue;
pub mod queue_handlers;
pub mod ratings;
pub mod reconciler;
pub mod reviews;
pub mod schema;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod uploads;
pub mod worker;
