pub mod bridge;
pub mod cli;
pub mod config;
pub mod devices;
pub mod dispatch;
pub mod ephemeris;
pub mod events;
pub mod exporter;
pub mod hub;
pub mod image;
pub mod influx;
pub mod listener;
pub mod mediator;
pub mod metric;
pub mod point;
pub mod sampler;
pub mod schema;
pub mod tags;

#[cfg(test)]
pub mod test_support;
