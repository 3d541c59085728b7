pub mod activity;
pub mod backoff;
pub mod fetch;
pub mod gbfs;
pub mod output;
pub mod publisher;
pub mod report;
pub mod services;
pub mod stations;
