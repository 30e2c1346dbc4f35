pub mod api;
pub mod app;
pub mod chat;
pub mod cli;
pub mod columns;
pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod markup;
pub mod modal;
pub mod notification;
pub mod pagination;
pub mod palette;
pub mod preferences;
pub mod status;
pub mod task;
pub mod task_list;
pub mod theme;
pub mod ui;
