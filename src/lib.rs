pub mod commands;
pub mod config;
pub mod deploy;
pub mod git;
pub mod graph;
pub mod http;
pub mod package;
pub mod package_manager;
pub mod process;
pub mod provider;
pub mod registry;
pub mod repository;
pub mod runtime;
