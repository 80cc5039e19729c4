pub mod camera;
pub mod cli;
pub mod config;
pub mod interaction;
pub mod math;
pub mod menu;
pub mod menu_server;
pub mod objects;
pub mod persistence;
pub mod sandbox;
pub mod scene_graph;
pub mod tracking;
