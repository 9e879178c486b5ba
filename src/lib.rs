#![feature(proc_macro_hygiene, decl_macro)]
extern crate chrono;

#[macro_use]
extern crate rocket;
extern crate bcrypt;
extern crate rocket_contrib;
extern crate time;
#[macro_use]
extern crate diesel;

pub mod api;
pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod keys;
pub mod logger;
pub mod schema;
pub mod setup_rocket;
pub mod state;
pub mod timestamp;
