//! Attendance time resolution and deduction engine
//!
//! This crate turns badge swipes and desktop agent heartbeats into one
//! canonical attendance record per employee per business date, detects
//! late and early-leave violations against shifts that may cross midnight,
//! converts them into payroll deduction days, and accounts for break time.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
